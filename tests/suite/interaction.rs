//! Orchestrator against a mocked Gemini endpoint

use std::fs;

use serde_json::{Value, json};
use tempfile::tempdir;
use transmute_engine::{AskOutcome, Orchestrator, WriteSource, written_path};
use transmute_providers::GeminiClient;
use transmute_types::{ModelName, write_file_tool};
use wiremock::MockServer;

use crate::common::{
    client_for, error_body, fast_retry, mount_json, mount_json_times, text_body, write_file_body,
};

fn orchestrator(server: &MockServer) -> Orchestrator<GeminiClient> {
    Orchestrator::new(client_for(server), ModelName::default(), fast_retry())
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |r| r.len())
}

#[tokio::test]
async fn tool_call_materializes_file_and_returns_none() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        200,
        write_file_body(json!({
            "file_path": "src/main/java/com/migratedapp/model/Order.java",
            "content": "package com.migratedapp.model;\n",
            "reason": "JPA entity"
        })),
    )
    .await;
    let out = tempdir().unwrap();

    let reply = orchestrator(&server)
        .ask("translate Order", Some(&write_file_tool()), out.path())
        .await;

    assert_eq!(reply, None);
    let written = out.path().join("src/main/java/com/migratedapp/model/Order.java");
    assert_eq!(
        fs::read_to_string(written).unwrap(),
        "package com.migratedapp.model;\n"
    );

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["contents"][0]["parts"][0]["text"], "translate Order");
    assert_eq!(
        body["tools"][0]["functionDeclarations"][0]["name"],
        "write_file"
    );
}

#[tokio::test]
async fn fallback_marker_writes_remaining_text() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        200,
        text_body("FallbackFilePath: src/main/resources/application.yml\nspring:\n  data: {}\n"),
    )
    .await;
    let out = tempdir().unwrap();

    let outcome = orchestrator(&server)
        .ask_detailed("configure", Some(&write_file_tool()), out.path())
        .await;

    assert!(matches!(
        outcome,
        AskOutcome::Wrote {
            source: WriteSource::Fallback,
            ..
        }
    ));
    let path = written_path(&outcome).unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), "spring:\n  data: {}\n");
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let server = MockServer::start().await;
    mount_json_times(
        &server,
        503,
        error_body(503, "UNAVAILABLE", "The model is overloaded."),
        2,
    )
    .await;
    mount_json(&server, 200, text_body("Looks like Java EE 7.")).await;
    let out = tempdir().unwrap();

    let reply = orchestrator(&server)
        .ask("analyze", Some(&write_file_tool()), out.path())
        .await;

    assert_eq!(reply.as_deref(), Some("Looks like Java EE 7."));
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn exhausted_retries_report_last_error() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        503,
        error_body(503, "UNAVAILABLE", "The model is overloaded."),
    )
    .await;
    let out = tempdir().unwrap();

    let reply = orchestrator(&server)
        .ask("analyze", None, out.path())
        .await
        .unwrap();

    assert!(
        reply.starts_with("Error: Failed after retries. Last error: service_unavailable:"),
        "{reply}"
    );
    assert!(reply.contains("The model is overloaded."));
    assert_eq!(request_count(&server).await, 4);
}

#[tokio::test]
async fn fatal_error_is_not_retried() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        400,
        error_body(400, "INVALID_ARGUMENT", "API key not valid."),
    )
    .await;
    let out = tempdir().unwrap();

    let reply = orchestrator(&server)
        .ask("analyze", None, out.path())
        .await
        .unwrap();

    assert!(
        reply.starts_with("Error: Failed after retries. Last error: invalid_request:"),
        "{reply}"
    );
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn traversal_from_model_stays_inside_output() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        200,
        write_file_body(json!({"file_path": "../escape.txt", "content": "nope"})),
    )
    .await;
    let base = tempdir().unwrap();
    let out = base.path().join("out");
    fs::create_dir(&out).unwrap();

    let outcome = orchestrator(&server)
        .ask_detailed("write", Some(&write_file_tool()), &out)
        .await;

    assert!(written_path(&outcome).is_none());
    assert!(!base.path().join("escape.txt").exists());
    assert_eq!(outcome.into_reply(), None);
}

#[tokio::test]
async fn blocked_prompt_yields_no_response_message() {
    let server = MockServer::start().await;
    mount_json(&server, 200, json!({"promptFeedback": {"blockReason": "SAFETY"}})).await;
    let out = tempdir().unwrap();

    let reply = orchestrator(&server)
        .ask("analyze", Some(&write_file_tool()), out.path())
        .await;

    assert_eq!(reply.as_deref(), Some("Error: No response generated."));
}
