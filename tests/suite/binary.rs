//! `transmute` binary exit codes and run log

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;
use wiremock::MockServer;

use crate::common::{mount_json, text_body};

fn transmute(home: &Path, args: &[&str], api_key: Option<&str>) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_transmute"));
    cmd.args(args)
        .env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("RUST_LOG");
    match api_key {
        Some(key) => cmd.env("GEMINI_API_KEY", key),
        None => cmd.env_remove("GEMINI_API_KEY"),
    };
    cmd
}

async fn output_of(mut cmd: Command) -> Output {
    tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap()
}

fn run_log(output_dir: &Path) -> String {
    fs::read_to_string(output_dir.join("migration_run.log")).unwrap()
}

#[tokio::test]
async fn missing_source_exits_with_failure() {
    let home = tempdir().unwrap();
    let out = home.path().join("out");
    let missing = home.path().join("no-such-project");

    let output = output_of(transmute(
        home.path(),
        &[
            "--source",
            missing.to_str().unwrap(),
            "--target-framework",
            "Spring Boot",
            "--output",
            out.to_str().unwrap(),
        ],
        Some("test-key"),
    ))
    .await;

    assert_eq!(output.status.code(), Some(1));
    assert!(run_log(&out).contains("not found or is not a directory"));
}

#[tokio::test]
async fn missing_api_key_exits_with_failure() {
    let home = tempdir().unwrap();
    let out = home.path().join("out");

    let output = output_of(transmute(
        home.path(),
        &[
            "--source",
            home.path().to_str().unwrap(),
            "--target-framework",
            "Quarkus",
            "--output",
            out.to_str().unwrap(),
        ],
        None,
    ))
    .await;

    assert_eq!(output.status.code(), Some(1));
    assert!(run_log(&out).contains("GEMINI_API_KEY"));
}

#[tokio::test]
async fn run_against_mock_completes_and_reports() {
    let server = MockServer::start().await;
    mount_json(&server, 200, text_body("Plain Java EE.")).await;

    let home = tempdir().unwrap();
    let source = home.path().join("legacy");
    let out = home.path().join("out");
    let entity = source.join("src/main/java/com/acme/Order.java");
    fs::create_dir_all(entity.parent().unwrap()).unwrap();
    fs::write(&entity, "@Entity public class Order {}").unwrap();

    let config = home.path().join("transmute.toml");
    fs::write(
        &config,
        format!(
            "[model]\napi_base = \"{}\"\n\n[pipeline]\ncall_delay_secs = 0.0\n",
            server.uri()
        ),
    )
    .unwrap();

    let output = output_of(transmute(
        home.path(),
        &[
            "--source",
            source.to_str().unwrap(),
            "--target-framework",
            "Spring Boot",
            "--output",
            out.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "--log-level",
            "INFO",
        ],
        Some("test-key"),
    ))
    .await;

    assert!(output.status.success(), "{output:?}");
    let log = run_log(&out);
    assert!(log.contains("Attempted translation for 1 non-test source files."));
    assert!(log.contains("Migration Assistance Finished"));
    // analysis, pom.xml, configuration, Order.java
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}
