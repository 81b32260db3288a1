//! Shared test utilities and fixtures
//!
//! Wiremock stand-ins for the Gemini `generateContent` endpoint.

#![allow(dead_code)]

use std::time::Duration;

use serde_json::{Value, json};
use transmute_providers::GeminiClient;
use transmute_providers::retry::RetryConfig;
use transmute_types::ApiKey;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_MODEL: &str = "gemini-2.5-pro";
pub const TEST_KEY: &str = "test-key";

pub fn endpoint() -> String {
    format!("/models/{TEST_MODEL}:generateContent")
}

pub fn client_for(server: &MockServer) -> GeminiClient {
    GeminiClient::with_base_url(ApiKey::new(TEST_KEY), server.uri(), Duration::from_secs(5))
        .expect("client builds")
}

/// Retry policy with millisecond delays so tests stay fast.
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 3,
        initial_delay: Duration::from_millis(5),
        jitter_max: Duration::ZERO,
        ..RetryConfig::default()
    }
}

pub fn text_body(text: &str) -> Value {
    json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]})
}

pub fn write_file_body(args: Value) -> Value {
    json!({"candidates": [{"content": {"role": "model", "parts": [
        {"functionCall": {"name": "write_file", "args": args}}
    ]}}]})
}

pub fn error_body(code: u16, status: &str, message: &str) -> Value {
    json!({"error": {"code": code, "status": status, "message": message}})
}

/// Answer every request with `body`.
pub async fn mount_json(server: &MockServer, status: u16, body: Value) {
    Mock::given(method("POST"))
        .and(path(endpoint()))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Answer the next `times` requests with `body`, ahead of later mounts.
pub async fn mount_json_times(server: &MockServer, status: u16, body: Value, times: u64) {
    Mock::given(method("POST"))
        .and(path(endpoint()))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .up_to_n_times(times)
        .mount(server)
        .await;
}
