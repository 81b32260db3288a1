use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};
use transmute_types::{ApiKey, ToolDefinition};

use crate::{
    ApiFault, ApiFaultKind, DEFAULT_REQUEST_TIMEOUT_SECS, GEMINI_API_BASE_URL, ModelApi,
    ModelFuture, ToolInvocationRequest, http_client_with_timeout, read_capped_error_body,
    wire::{self, ErrorEnvelope},
};

/// Client for the Gemini `generateContent` endpoint.
///
/// Performs one exchange per call; see [`crate::retry::call_with_retry`].
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: ApiKey,
}

impl GeminiClient {
    /// Client against the public Gemini API with the default request timeout.
    pub fn new(api_key: ApiKey) -> Result<Self, reqwest::Error> {
        Self::with_base_url(
            api_key,
            GEMINI_API_BASE_URL,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn with_base_url(
        api_key: ApiKey,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let https_only = base_url.starts_with("https://");
        Ok(Self {
            http: http_client_with_timeout(timeout, https_only)?,
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }

    pub async fn generate_content(
        &self,
        request: &ToolInvocationRequest,
    ) -> Result<wire::Response, ApiFault> {
        let url = self.endpoint(request.model.as_str());
        let body = build_request_body(&request.prompt, request.tool.as_ref());

        tracing::debug!(model = %request.model, tool = request.tool.as_ref().map(|t| t.name.as_str()), "Sending generateContent request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiFault::new(classify_transport(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = read_capped_error_body(response).await;
            return Err(fault_from_error_body(status, &body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiFault::new(classify_transport(&e), e.to_string()))?;
        serde_json::from_slice::<wire::Response>(&bytes).map_err(|e| {
            ApiFault::new(
                ApiFaultKind::InvalidResponse,
                format!("Failed to decode generateContent response: {e}"),
            )
        })
    }
}

impl ModelApi for GeminiClient {
    fn generate<'a>(&'a self, request: &'a ToolInvocationRequest) -> ModelFuture<'a> {
        Box::pin(self.generate_content(request))
    }
}

fn remove_additional_properties(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("additionalProperties");
            for value in map.values_mut() {
                remove_additional_properties(value);
            }
        }
        Value::Array(values) => {
            for value in values {
                remove_additional_properties(value);
            }
        }
        _ => {}
    }
}

/// Build the request body for Gemini API.
///
/// One user turn carrying the prompt, plus a single `functionDeclarations`
/// entry when a tool is offered. Gemini rejects `additionalProperties` in
/// parameter schemas, so it is stripped recursively.
#[must_use]
pub fn build_request_body(prompt: &str, tool: Option<&ToolDefinition>) -> Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt }]
        }]
    });

    if let Some(tool) = tool {
        let mut parameters = tool.parameters.clone();
        remove_additional_properties(&mut parameters);
        body["tools"] = json!([{
            "functionDeclarations": [{
                "name": tool.name,
                "description": tool.description,
                "parameters": parameters
            }]
        }]);
    }

    body
}

/// Map a non-2xx status to a fault kind.
#[must_use]
pub fn classify_status(status: StatusCode) -> ApiFaultKind {
    match status.as_u16() {
        500 => ApiFaultKind::InternalServerError,
        502 | 503 => ApiFaultKind::ServiceUnavailable,
        504 | 408 => ApiFaultKind::DeadlineExceeded,
        429 => ApiFaultKind::ResourceExhausted,
        400 => ApiFaultKind::InvalidRequest,
        401 => ApiFaultKind::Unauthenticated,
        403 => ApiFaultKind::PermissionDenied,
        404 => ApiFaultKind::NotFound,
        _ => ApiFaultKind::Other,
    }
}

/// Map a transport-level failure to a fault kind.
#[must_use]
pub fn classify_transport(error: &reqwest::Error) -> ApiFaultKind {
    if error.is_timeout() {
        ApiFaultKind::DeadlineExceeded
    } else if error.is_connect() {
        ApiFaultKind::ServiceUnavailable
    } else if error.is_decode() {
        ApiFaultKind::InvalidResponse
    } else {
        ApiFaultKind::Transport
    }
}

/// Prefer the Google error envelope's message and status over the raw body.
fn fault_from_error_body(status: StatusCode, body: &str) -> ApiFault {
    let kind = classify_status(status);
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status.as_deref() {
            Some(api_status) => format!(
                "HTTP {status} ({api_status}): {}",
                envelope.error.message_or_default()
            ),
            None => format!("HTTP {status}: {}", envelope.error.message_or_default()),
        },
        Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
        Err(_) => format!("HTTP {status}: {}", body.trim()),
    };
    ApiFault::new(kind, message)
}
