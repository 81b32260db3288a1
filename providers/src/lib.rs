//! Model API client, response interpretation and retry policy.
//!
//! # Architecture
//!
//! - [`ModelApi`] - the seam between callers and a concrete model endpoint
//! - [`gemini`] - Google Gemini client (`generateContent`, non-streaming)
//! - [`wire`] - typed Gemini response payloads
//! - [`interpret`] - turns a raw response into one [`InterpretedResponse`]
//! - [`retry`] - bounded retry with exponential backoff and jitter
//!
//! # Error Handling
//!
//! Every failure of a single exchange is an [`ApiFault`] with a finite
//! [`ApiFaultKind`]. Provider-specific status codes and transport errors are
//! mapped to kinds in exactly one place ([`gemini::classify_status`],
//! [`gemini::classify_transport`]); the retry driver only sees `ApiFault`.

pub mod gemini;
pub mod interpret;
pub mod retry;
pub mod wire;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub use transmute_types;
pub(crate) use transmute_types::{ApiFault, ApiFaultKind, ToolInvocationRequest};

pub use gemini::GeminiClient;
pub use interpret::interpret;
#[doc(no_inline)]
pub use transmute_types::InterpretedResponse;

/// Canonical Gemini API base URL.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default whole-request timeout for one exchange.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

const CONNECT_TIMEOUT_SECS: u64 = 30;

const TCP_KEEPALIVE_SECS: u64 = 60;

const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

/// Boxed future returned by [`ModelApi::generate`].
pub type ModelFuture<'a> = Pin<Box<dyn Future<Output = Result<wire::Response, ApiFault>> + Send + 'a>>;

/// One request/response exchange with a model endpoint.
///
/// Implementations perform exactly one attempt; retrying is the caller's
/// concern (see [`retry::call_with_retry`]).
pub trait ModelApi: Send + Sync {
    fn generate<'a>(&'a self, request: &'a ToolInvocationRequest) -> ModelFuture<'a>;
}

fn base_client_builder(https_only: bool) -> reqwest::ClientBuilder {
    use reqwest::header::{HeaderMap, HeaderValue};

    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        "x-goog-api-client",
        HeaderValue::from_static(concat!("transmute/", env!("CARGO_PKG_VERSION"))),
    );

    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .https_only(https_only)
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .default_headers(default_headers)
}

/// HTTP client with a finite whole-request timeout.
///
/// `https_only` is relaxed only for plain-http base URLs (local mock servers).
pub fn http_client_with_timeout(
    timeout: Duration,
    https_only: bool,
) -> Result<reqwest::Client, reqwest::Error> {
    base_client_builder(https_only).timeout(timeout).build()
}

pub async fn read_capped_error_body(response: reqwest::Response) -> String {
    use futures_util::StreamExt;
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}
