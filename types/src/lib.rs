//! Core domain types for Transmute.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod fault;
mod project;
mod response;
mod text;
mod tool;

pub use fault::{ApiFault, ApiFaultKind, FaultClass};
pub use project::{FileCategory, ProjectScan, SourceSummary, TypeInfo};
pub use response::{InterpretedResponse, WriteOutcome};
pub use text::{log_preview, truncate_preview};
pub use tool::{
    FALLBACK_PATH_PREFIX, ToolCall, ToolDefinition, WRITE_FILE_CONTENT, WRITE_FILE_PATH,
    WRITE_FILE_REASON, WRITE_FILE_TOOL, write_file_tool,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Model & Credential Types
// ============================================================================

/// Default Gemini model used when neither config nor CLI names one.
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelParseError {
    #[error("model name cannot be empty")]
    Empty,
    #[error("model name may only contain ASCII letters, digits, '.', '_' and '-' (got {0})")]
    InvalidCharacters(String),
}

/// A validated model identifier, e.g. `gemini-2.5-pro`.
///
/// The name is interpolated into the request URL path, so it is limited to
/// `[A-Za-z0-9._-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelName(String);

impl ModelName {
    pub fn parse(raw: &str) -> Result<Self, ModelParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ModelParseError::Empty);
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(ModelParseError::InvalidCharacters(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ModelName {
    fn default() -> Self {
        Self(DEFAULT_MODEL.to_string())
    }
}

impl TryFrom<String> for ModelName {
    type Error = ModelParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ModelName> for String {
    fn from(value: ModelName) -> Self {
        value.0
    }
}

impl std::fmt::Display for ModelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Gemini API key. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey(<redacted>)")
    }
}

// ============================================================================
// Requests
// ============================================================================

/// One model request: prompt text plus the optional tool the model may call.
///
/// Immutable for the duration of a call; every retry attempt resends it as-is.
#[derive(Debug, Clone)]
pub struct ToolInvocationRequest {
    pub prompt: String,
    pub tool: Option<ToolDefinition>,
    pub model: ModelName,
}

impl ToolInvocationRequest {
    pub fn new(prompt: impl Into<String>, tool: Option<ToolDefinition>, model: ModelName) -> Self {
        Self {
            prompt: prompt.into(),
            tool,
            model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_name_trims_and_keeps_value() {
        let model = ModelName::parse("  gemini-2.5-flash ").unwrap();
        assert_eq!(model.as_str(), "gemini-2.5-flash");
        assert_eq!(model.to_string(), "gemini-2.5-flash");
    }

    #[test]
    fn model_name_rejects_empty_and_path_chars() {
        assert_eq!(ModelName::parse("   "), Err(ModelParseError::Empty));
        assert!(matches!(
            ModelName::parse("models/gemini"),
            Err(ModelParseError::InvalidCharacters(_))
        ));
        assert!(ModelName::parse("gemini pro").is_err());
    }

    #[test]
    fn model_name_rejects_url_metacharacters() {
        for raw in ["foo?x=y", "foo#frag", "foo:bar", "gemini%2Fpro", "gémini"] {
            assert!(
                matches!(ModelName::parse(raw), Err(ModelParseError::InvalidCharacters(_))),
                "{raw} should be rejected"
            );
        }
        assert!(ModelName::parse("gemini-2.5-flash_exp").is_ok());
    }

    #[test]
    fn model_name_deserializes_through_validation() {
        let ok: ModelName = serde_json::from_str("\"gemini-2.5-pro\"").unwrap();
        assert_eq!(ok, ModelName::default());
        assert!(serde_json::from_str::<ModelName>("\"\"").is_err());
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("super-secret");
        assert_eq!(format!("{key:?}"), "ApiKey(<redacted>)");
        assert_eq!(key.expose_secret(), "super-secret");
    }
}
