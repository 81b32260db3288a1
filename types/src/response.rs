use std::path::PathBuf;

use crate::ToolCall;

/// What a single model response amounts to.
///
/// Exactly one variant is produced per response, so callers dispatch with
/// one exhaustive `match` instead of probing the raw payload.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpretedResponse {
    /// The model invoked a declared tool. Arguments are not validated yet.
    ToolCall(ToolCall),
    /// The model narrated a write using the `FallbackFilePath:` protocol.
    FallbackWrite { path: String, content: String },
    /// Free text with no fallback marker, returned verbatim.
    PlainText(String),
    /// No candidates at all, e.g. the prompt was blocked.
    Empty,
    /// The response had an unexpected or error shape.
    Error(String),
}

/// Result of one sandboxed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub success: bool,
    pub resolved_path: Option<PathBuf>,
    pub failure_reason: Option<String>,
}

impl WriteOutcome {
    #[must_use]
    pub fn written(resolved_path: PathBuf) -> Self {
        Self {
            success: true,
            resolved_path: Some(resolved_path),
            failure_reason: None,
        }
    }

    #[must_use]
    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            resolved_path: None,
            failure_reason: Some(reason.into()),
        }
    }

    /// Failure after the target was resolved (e.g. the write itself failed).
    #[must_use]
    pub fn failed_at(resolved_path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            resolved_path: Some(resolved_path),
            failure_reason: Some(reason.into()),
        }
    }
}
