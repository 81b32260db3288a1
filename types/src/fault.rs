use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider-neutral category of a failed model exchange.
///
/// Provider errors are mapped onto this set once, at the HTTP boundary, so
/// retry policy never sees provider-specific types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiFaultKind {
    InternalServerError,
    ServiceUnavailable,
    DeadlineExceeded,
    ResourceExhausted,
    InvalidRequest,
    Unauthenticated,
    PermissionDenied,
    NotFound,
    Transport,
    InvalidResponse,
    Other,
}

impl ApiFaultKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InternalServerError => "internal_server_error",
            Self::ServiceUnavailable => "service_unavailable",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::ResourceExhausted => "resource_exhausted",
            Self::InvalidRequest => "invalid_request",
            Self::Unauthenticated => "unauthenticated",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::Transport => "transport",
            Self::InvalidResponse => "invalid_response",
            Self::Other => "other",
        }
    }

    /// Server overload, timeouts and quota exhaustion.
    #[must_use]
    pub const fn default_transient() -> &'static [ApiFaultKind] {
        &[
            Self::InternalServerError,
            Self::ServiceUnavailable,
            Self::DeadlineExceeded,
            Self::ResourceExhausted,
        ]
    }
}

impl std::fmt::Display for ApiFaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a fault is worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    Transient,
    Fatal,
}

/// A failed model exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApiFault {
    pub kind: ApiFaultKind,
    pub message: String,
}

impl ApiFault {
    pub fn new(kind: ApiFaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
