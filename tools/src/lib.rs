//! Tool execution for model output: the `write_file` tool and the output sandbox
//! every write lands in.

pub mod sandbox;
pub mod write_file;

use std::path::PathBuf;

use serde_json::Value;

pub use sandbox::{OutputSandbox, write};
pub use write_file::WriteFileArgs;

/// Why a path was refused by the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    EmptyPath,
    ParentTraversal { attempted: PathBuf },
    AbsolutePath { attempted: PathBuf },
    UnsafeCharacters { attempted: String },
    PathEscapesSandbox { attempted: PathBuf, resolved: PathBuf },
    SymlinkInPath { attempted: PathBuf, link: PathBuf },
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenialReason::EmptyPath => write!(f, "empty file path"),
            DenialReason::ParentTraversal { attempted } => write!(
                f,
                "path contains a parent-directory segment: {}",
                attempted.display()
            ),
            DenialReason::AbsolutePath { attempted } => {
                write!(f, "absolute paths are not allowed: {}", attempted.display())
            }
            DenialReason::UnsafeCharacters { attempted } => {
                write!(f, "path contains control characters: {attempted:?}")
            }
            DenialReason::PathEscapesSandbox {
                attempted,
                resolved,
            } => write!(
                f,
                "path escapes sandbox (attempted: {}, resolved: {})",
                attempted.display(),
                resolved.display()
            ),
            DenialReason::SymlinkInPath { attempted, link } => write!(
                f,
                "symlink in path chain (attempted: {}, link: {})",
                attempted.display(),
                link.display()
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Sandbox violation: {0}")]
    Violation(DenialReason),
    #[error("Output root {path:?} is unavailable: {source}")]
    RootUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Filesystem error at {path:?}: {source}")]
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A tool call that cannot be executed as asked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolCallError {
    #[error("Received unhandled function call: {name}")]
    Unrecognized { name: String },
    #[error("Function call '{tool}' missing arguments: {}", missing.join(", "))]
    MissingArguments { tool: String, missing: Vec<String> },
    #[error("Function call '{tool}' has invalid arguments: {message}")]
    InvalidArguments { tool: String, message: String },
}

/// Validate `args` against a tool's JSON schema.
pub fn validate_args(tool: &str, schema: &Value, args: &Value) -> Result<(), ToolCallError> {
    let validator =
        jsonschema::validator_for(schema).map_err(|e| ToolCallError::InvalidArguments {
            tool: tool.to_string(),
            message: format!("Invalid tool schema: {e}"),
        })?;
    validator
        .validate(args)
        .map_err(|err| ToolCallError::InvalidArguments {
            tool: tool.to_string(),
            message: err.to_string(),
        })
}
