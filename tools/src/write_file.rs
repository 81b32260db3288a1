//! Argument extraction for the `write_file` tool.

use serde_json::Value;
use transmute_types::{
    ToolCall, ToolDefinition, WRITE_FILE_CONTENT, WRITE_FILE_PATH, WRITE_FILE_REASON,
};

use crate::{ToolCallError, validate_args};

/// Typed arguments of a `write_file` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFileArgs {
    pub file_path: String,
    pub content: String,
    pub reason: Option<String>,
}

impl WriteFileArgs {
    /// Extract arguments from a model call against `tool`.
    ///
    /// Missing required fields are reported before schema validation so the
    /// caller can tell "absent" apart from "wrong type".
    pub fn from_call(call: &ToolCall, tool: &ToolDefinition) -> Result<Self, ToolCallError> {
        if call.name != tool.name {
            return Err(ToolCallError::Unrecognized {
                name: call.name.clone(),
            });
        }

        let missing = call.missing_required(tool);
        if !missing.is_empty() {
            return Err(ToolCallError::MissingArguments {
                tool: call.name.clone(),
                missing: missing.into_iter().map(str::to_string).collect(),
            });
        }

        validate_args(
            &call.name,
            &tool.parameters,
            &Value::Object(call.arguments.clone()),
        )?;

        let field = |key: &str| {
            call.str_arg(key)
                .map(str::to_string)
                .ok_or_else(|| ToolCallError::InvalidArguments {
                    tool: call.name.clone(),
                    message: format!("'{key}' must be a string"),
                })
        };

        Ok(Self {
            file_path: field(WRITE_FILE_PATH)?,
            content: field(WRITE_FILE_CONTENT)?,
            reason: call.str_arg(WRITE_FILE_REASON).map(str::to_string),
        })
    }
}
