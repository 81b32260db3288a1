//! Tool declarations and the calls the model makes against them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Name of the single file-writing operation the model may invoke.
pub const WRITE_FILE_TOOL: &str = "write_file";
pub const WRITE_FILE_PATH: &str = "file_path";
pub const WRITE_FILE_CONTENT: &str = "content";
pub const WRITE_FILE_REASON: &str = "reason";

/// Marker that opens the textual fallback protocol.
///
/// When the model narrates a write instead of calling the tool, the first line
/// reads `FallbackFilePath: <relative path>` and the rest is the file body.
pub const FALLBACK_PATH_PREFIX: &str = "FallbackFilePath:";

/// Definition of a tool that can be called by the LLM.
///
/// This follows the function calling schema used by Gemini `functionDeclarations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The name of the tool (function name).
    pub name: String,
    /// A description of what the tool does.
    pub description: String,
    /// JSON Schema describing the tool's parameters.
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Parameter names listed in the schema's `required` array.
    #[must_use]
    pub fn required_params(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|required| required.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Declaration of the `write_file` tool offered to the model.
#[must_use]
pub fn write_file_tool() -> ToolDefinition {
    ToolDefinition::new(
        WRITE_FILE_TOOL,
        "Writes or overwrites a file with the given content inside the migration output \
         directory. Use this for every generated source, build, or configuration file.",
        json!({
            "type": "object",
            "properties": {
                WRITE_FILE_PATH: {
                    "type": "string",
                    "description": "Path of the file relative to the output directory, \
                                    e.g. 'src/main/java/com/example/App.java'."
                },
                WRITE_FILE_CONTENT: {
                    "type": "string",
                    "description": "Complete content of the file."
                },
                WRITE_FILE_REASON: {
                    "type": "string",
                    "description": "Short explanation of what the file is and why it was written."
                }
            },
            "required": [WRITE_FILE_PATH, WRITE_FILE_CONTENT]
        }),
    )
}

/// A tool call requested by the LLM.
///
/// Gemini does not assign call ids, so only the name and arguments are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// The name of the tool being called.
    pub name: String,
    /// The arguments to pass to the tool, as a JSON object.
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Build a call from an arbitrary JSON value; non-objects become empty args.
    pub fn from_value(name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(name, arguments)
    }

    /// String argument by name, if present and a string.
    #[must_use]
    pub fn str_arg(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }

    /// Required parameters of `tool` that this call does not supply.
    #[must_use]
    pub fn missing_required<'a>(&self, tool: &'a ToolDefinition) -> Vec<&'a str> {
        tool.required_params()
            .into_iter()
            .filter(|param| !self.arguments.contains_key(*param))
            .collect()
    }
}
