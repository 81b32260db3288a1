//! Gemini `generateContent` response payloads.
//!
//! Every field is optional on the wire; interpretation decides what a missing
//! piece means.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub candidates: Option<Vec<Candidate>>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub error: Option<ErrorInfo>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Content {
    pub parts: Option<Vec<Part>>,
    pub role: Option<String>,
}

/// A content part in a Gemini response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Text content (mutually exclusive with function_call)
    pub text: Option<String>,
    /// Whether this is thinking content
    #[serde(default)]
    pub thought: bool,
    /// Function call (mutually exclusive with text)
    pub function_call: Option<FunctionCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: Option<String>,
    pub args: Option<serde_json::Value>,
}

/// Google API error object, found both inline in a response and as the
/// `{"error": {...}}` envelope of a non-2xx body.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorInfo {
    pub message: Option<String>,
    pub code: Option<i32>,
    pub status: Option<String>,
}

impl ErrorInfo {
    #[must_use]
    pub fn message_or_default(&self) -> &str {
        self.message.as_deref().unwrap_or("Unknown error")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorInfo,
}

/// Known Gemini finish reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Language,
    Blocklist,
    ProhibitedContent,
    Spii,
    MalformedFunctionCall,
    UnexpectedToolCall,
    Other,
    Unknown,
}

impl FinishReason {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "STOP" => Self::Stop,
            "MAX_TOKENS" => Self::MaxTokens,
            "SAFETY" => Self::Safety,
            "RECITATION" => Self::Recitation,
            "LANGUAGE" => Self::Language,
            "BLOCKLIST" => Self::Blocklist,
            "PROHIBITED_CONTENT" => Self::ProhibitedContent,
            "SPII" => Self::Spii,
            "MALFORMED_FUNCTION_CALL" => Self::MalformedFunctionCall,
            "UNEXPECTED_TOOL_CALL" => Self::UnexpectedToolCall,
            "OTHER" => Self::Other,
            _ => Self::Unknown,
        }
    }

    /// Returns error message if this is an error reason, None if success.
    #[must_use]
    pub fn error_message(self) -> Option<&'static str> {
        match self {
            Self::Stop | Self::MaxTokens | Self::Unknown => None,
            Self::Safety => Some("Content filtered by safety settings"),
            Self::Recitation => Some("Response blocked: recitation"),
            Self::Language => Some("Unsupported language"),
            Self::Blocklist => Some("Content contains blocked terms"),
            Self::ProhibitedContent => Some("Prohibited content detected"),
            Self::Spii => Some("Sensitive PII detected"),
            Self::MalformedFunctionCall => Some("Invalid function call generated"),
            Self::UnexpectedToolCall => Some("Tool call but no tools enabled"),
            Self::Other => Some("Generation stopped: unknown reason"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_function_call() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{
                        "functionCall": {
                            "name": "write_file",
                            "args": {"file_path": "pom.xml", "content": "<project/>"}
                        }
                    }]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10, "totalTokenCount": 30}
        }"#;
        let resp: Response = serde_json::from_str(json).unwrap();
        let candidates = resp.candidates.unwrap();
        let parts = candidates[0]
            .content
            .as_ref()
            .unwrap()
            .parts
            .as_ref()
            .unwrap();
        let call = parts[0].function_call.as_ref().unwrap();
        assert_eq!(call.name.as_deref(), Some("write_file"));
        assert_eq!(call.args.as_ref().unwrap()["file_path"], "pom.xml");
        assert_eq!(resp.usage_metadata.unwrap().total_token_count, 30);
    }

    #[test]
    fn deserialize_blocked_prompt() {
        let json = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let resp: Response = serde_json::from_str(json).unwrap();
        assert!(resp.candidates.is_none());
        assert_eq!(
            resp.prompt_feedback.unwrap().block_reason.as_deref(),
            Some("SAFETY")
        );
    }

    #[test]
    fn deserialize_error_envelope() {
        let json = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.error.code, Some(429));
        assert_eq!(envelope.error.status.as_deref(), Some("RESOURCE_EXHAUSTED"));
        assert_eq!(envelope.error.message_or_default(), "Quota exceeded");
    }

    #[test]
    fn finish_reason_classification() {
        assert_eq!(FinishReason::parse("STOP").error_message(), None);
        assert_eq!(FinishReason::parse("SOMETHING_NEW"), FinishReason::Unknown);
        assert!(FinishReason::parse("SAFETY").error_message().is_some());
    }
}
