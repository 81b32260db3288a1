//! Classification of a raw `generateContent` response.

use std::sync::LazyLock;

use regex::Regex;
use transmute_types::{FALLBACK_PATH_PREFIX, InterpretedResponse, ToolCall, log_preview};

use crate::wire::{self, FinishReason};

const UNEXPECTED_STRUCTURE: &str = "Unexpected response structure.";
const UNEXPECTED_PART: &str = "Received an empty or unexpected response part.";

static FALLBACK_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(r"\A{}[ \t]*([^\r\n]*)\r?\n", regex::escape(FALLBACK_PATH_PREFIX));
    Regex::new(&pattern).expect("valid fallback marker regex")
});

/// Reduce a response to exactly one [`InterpretedResponse`].
///
/// Only the first non-thought part of the first candidate is considered.
/// Tool-call arguments are passed through verbatim; completeness is checked
/// by the caller against the tool's schema.
#[must_use]
pub fn interpret(response: &wire::Response) -> InterpretedResponse {
    if let Some(error) = &response.error {
        let status = error.status.as_deref().unwrap_or("UNKNOWN");
        return InterpretedResponse::Error(format!(
            "API error ({status}): {}",
            error.message_or_default()
        ));
    }

    let Some(candidate) = response.candidates.as_ref().and_then(|c| c.first()) else {
        let block_reason = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref());
        tracing::warn!(block_reason, "Model returned no candidates");
        return InterpretedResponse::Empty;
    };

    let part = candidate
        .content
        .as_ref()
        .and_then(|content| content.parts.as_ref())
        .and_then(|parts| parts.iter().find(|p| !p.thought));

    let Some(part) = part else {
        let finish = candidate.finish_reason.as_deref().map(FinishReason::parse);
        if let Some(message) = finish.and_then(FinishReason::error_message) {
            tracing::warn!(finish_reason = ?finish, "Candidate has no content");
            return InterpretedResponse::Error(message.to_string());
        }
        tracing::warn!("Candidate content has no parts");
        return InterpretedResponse::Error(UNEXPECTED_STRUCTURE.to_string());
    };

    if let Some(call) = &part.function_call {
        let Some(name) = call.name.as_deref().filter(|n| !n.is_empty()) else {
            return InterpretedResponse::Error(UNEXPECTED_PART.to_string());
        };
        let arguments = call.args.clone().unwrap_or_default();
        tracing::debug!(name, "Model requested function call");
        return InterpretedResponse::ToolCall(ToolCall::from_value(name, arguments));
    }

    match &part.text {
        Some(text) => match detect_fallback(text) {
            Some((path, content)) => {
                tracing::warn!(path = %path, "Model used the fallback path protocol instead of calling the tool");
                InterpretedResponse::FallbackWrite { path, content }
            }
            None => {
                tracing::debug!(preview = %log_preview(text), "Model returned text");
                InterpretedResponse::PlainText(text.clone())
            }
        },
        None => InterpretedResponse::Error(UNEXPECTED_PART.to_string()),
    }
}

/// Split `FallbackFilePath: <path>\n<content>` into `(path, content)`.
///
/// The marker must open the text and be followed by a line break. The path is
/// trimmed; an empty path is not a fallback.
#[must_use]
pub fn detect_fallback(text: &str) -> Option<(String, String)> {
    let captures = FALLBACK_MARKER.captures(text)?;
    let path = captures.get(1)?.as_str().trim();
    if path.is_empty() {
        return None;
    }
    let body_start = captures.get(0)?.end();
    Some((path.to_string(), text[body_start..].to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response(value: serde_json::Value) -> wire::Response {
        serde_json::from_value(value).unwrap()
    }

    fn text_response(text: &str) -> wire::Response {
        response(json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        }))
    }

    #[test]
    fn function_call_is_passed_through() {
        let raw = response(json!({
            "candidates": [{"content": {"parts": [{
                "functionCall": {"name": "write_file", "args": {"file_path": "a/b.txt"}}
            }]}}]
        }));

        let InterpretedResponse::ToolCall(call) = interpret(&raw) else {
            panic!("expected tool call");
        };
        assert_eq!(call.name, "write_file");
        assert_eq!(call.str_arg("file_path"), Some("a/b.txt"));
        assert!(call.arguments.get("content").is_none());
    }

    #[test]
    fn function_call_without_args_has_empty_arguments() {
        let raw = response(json!({
            "candidates": [{"content": {"parts": [{"functionCall": {"name": "write_file"}}]}}]
        }));

        let InterpretedResponse::ToolCall(call) = interpret(&raw) else {
            panic!("expected tool call");
        };
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn fallback_marker_becomes_fallback_write() {
        let raw = text_response("FallbackFilePath: out/Foo.java\nclass Foo {}");
        assert_eq!(
            interpret(&raw),
            InterpretedResponse::FallbackWrite {
                path: "out/Foo.java".to_string(),
                content: "class Foo {}".to_string(),
            }
        );
    }

    #[test]
    fn plain_text_is_returned_unchanged() {
        let text = "The project uses Java EE 7.\nFallbackFilePath: not/first/line.java\n";
        assert_eq!(
            interpret(&text_response(text)),
            InterpretedResponse::PlainText(text.to_string())
        );
    }

    #[test]
    fn no_candidates_is_empty() {
        let raw = response(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        assert_eq!(interpret(&raw), InterpretedResponse::Empty);
        assert_eq!(interpret(&response(json!({"candidates": []}))), InterpretedResponse::Empty);
    }

    #[test]
    fn inline_error_object_is_error() {
        let raw = response(json!({
            "error": {"code": 400, "message": "Invalid JSON payload", "status": "INVALID_ARGUMENT"}
        }));
        assert_eq!(
            interpret(&raw),
            InterpretedResponse::Error("API error (INVALID_ARGUMENT): Invalid JSON payload".to_string())
        );
    }

    #[test]
    fn candidate_without_parts_is_structure_error() {
        let raw = response(json!({"candidates": [{"content": {"role": "model"}}]}));
        assert_eq!(
            interpret(&raw),
            InterpretedResponse::Error(UNEXPECTED_STRUCTURE.to_string())
        );
    }

    #[test]
    fn safety_stop_without_content_reports_reason() {
        let raw = response(json!({"candidates": [{"finishReason": "SAFETY"}]}));
        assert_eq!(
            interpret(&raw),
            InterpretedResponse::Error("Content filtered by safety settings".to_string())
        );
    }

    #[test]
    fn part_with_neither_text_nor_call_is_unexpected() {
        let raw = response(json!({"candidates": [{"content": {"parts": [{}]}}]}));
        assert_eq!(interpret(&raw), InterpretedResponse::Error(UNEXPECTED_PART.to_string()));
    }

    #[test]
    fn thought_parts_are_skipped() {
        let raw = response(json!({
            "candidates": [{"content": {"parts": [
                {"text": "thinking about it", "thought": true},
                {"text": "final answer"}
            ]}}]
        }));
        assert_eq!(
            interpret(&raw),
            InterpretedResponse::PlainText("final answer".to_string())
        );
    }

    #[test]
    fn detect_fallback_tolerates_crlf_and_spacing() {
        assert_eq!(
            detect_fallback("FallbackFilePath:   src/App.java  \r\nbody\r\nmore"),
            Some(("src/App.java".to_string(), "body\r\nmore".to_string()))
        );
        assert_eq!(
            detect_fallback("FallbackFilePath:pom.xml\n"),
            Some(("pom.xml".to_string(), String::new()))
        );
    }

    #[test]
    fn detect_fallback_requires_path_and_newline() {
        assert_eq!(detect_fallback("FallbackFilePath: src/App.java"), None);
        assert_eq!(detect_fallback("FallbackFilePath:   \nbody"), None);
        assert_eq!(detect_fallback(" FallbackFilePath: a.txt\nbody"), None);
        assert_eq!(detect_fallback("fallbackfilepath: a.txt\nbody"), None);
    }
}
