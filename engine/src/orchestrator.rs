//! Single prompt-to-outcome interaction with the model.
//!
//! ```text
//! ask() -> call_with_retry(ModelApi::generate) -> interpret()
//!            |                                      |
//!            v                                      v
//!   "Error: Failed after retries..."   ToolCall | FallbackWrite -> sandbox::write
//!                                      PlainText | Empty | Error -> Some(text)
//! ```

use std::path::{Path, PathBuf};

use transmute_providers::interpret;
use transmute_providers::retry::{RetryConfig, call_with_retry};
use transmute_providers::{ModelApi, wire};
use transmute_tools::{ToolCallError, WriteFileArgs, sandbox};
use transmute_types::{
    InterpretedResponse, ModelName, ToolCall, ToolDefinition, ToolInvocationRequest,
    WRITE_FILE_TOOL, WriteOutcome, log_preview, write_file_tool,
};

/// Reason recorded for files written through the textual fallback protocol.
pub const FALLBACK_WRITE_REASON: &str = "[Fallback - Review Needed] LLM failed function call";

const NO_RESPONSE: &str = "Error: No response generated.";

/// How a file write was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteSource {
    ToolCall,
    Fallback,
}

/// Detailed result of one [`Orchestrator::ask_detailed`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    /// The response was handled by a (possibly failed) sandboxed write.
    Wrote {
        outcome: WriteOutcome,
        source: WriteSource,
    },
    /// Text for the caller: a model reply or an error description.
    Reply(String),
}

impl AskOutcome {
    /// Collapse to the public contract: `None` when handled by a write.
    #[must_use]
    pub fn into_reply(self) -> Option<String> {
        match self {
            Self::Wrote { .. } => None,
            Self::Reply(text) => Some(text),
        }
    }
}

/// Drives one model interaction end to end.
///
/// Never panics and never returns an error: every failure becomes a
/// descriptive reply string.
#[derive(Debug)]
pub struct Orchestrator<A> {
    api: A,
    model: ModelName,
    retry: RetryConfig,
}

impl<A: ModelApi> Orchestrator<A> {
    pub fn new(api: A, model: ModelName, retry: RetryConfig) -> Self {
        Self { api, model, retry }
    }

    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Send `prompt`, offering `tool` if given, and materialize any file the
    /// model produces beneath `output_root`.
    ///
    /// Returns `None` when the response was handled by a write, otherwise the
    /// model's text or an error description.
    pub async fn ask(
        &self,
        prompt: &str,
        tool: Option<&ToolDefinition>,
        output_root: &Path,
    ) -> Option<String> {
        self.ask_detailed(prompt, tool, output_root)
            .await
            .into_reply()
    }

    pub async fn ask_detailed(
        &self,
        prompt: &str,
        tool: Option<&ToolDefinition>,
        output_root: &Path,
    ) -> AskOutcome {
        let request = ToolInvocationRequest::new(prompt, tool.cloned(), self.model.clone());
        tracing::info!(
            model = %self.model,
            tool = tool.map(|t| t.name.as_str()),
            prompt = %log_preview(prompt),
            "Sending request to model"
        );

        let response: wire::Response =
            match call_with_retry(|_| self.api.generate(&request), &self.retry).await {
                Ok(response) => response,
                Err(err) => {
                    return AskOutcome::Reply(format!(
                        "Error: Failed after retries. Last error: {err}"
                    ));
                }
            };

        match interpret(&response) {
            InterpretedResponse::ToolCall(call) => handle_tool_call(&call, tool, output_root),
            InterpretedResponse::FallbackWrite { path, content } => {
                tracing::warn!(path = %path, "Writing file via fallback; needs review");
                let outcome =
                    sandbox::write(output_root, &path, &content, Some(FALLBACK_WRITE_REASON));
                AskOutcome::Wrote {
                    outcome,
                    source: WriteSource::Fallback,
                }
            }
            InterpretedResponse::PlainText(text) => {
                tracing::info!(preview = %log_preview(&text), "Model returned text instead of a function call");
                AskOutcome::Reply(text)
            }
            InterpretedResponse::Empty => {
                tracing::warn!("No response generated");
                AskOutcome::Reply(NO_RESPONSE.to_string())
            }
            InterpretedResponse::Error(message) => {
                tracing::error!(error = %message, "Unusable model response");
                AskOutcome::Reply(format!("Error: {message}"))
            }
        }
    }
}

fn handle_tool_call(call: &ToolCall, tool: Option<&ToolDefinition>, output_root: &Path) -> AskOutcome {
    if call.name != WRITE_FILE_TOOL {
        let err = ToolCallError::Unrecognized {
            name: call.name.clone(),
        };
        tracing::warn!("{err}");
        return AskOutcome::Reply(err.to_string());
    }

    // A write_file call is honored even when the request offered no tool.
    let builtin;
    let tool = match tool.filter(|t| t.name == WRITE_FILE_TOOL) {
        Some(offered) => offered,
        None => {
            builtin = write_file_tool();
            &builtin
        }
    };

    match WriteFileArgs::from_call(call, tool) {
        Ok(args) => {
            tracing::info!(path = %args.file_path, "Executing write_file");
            let outcome = sandbox::write(
                output_root,
                &args.file_path,
                &args.content,
                args.reason.as_deref(),
            );
            AskOutcome::Wrote {
                outcome,
                source: WriteSource::ToolCall,
            }
        }
        Err(err) => {
            tracing::error!(arguments = ?call.arguments.keys().collect::<Vec<_>>(), "{err}");
            AskOutcome::Reply(tool_call_reply(&err))
        }
    }
}

fn tool_call_reply(err: &ToolCallError) -> String {
    match err {
        ToolCallError::Unrecognized { .. } => err.to_string(),
        ToolCallError::MissingArguments { tool, missing } => format!(
            "Error: Function call '{tool}' missing arguments. Missing: {}",
            missing.join(", ")
        ),
        ToolCallError::InvalidArguments { .. } => format!("Error: {err}"),
    }
}

/// Where a successful write landed, if the outcome reports one.
#[must_use]
pub fn written_path(outcome: &AskOutcome) -> Option<&PathBuf> {
    match outcome {
        AskOutcome::Wrote { outcome, .. } if outcome.success => outcome.resolved_path.as_ref(),
        _ => None,
    }
}
