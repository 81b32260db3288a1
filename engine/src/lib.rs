//! Core engine for Transmute.
//!
//! [`Orchestrator`] turns one prompt into either a sandboxed file write or a
//! reply string. [`Pipeline`] sequences the migration steps around it.

pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod scan;
pub mod source;

pub use orchestrator::{AskOutcome, FALLBACK_WRITE_REASON, Orchestrator, WriteSource, written_path};
pub use pipeline::{
    LOG_FILE_NAME, Pipeline, PipelineError, PipelineSettings, RunSummary,
    extract_dependency_blocks, truncate_code,
};
pub use scan::{ScanError, scan_project};
pub use source::{categorize, extract_imports, summarize_source};

pub use transmute_providers::{self, GeminiClient, ModelApi};
pub use transmute_types::{self, ModelName, ProjectScan, SourceSummary};
