//! End-to-end migration run: scan, prompt, translate, suggest dependencies.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use ignore::WalkBuilder;
use regex::Regex;
use tokio::time::sleep;
use transmute_providers::ModelApi;
use transmute_types::{FileCategory, SourceSummary, ToolDefinition, log_preview, write_file_tool};

use crate::orchestrator::{AskOutcome, Orchestrator, WriteSource};
use crate::prompts::{self, TranslationRequest};
use crate::scan::{ScanError, scan_project};
use crate::source::{categorize, extract_imports, summarize_source};

/// Log file written inside the output directory.
pub const LOG_FILE_NAME: &str = "migration_run.log";

const UNKNOWN_FRAMEWORK: &str = "Unknown";
const CODE_TRUNCATION_MARKER: &str = "\n... (code truncated)";
const TEST_SOURCE_PREFIX: &str = "src/test/";

static DEPENDENCY_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<dependency>.*?</dependency>").expect("valid dependency block regex")
});

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("Failed to create output directory {path:?}: {source}")]
    OutputDir { path: PathBuf, source: io::Error },
}

/// Tunables for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Pause after every model call.
    pub call_delay: Duration,
    pub max_code_chars: usize,
    pub max_pom_bytes: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            call_delay: Duration::from_secs(2),
            max_code_chars: 25_000,
            max_pom_bytes: 5 * 1024,
        }
    }
}

/// Counters gathered over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub source_framework_guess: String,
    pub translation_attempts: usize,
    /// Test sources and paths that vanished between scan and analysis.
    pub skipped_files: usize,
    pub failed_analysis: usize,
    pub files_written: usize,
    pub failed_writes: usize,
    /// Paths written through the textual fallback; these need review.
    pub fallback_writes: Vec<PathBuf>,
    /// Tool-offering calls that ended in text or an error instead of a write.
    pub unwritten_replies: usize,
    pub generated_imports: usize,
    pub dependency_suggestions: Vec<String>,
}

impl RunSummary {
    fn record(&mut self, ask: &AskOutcome) {
        match ask {
            AskOutcome::Wrote { outcome, source } if outcome.success => {
                self.files_written += 1;
                if *source == WriteSource::Fallback
                    && let Some(path) = &outcome.resolved_path
                {
                    self.fallback_writes.push(path.clone());
                }
            }
            AskOutcome::Wrote { .. } => self.failed_writes += 1,
            AskOutcome::Reply(_) => self.unwritten_replies += 1,
        }
    }

    /// Emit the end-of-run report.
    pub fn log(&self, output_dir: &Path) {
        tracing::info!("--- Migration run finished ---");
        tracing::info!(
            "Attempted translation for {} non-test source files.",
            self.translation_attempts
        );
        tracing::info!(
            "Skipped {} files (test files or path errors).",
            self.skipped_files
        );
        tracing::info!("Failed analysis for {} files.", self.failed_analysis);
        tracing::info!(
            written = self.files_written,
            failed = self.failed_writes,
            unwritten_replies = self.unwritten_replies,
            "File writes"
        );
        if !self.fallback_writes.is_empty() {
            tracing::warn!(
                "{} files were written via fallback and need extra review:",
                self.fallback_writes.len()
            );
            for path in &self.fallback_writes {
                tracing::warn!("  {}", path.display());
            }
        }
        if !self.dependency_suggestions.is_empty() {
            tracing::info!(
                "Review the {} suggested dependencies above and add the valid ones to pom.xml.",
                self.dependency_suggestions.len()
            );
        }
        tracing::info!(
            "Check '{}' for generated files and '{LOG_FILE_NAME}'.",
            output_dir.display()
        );
        tracing::info!("Remember to manually review ALL generated files.");
    }
}

/// One migration run over a source tree.
pub struct Pipeline<A> {
    orchestrator: Orchestrator<A>,
    source_dir: PathBuf,
    output_dir: PathBuf,
    target_framework: String,
    settings: PipelineSettings,
    write_tool: ToolDefinition,
}

impl<A: ModelApi> Pipeline<A> {
    pub fn new(
        orchestrator: Orchestrator<A>,
        source_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        target_framework: impl Into<String>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            orchestrator,
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            target_framework: target_framework.into(),
            settings,
            write_tool: write_file_tool(),
        }
    }

    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let scan = scan_project(&self.source_dir, self.settings.max_pom_bytes)?;
        fs::create_dir_all(&self.output_dir).map_err(|source| PipelineError::OutputDir {
            path: self.output_dir.clone(),
            source,
        })?;

        let mut summary = RunSummary {
            source_framework_guess: UNKNOWN_FRAMEWORK.to_string(),
            ..RunSummary::default()
        };
        let target = self.target_framework.as_str();

        tracing::info!("--- Task: Initial Analysis & Notes ---");
        let outcome = self
            .ask_with_tool(&prompts::initial_analysis(&scan, target))
            .await;
        if let AskOutcome::Reply(text) = &outcome
            && !text.starts_with("Error:")
        {
            tracing::info!("Model returned text for initial analysis; using it as the source framework estimate");
            summary.source_framework_guess = text.clone();
        }
        summary.record(&outcome);

        tracing::info!("--- Task: Generate Dependencies & pom.xml ---");
        let outcome = self.ask_with_tool(&prompts::dependencies(target)).await;
        summary.record(&outcome);

        tracing::info!("--- Task: Generate Configuration File ---");
        let outcome = self.ask_with_tool(&prompts::configuration(target)).await;
        summary.record(&outcome);

        tracing::info!("--- Task: Analyzing, Categorizing & Translating Source Files ---");
        let analyzed = self.analyze_sources(&scan.java_files, &mut summary);
        self.translate(&analyzed, &mut summary).await;

        tracing::info!("--- Task: Analyzing Imports in Generated Output Files ---");
        let imports = self.collect_generated_imports();
        summary.generated_imports = imports.len();
        if imports.is_empty() {
            tracing::info!("No imports found in generated files to suggest dependencies for");
        } else {
            tracing::info!(
                "--- Task: Suggesting Additional Dependencies Based on {} Unique Imports ---",
                imports.len()
            );
            summary.dependency_suggestions = self.suggest_dependencies(&imports).await;
        }

        Ok(summary)
    }

    async fn ask_with_tool(&self, prompt: &str) -> AskOutcome {
        let outcome = self
            .orchestrator
            .ask_detailed(prompt, Some(&self.write_tool), &self.output_dir)
            .await;
        if let AskOutcome::Reply(text) = &outcome {
            tracing::info!(reply = %log_preview(text), "Model did not write a file");
        }
        self.pace().await;
        outcome
    }

    async fn pace(&self) {
        if !self.settings.call_delay.is_zero() {
            sleep(self.settings.call_delay).await;
        }
    }

    fn analyze_sources(&self, java_files: &[String], summary: &mut RunSummary) -> Batches {
        let mut batches = Batches::default();
        if java_files.is_empty() {
            tracing::info!("No Java files found in the source directory scan results");
            return batches;
        }
        tracing::info!("Found {} Java files to potentially analyze", java_files.len());

        for rel in java_files {
            if rel.starts_with(TEST_SOURCE_PREFIX) {
                tracing::info!("Skipping test file: {rel}");
                summary.skipped_files += 1;
                continue;
            }
            let path = self.source_dir.join(rel);
            if !path.is_file() {
                tracing::warn!("Path invalid: {}. Skipping.", path.display());
                summary.skipped_files += 1;
                continue;
            }
            let text = match read_lossy(&path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(file = %rel, "Failed to read source file: {e}");
                    summary.failed_analysis += 1;
                    continue;
                }
            };
            let source = summarize_source(&text);
            if source.types.is_empty() {
                tracing::warn!(file = %rel, "No top-level type declarations found; not translating");
                summary.failed_analysis += 1;
                continue;
            }
            let category = categorize(&source);
            tracing::info!(
                file = %rel,
                types = ?source.types.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
                "Categorized as {category}"
            );
            batches.push(category, AnalyzedFile {
                relative_path: rel.clone(),
                summary: source,
            });
        }
        batches
    }

    async fn translate(&self, batches: &Batches, summary: &mut RunSummary) {
        let app_logic: Vec<&AnalyzedFile> = batches
            .services
            .iter()
            .chain(&batches.rest)
            .chain(&batches.other)
            .collect();
        let models: Vec<&AnalyzedFile> = batches.models.iter().collect();

        for (batch_name, files, is_model) in [
            ("Models", models, true),
            ("App Logic & Others", app_logic, false),
        ] {
            tracing::info!("--- Processing Batch: {batch_name} ({} files) ---", files.len());
            for file in files {
                tracing::info!("-- Translating: {} --", file.relative_path);
                let path = self.source_dir.join(&file.relative_path);
                let code = match read_lossy(&path) {
                    Ok(code) => code,
                    Err(e) => {
                        tracing::error!(file = %file.relative_path, "Error processing file: {e}");
                        continue;
                    }
                };
                let code = truncate_code(&code, self.settings.max_code_chars);
                if let Cow::Owned(_) = code {
                    tracing::warn!(file = %file.relative_path, "Source file is long, truncated for prompt");
                }
                let prompt = prompts::translation(&TranslationRequest {
                    target_framework: &self.target_framework,
                    source_framework_guess: &summary.source_framework_guess,
                    relative_path: &file.relative_path,
                    source_code: &code,
                    summary: Some(&file.summary),
                    is_model,
                });
                let outcome = self.ask_with_tool(&prompt).await;
                summary.translation_attempts += 1;
                summary.record(&outcome);
            }
        }
    }

    fn collect_generated_imports(&self) -> BTreeSet<String> {
        let walker = WalkBuilder::new(&self.output_dir)
            .hidden(false)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut imports = BTreeSet::new();
        let mut files = 0usize;
        for entry in walker.filter_map(Result::ok) {
            let is_java = entry.file_type().is_some_and(|ft| ft.is_file())
                && entry.path().extension().is_some_and(|ext| ext == "java");
            if !is_java {
                continue;
            }
            files += 1;
            match read_lossy(entry.path()) {
                Ok(text) => imports.extend(extract_imports(&text)),
                Err(e) => tracing::warn!(path = %entry.path().display(), "Could not read generated file: {e}"),
            }
        }
        tracing::info!("Found {files} .java files in output directory to analyze for imports");
        imports
    }

    async fn suggest_dependencies(&self, imports: &BTreeSet<String>) -> Vec<String> {
        let prompt = prompts::dependency_suggestions(imports);
        let reply = self
            .orchestrator
            .ask(&prompt, None, &self.output_dir)
            .await;
        self.pace().await;

        let Some(reply) = reply.filter(|r| !r.starts_with("Error:")) else {
            tracing::error!("Could not get dependency suggestions from the model");
            return Vec::new();
        };
        tracing::info!("--- Model Dependency Suggestions ---");
        tracing::debug!("Raw dependency suggestions:\n{reply}");

        let blocks = extract_dependency_blocks(&reply);
        if blocks.is_empty() {
            tracing::info!("No parsable <dependency> blocks found in the suggestions");
        } else {
            tracing::info!("Found {} suggested dependency blocks:", blocks.len());
            for block in &blocks {
                tracing::info!("{block}");
            }
        }
        blocks
    }
}

/// Every `<dependency>...</dependency>` block in `text`, in order.
#[must_use]
pub fn extract_dependency_blocks(text: &str) -> Vec<String> {
    DEPENDENCY_BLOCK_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Cut `code` to `max_chars` characters, marking the cut.
#[must_use]
pub fn truncate_code(code: &str, max_chars: usize) -> Cow<'_, str> {
    match code.char_indices().nth(max_chars) {
        Some((idx, _)) => Cow::Owned(format!("{}{CODE_TRUNCATION_MARKER}", &code[..idx])),
        None => Cow::Borrowed(code),
    }
}

fn read_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

struct AnalyzedFile {
    relative_path: String,
    summary: SourceSummary,
}

#[derive(Default)]
struct Batches {
    models: Vec<AnalyzedFile>,
    services: Vec<AnalyzedFile>,
    rest: Vec<AnalyzedFile>,
    other: Vec<AnalyzedFile>,
}

impl Batches {
    fn push(&mut self, category: FileCategory, file: AnalyzedFile) {
        match category {
            FileCategory::Model => self.models.push(file),
            FileCategory::Service => self.services.push(file),
            FileCategory::Rest => self.rest.push(file),
            FileCategory::Other | FileCategory::Unknown => self.other.push(file),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::{Value, json};
    use tempfile::tempdir;
    use transmute_providers::retry::RetryConfig;
    use transmute_providers::{ModelFuture, wire};
    use transmute_types::{ModelName, ToolInvocationRequest};

    use super::*;

    /// Answers each request from a closure and records what was asked.
    struct RespondingApi<F> {
        respond: F,
        requests: Mutex<Vec<ToolInvocationRequest>>,
    }

    impl<F> ModelApi for RespondingApi<F>
    where
        F: Fn(&ToolInvocationRequest) -> Value + Send + Sync,
    {
        fn generate<'a>(&'a self, request: &'a ToolInvocationRequest) -> ModelFuture<'a> {
            self.requests.lock().unwrap().push(request.clone());
            let response: wire::Response = serde_json::from_value((self.respond)(request)).unwrap();
            Box::pin(async move { Ok(response) })
        }
    }

    fn write_call(path: &str, content: &str) -> Value {
        json!({"candidates": [{"content": {"parts": [{"functionCall": {
            "name": "write_file",
            "args": {"file_path": path, "content": content, "reason": "test"}
        }}]}}]})
    }

    fn text(text: &str) -> Value {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
    }

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn pipeline<F>(source: &Path, output: &Path, respond: F) -> Pipeline<RespondingApi<F>>
    where
        F: Fn(&ToolInvocationRequest) -> Value + Send + Sync,
    {
        let api = RespondingApi {
            respond,
            requests: Mutex::new(Vec::new()),
        };
        Pipeline::new(
            Orchestrator::new(api, ModelName::default(), RetryConfig::default()),
            source,
            output,
            "Spring Boot",
            PipelineSettings {
                call_delay: Duration::ZERO,
                ..PipelineSettings::default()
            },
        )
    }

    fn respond(request: &ToolInvocationRequest) -> Value {
        let prompt = &request.prompt;
        if request.tool.is_none() {
            return text(
                "You may need:\n<dependency>\n  <groupId>org.apache.commons</groupId>\n\
                 <artifactId>commons-lang3</artifactId>\n</dependency>\nand\n\
                 <dependency><groupId>com.google.guava</groupId><artifactId>guava</artifactId></dependency>",
            );
        }
        if prompt.contains("Analyze the structure") {
            return text("Java EE 7 with JPA");
        }
        if prompt.contains("create a basic 'pom.xml'") {
            return write_call("pom.xml", "<project/>");
        }
        if prompt.contains("connect to a MongoDB database") {
            return write_call("src/main/resources/application.yml", "spring: {}");
        }
        if prompt.contains("Source File Relative Path: src/main/java/com/acme/Order.java") {
            assert!(prompt.contains("Source Project Framework (estimated): Java EE 7 with JPA"));
            assert!(prompt.contains("SCHEMA RECOMMENDATIONS"));
            return write_call(
                "src/main/java/com/migratedapp/model/Order.java",
                "package com.migratedapp.model;\nimport org.apache.commons.lang3.StringUtils;\n\
                 import org.springframework.data.annotation.Id;\n@Document public class Order {}",
            );
        }
        if prompt.contains("OrderService.java") {
            assert!(!prompt.contains("SCHEMA RECOMMENDATIONS"));
            return text(
                "FallbackFilePath: src/main/java/com/migratedapp/service/OrderService.java\n\
                 import org.springframework.stereotype.Service;\n@Service class OrderService {}",
            );
        }
        text("I would rather not.")
    }

    #[tokio::test]
    async fn full_run_translates_batches_and_suggests_dependencies() {
        let source = tempdir().unwrap();
        let output = tempdir().unwrap();
        touch(source.path(), "pom.xml", "<project><artifactId>shop</artifactId></project>");
        touch(
            source.path(),
            "src/main/java/com/acme/OrderService.java",
            "package com.acme;\n@Stateless public class OrderService {}",
        );
        touch(
            source.path(),
            "src/main/java/com/acme/Order.java",
            "package com.acme;\nimport javax.persistence.Entity;\n@Entity public class Order {}",
        );
        touch(source.path(), "src/main/java/com/acme/Util.java", "public final class Util {}");
        touch(source.path(), "src/main/java/com/acme/package-info.java", "package com.acme;");
        touch(source.path(), "src/test/java/com/acme/OrderTest.java", "class OrderTest {}");

        let pipeline = pipeline(source.path(), output.path(), respond);
        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.source_framework_guess, "Java EE 7 with JPA");
        assert_eq!(summary.translation_attempts, 3);
        assert_eq!(summary.skipped_files, 1);
        assert_eq!(summary.failed_analysis, 1);
        // pom.xml, application.yml, Order.java, OrderService.java (fallback)
        assert_eq!(summary.files_written, 4);
        assert_eq!(summary.failed_writes, 0);
        // initial analysis text and Util.java
        assert_eq!(summary.unwritten_replies, 2);
        assert_eq!(summary.fallback_writes.len(), 1);
        assert!(summary.fallback_writes[0].ends_with("service/OrderService.java"));
        assert_eq!(summary.generated_imports, 3);
        assert_eq!(summary.dependency_suggestions.len(), 2);
        assert!(summary.dependency_suggestions[1].contains("guava"));

        assert!(output.path().join("pom.xml").is_file());
        assert!(output.path().join("src/main/resources/application.yml").is_file());

        let requests = pipeline.orchestrator.api().requests.lock().unwrap();
        let translated: Vec<_> = requests
            .iter()
            .filter_map(|r| {
                r.prompt
                    .lines()
                    .find_map(|l| l.strip_prefix("- Source File Relative Path: "))
                    .map(str::to_string)
            })
            .collect();
        assert_eq!(
            translated,
            vec![
                "src/main/java/com/acme/Order.java",
                "src/main/java/com/acme/OrderService.java",
                "src/main/java/com/acme/Util.java",
            ]
        );
        assert!(requests.last().unwrap().tool.is_none());
    }

    #[tokio::test]
    async fn no_generated_java_skips_suggestions() {
        let source = tempdir().unwrap();
        let output = tempdir().unwrap();
        touch(source.path(), "README.md", "nothing to see");

        let pipeline = pipeline(source.path(), output.path(), |_: &ToolInvocationRequest| {
            text("Error-free prose")
        });
        let summary = pipeline.run().await.unwrap();

        assert_eq!(summary.translation_attempts, 0);
        assert_eq!(summary.unwritten_replies, 3);
        assert!(summary.dependency_suggestions.is_empty());
        assert_eq!(pipeline.orchestrator.api().requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn missing_source_fails_before_any_call() {
        let output = tempdir().unwrap();
        let pipeline = pipeline(
            &output.path().join("absent"),
            output.path(),
            |_: &ToolInvocationRequest| text("unused"),
        );

        let err = pipeline.run().await.unwrap_err();

        assert!(matches!(err, PipelineError::Scan(ScanError::NotADirectory { .. })));
        assert!(pipeline.orchestrator.api().requests.lock().unwrap().is_empty());
    }

    #[test]
    fn dependency_blocks_span_lines() {
        let blocks = extract_dependency_blocks(
            "a <dependency>\n<groupId>x</groupId>\n</dependency> b <dependency>y</dependency>",
        );
        assert_eq!(
            blocks,
            vec![
                "<dependency>\n<groupId>x</groupId>\n</dependency>",
                "<dependency>y</dependency>"
            ]
        );
        assert!(extract_dependency_blocks("no xml here").is_empty());
    }

    #[test]
    fn truncate_code_counts_characters() {
        assert_eq!(truncate_code("héllo", 10), "héllo");
        assert_eq!(truncate_code("héllo", 2), "hé\n... (code truncated)");
    }
}
