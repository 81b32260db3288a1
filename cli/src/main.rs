//! Transmute CLI - binary entry point.
//!
//! ```text
//! main() -> init_tracing(output) -> TransmuteConfig::load() -> GeminiClient
//!                                                                  |
//!                                                                  v
//!                            Pipeline::run() -> RunSummary::log() -> exit code
//! ```
//!
//! Logs go to stdout and to `<output>/migration_run.log`, which is truncated
//! at the start of every run.

use std::fs::{self, File};
use std::io;
use std::path::{self, Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use transmute_config::TransmuteConfig;
use transmute_engine::{GeminiClient, LOG_FILE_NAME, Orchestrator, Pipeline, PipelineSettings};

#[derive(Parser, Debug)]
#[command(name = "transmute")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Migrate a Java project to another framework with MongoDB, driven by Gemini", long_about = None)]
struct Cli {
    /// Path to the source Java project directory
    #[arg(long)]
    source: PathBuf,

    /// Target Java framework (e.g. 'Spring Boot')
    #[arg(long)]
    target_framework: String,

    /// Output directory for generated files and the run log
    #[arg(long)]
    output: PathBuf,

    /// Log level; RUST_LOG applies when omitted
    #[arg(long, value_enum, ignore_case = true)]
    log_level: Option<LogLevel>,

    /// Config file (default: ~/.transmute/config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Gemini model, overriding the config file
    #[arg(long)]
    model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    #[value(alias = "warn")]
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

fn env_filter(level: Option<LogLevel>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(level.directive()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Install stdout and run-log layers. A log file that cannot be opened is
/// reported and skipped; a missing output directory that cannot be created
/// is fatal.
fn init_tracing(output_dir: &Path, level: Option<LogLevel>) -> Result<()> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let log_path = output_dir.join(LOG_FILE_NAME);
    let (file, warning) = match File::create(&log_path) {
        Ok(file) => (Some(file), None),
        Err(e) => (
            None,
            Some(format!("Failed to open log file {}: {e}", log_path.display())),
        ),
    };

    let file_layer = file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stdout))
        .with(file_layer)
        .with(env_filter(level))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    match warning {
        Some(warning) => tracing::warn!("{warning}"),
        None => tracing::info!(path = %log_path.display(), "Logging initialized"),
    }
    Ok(())
}

async fn run(cli: Cli, source: PathBuf, output: PathBuf) -> Result<()> {
    tracing::info!("--- Starting Migration Assistance ---");
    tracing::info!("Source: {}", source.display());
    tracing::info!("Target Framework: {}", cli.target_framework);
    tracing::info!("Target Database: MongoDB");
    tracing::info!("Output Directory: {}", output.display());

    let config = TransmuteConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    let model = config.model_name(cli.model.as_deref())?;
    let api_key = config.api_key()?;
    let retry = config.retry_config()?;
    let settings = PipelineSettings {
        call_delay: config.call_delay()?,
        max_code_chars: config.pipeline.max_code_chars,
        max_pom_bytes: config.pipeline.max_pom_bytes,
    };

    let client = GeminiClient::with_base_url(api_key, config.api_base(), config.request_timeout())
        .context("Failed to build HTTP client")?;
    tracing::info!(model = %model, "Using Gemini model");

    let pipeline = Pipeline::new(
        Orchestrator::new(client, model, retry),
        source,
        &output,
        cli.target_framework,
        settings,
    );
    let summary = pipeline.run().await?;
    summary.log(&output);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (source, output) = match (path::absolute(&cli.source), path::absolute(&cli.output)) {
        (Ok(source), Ok(output)) => (source, output),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("CRITICAL: Failed to resolve paths: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(&output, cli.log_level) {
        eprintln!("CRITICAL: Failed to set up logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli, source, output).await {
        Ok(()) => {
            tracing::info!("--- Migration Assistance Finished ---");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_required_and_optional_flags() {
        let cli = Cli::try_parse_from([
            "transmute",
            "--source",
            "legacy",
            "--target-framework",
            "Spring Boot",
            "--output",
            "out",
            "--log-level",
            "WARNING",
            "--model",
            "gemini-2.5-flash",
        ])
        .unwrap();

        assert_eq!(cli.source, PathBuf::from("legacy"));
        assert_eq!(cli.target_framework, "Spring Boot");
        assert_eq!(cli.log_level, Some(LogLevel::Warning));
        assert_eq!(cli.model.as_deref(), Some("gemini-2.5-flash"));
        assert!(cli.config.is_none());
    }

    #[test]
    fn cli_requires_source_target_and_output() {
        assert!(Cli::try_parse_from(["transmute", "--source", "a", "--output", "b"]).is_err());
    }

    #[test]
    fn log_levels_map_to_tracing_directives() {
        assert_eq!(LogLevel::Critical.directive(), "error");
        assert_eq!(LogLevel::Warning.directive(), "warn");
        let parsed = LogLevel::from_str("warn", true).unwrap();
        assert_eq!(parsed, LogLevel::Warning);
    }
}
