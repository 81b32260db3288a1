//! Configuration loading for Transmute.
//!
//! Settings come from a TOML file (`--config <path>` or
//! `~/.transmute/config.toml`) layered over built-in defaults. The Gemini API
//! key comes from `GEMINI_API_KEY`, with `[api_keys] google` as a fallback.
//!
//! ```toml
//! [model]
//! name = "gemini-2.5-pro"
//! request_timeout_secs = 300
//!
//! [retry]
//! max_retries = 3
//! initial_delay_secs = 1.0
//! jitter_max_secs = 0.5
//! retryable = ["internal_server_error", "service_unavailable"]
//!
//! [pipeline]
//! call_delay_secs = 2.0
//! max_code_chars = 25000
//! max_pom_bytes = 5120
//!
//! [api_keys]
//! google = "${MY_GEMINI_KEY}"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use transmute_providers::retry::{RetryConfig, RetryableFaults};
use transmute_providers::{DEFAULT_REQUEST_TIMEOUT_SECS, GEMINI_API_BASE_URL};
use transmute_types::{API_KEY_ENV_VAR, ApiFaultKind, ApiKey, ModelName, ModelParseError};

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_delay_secs() -> f64 {
    1.0
}

const fn default_jitter_max_secs() -> f64 {
    0.5
}

const fn default_call_delay_secs() -> f64 {
    2.0
}

const fn default_max_code_chars() -> usize {
    25_000
}

const fn default_max_pom_bytes() -> usize {
    5 * 1024
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransmuteConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub api_keys: Option<ApiKeys>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
    #[error("Invalid model name: {0}")]
    Model(#[from] ModelParseError),
    #[error("No API key: set GEMINI_API_KEY or [api_keys] google in the config file")]
    MissingApiKey,
}

/// `[model]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub name: Option<String>,
    pub api_base: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

/// `[retry]` section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: f64,
    #[serde(default = "default_jitter_max_secs")]
    pub jitter_max_secs: f64,
    /// Fault kinds treated as transient. Defaults to the built-in set.
    pub retryable: Option<Vec<ApiFaultKind>>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_secs: default_initial_delay_secs(),
            jitter_max_secs: default_jitter_max_secs(),
            retryable: None,
        }
    }
}

/// `[pipeline]` section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Pause after every model call.
    #[serde(default = "default_call_delay_secs")]
    pub call_delay_secs: f64,
    /// Source files longer than this are truncated before translation.
    #[serde(default = "default_max_code_chars")]
    pub max_code_chars: usize,
    /// Leading bytes of `pom.xml` included in the analysis prompt.
    #[serde(default = "default_max_pom_bytes")]
    pub max_pom_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_delay_secs: default_call_delay_secs(),
            max_code_chars: default_max_code_chars(),
            max_pom_bytes: default_max_pom_bytes(),
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiKeys {
    pub google: Option<String>,
}

// Manual Debug impl to prevent leaking API keys in logs.
impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let google = if self.google.is_some() {
            "[REDACTED]"
        } else {
            "None"
        };
        f.debug_struct("ApiKeys").field("google", &google).finish()
    }
}

/// Replace `${VAR}` references with environment values (missing -> empty).
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

fn seconds(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::Invalid {
        field,
        message: format!("expected a finite, non-negative number of seconds, got {value}"),
    })
}

impl TransmuteConfig {
    /// Load from `explicit` if given (it must exist), otherwise from the
    /// default location if present, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read { path, source: err });
            }
        };

        let config = Self::parse(&content, &path)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|err| {
            tracing::warn!("Failed to parse config at {:?}: {}", path, err);
            ConfigError::Parse {
                path: path.to_path_buf(),
                source: err,
            }
        })
    }

    /// Reject values that would make a run misbehave rather than fail early.
    pub fn validate(&self) -> Result<(), ConfigError> {
        seconds("retry.initial_delay_secs", self.retry.initial_delay_secs)?;
        seconds("retry.jitter_max_secs", self.retry.jitter_max_secs)?;
        seconds("pipeline.call_delay_secs", self.pipeline.call_delay_secs)?;
        if self.model.request_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid {
                field: "model.request_timeout_secs",
                message: "request timeout must be greater than zero".to_string(),
            });
        }
        if let Some(name) = &self.model.name {
            ModelName::parse(name)?;
        }
        Ok(())
    }

    /// Model from the CLI override, then `[model] name`, then the default.
    pub fn model_name(&self, cli_override: Option<&str>) -> Result<ModelName, ConfigError> {
        match cli_override.or(self.model.name.as_deref()) {
            Some(name) => Ok(ModelName::parse(name)?),
            None => Ok(ModelName::default()),
        }
    }

    #[must_use]
    pub fn api_base(&self) -> &str {
        self.model.api_base.as_deref().unwrap_or(GEMINI_API_BASE_URL)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.model
                .request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn retry_config(&self) -> Result<RetryConfig, ConfigError> {
        let retryable = match &self.retry.retryable {
            Some(kinds) => RetryableFaults::new(kinds.iter().copied()),
            None => RetryableFaults::default(),
        };
        Ok(RetryConfig {
            max_retries: self.retry.max_retries,
            initial_delay: seconds("retry.initial_delay_secs", self.retry.initial_delay_secs)?,
            jitter_max: seconds("retry.jitter_max_secs", self.retry.jitter_max_secs)?,
            retryable,
        })
    }

    pub fn call_delay(&self) -> Result<Duration, ConfigError> {
        seconds("pipeline.call_delay_secs", self.pipeline.call_delay_secs)
    }

    /// Resolve the API key from the process environment, then the file.
    pub fn api_key(&self) -> Result<ApiKey, ConfigError> {
        self.resolve_api_key(env::var(API_KEY_ENV_VAR).ok())
    }

    /// Resolve the API key given the environment value (if any).
    pub fn resolve_api_key(&self, env_value: Option<String>) -> Result<ApiKey, ConfigError> {
        let from_env = env_value.filter(|v| !v.trim().is_empty());
        let from_file = self
            .api_keys
            .as_ref()
            .and_then(|keys| keys.google.as_deref())
            .map(expand_env_vars)
            .filter(|v| !v.trim().is_empty());

        from_env
            .or(from_file)
            .map(|key| ApiKey::new(key.trim()))
            .ok_or(ConfigError::MissingApiKey)
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".transmute").join("config.toml"))
}
