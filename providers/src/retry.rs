//! Bounded retry with exponential backoff.
//!
//! # Retry Policy
//!
//! - Max retries: 3 (4 total attempts)
//! - Delay before retry `n` (0-based): `initial_delay * 2^n + uniform(0, jitter_max)`
//! - Initial delay: 1 second; jitter: up to 0.5 seconds
//!
//! # Retryable Conditions
//!
//! Decided by [`RetryableFaults::classify`] over the fault's [`ApiFaultKind`].
//! The default transient set is internal server error, service unavailable,
//! deadline exceeded and resource exhausted. Everything else is fatal and
//! stops the driver after a single attempt.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use transmute_types::{ApiFault, ApiFaultKind, FaultClass};

/// Upper bound on the backoff exponent; keeps the delay computation finite.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Fault kinds that are worth another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryableFaults(BTreeSet<ApiFaultKind>);

impl RetryableFaults {
    pub fn new(kinds: impl IntoIterator<Item = ApiFaultKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    #[must_use]
    pub fn classify(&self, kind: ApiFaultKind) -> FaultClass {
        if self.0.contains(&kind) {
            FaultClass::Transient
        } else {
            FaultClass::Fatal
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = ApiFaultKind> + '_ {
        self.0.iter().copied()
    }
}

impl Default for RetryableFaults {
    fn default() -> Self {
        Self::new(ApiFaultKind::default_transient().iter().copied())
    }
}

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries (not counting the initial attempt).
    pub max_retries: u32,
    /// Base delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound (exclusive) of the uniform jitter added to each delay.
    pub jitter_max: Duration,
    /// Which fault kinds are transient.
    pub retryable: RetryableFaults,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            jitter_max: Duration::from_millis(500),
            retryable: RetryableFaults::default(),
        }
    }
}

/// Calculate retry delay with exponential backoff and additive jitter.
///
/// - `backoff_step`: 0 before first retry, 1 before second, etc.
#[must_use]
pub fn calculate_retry_delay(backoff_step: u32, config: &RetryConfig) -> Duration {
    let exponent = backoff_step.min(MAX_BACKOFF_EXPONENT) as i32;
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let jitter = rand::random::<f64>() * config.jitter_max.as_secs_f64();
    Duration::try_from_secs_f64(base + jitter).unwrap_or(Duration::MAX)
}

/// Progress of one driver call.
#[derive(Debug, Clone)]
pub struct RetryState {
    /// Zero-based index of the attempt in flight.
    pub attempt: u32,
    pub last_error: Option<ApiFault>,
    /// Delay scheduled before the next attempt, zero until one is scheduled.
    pub next_delay: Duration,
}

impl RetryState {
    fn new() -> Self {
        Self {
            attempt: 0,
            last_error: None,
            next_delay: Duration::ZERO,
        }
    }
}

/// Terminal failure of the driver: the last fault and how many attempts ran.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{last}")]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last: ApiFault,
}

/// Run `op` until it succeeds, a fatal fault occurs, or retries run out.
///
/// `op` receives the zero-based attempt number. Between attempts the task
/// sleeps on `tokio::time::sleep`; nothing else is blocked.
pub async fn call_with_retry<T, F, Fut>(mut op: F, config: &RetryConfig) -> Result<T, RetryExhausted>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ApiFault>>,
{
    let mut state = RetryState::new();

    loop {
        let fault = match op(state.attempt).await {
            Ok(value) => {
                if state.attempt > 0 {
                    tracing::info!(attempts = state.attempt + 1, "Request succeeded after retry");
                }
                return Ok(value);
            }
            Err(fault) => fault,
        };

        let class = config.retryable.classify(fault.kind);
        let remaining = config.max_retries.saturating_sub(state.attempt);

        if class == FaultClass::Fatal || remaining == 0 {
            match class {
                FaultClass::Fatal => {
                    tracing::error!(kind = %fault.kind, error = %fault.message, "Non-retryable API error");
                }
                FaultClass::Transient => {
                    tracing::error!(
                        kind = %fault.kind,
                        error = %fault.message,
                        attempts = state.attempt + 1,
                        "Retries exhausted"
                    );
                }
            }
            return Err(RetryExhausted {
                attempts: state.attempt + 1,
                last: fault,
            });
        }

        state.next_delay = calculate_retry_delay(state.attempt, config);
        tracing::warn!(
            kind = %fault.kind,
            error = %fault.message,
            retry = state.attempt + 1,
            max_retries = config.max_retries,
            delay_ms = state.next_delay.as_millis() as u64,
            "Transient API error, retrying"
        );
        state.last_error = Some(fault);
        tokio::time::sleep(state.next_delay).await;
        state.attempt += 1;
    }
}
