//! Bounded retry for outbound calls.
//!
//! Backoff is linear: after the n-th failed attempt the caller waits
//! `base_delay * n` before trying again. No delay follows the final attempt.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Configuration for retry behavior.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay unit multiplied by the attempt number.
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// A single attempt, never retried.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay applied after `failed_attempt` (1-based) failed.
    pub fn backoff_duration(&self, failed_attempt: u32) -> Duration {
        self.base_delay.saturating_mul(failed_attempt)
    }
}

/// A successful result with the number of attempts it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// The last error observed, with the number of attempts made.
#[derive(Debug)]
pub struct RetryError<E> {
    pub error: E,
    pub attempts: u32,
    /// True when the budget ran out on retryable errors; false when a
    /// non-retryable error stopped the loop early.
    pub exhausted: bool,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (after {} attempt(s))", self.error, self.attempts)
    }
}

impl<E> std::error::Error for RetryError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Run `f` until it succeeds, returns an error `is_retryable` rejects, or the
/// attempt budget is spent.
///
/// `f` receives the 1-based attempt number.
///
/// # Example
/// ```ignore
/// let result = retry_call(
///     &RetryConfig::default(),
///     "gemini_generate",
///     |err: &ProviderError| err.is_transient(),
///     |_attempt| provider.generate(&prompt, &params),
/// ).await;
/// ```
pub async fn retry_call<F, Fut, T, E, P>(
    config: &RetryConfig,
    operation_name: &str,
    is_retryable: P,
    mut f: F,
) -> Result<Attempted<T>, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match f(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    info!(
                        operation = operation_name,
                        attempts = attempt,
                        "Call succeeded after retry"
                    );
                }
                return Ok(Attempted {
                    value,
                    attempts: attempt,
                });
            }
            Err(error) => {
                if !is_retryable(&error) {
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        error = %error,
                        "Call failed with non-retryable error"
                    );
                    return Err(RetryError {
                        error,
                        attempts: attempt,
                        exhausted: false,
                    });
                }

                if attempt >= max_attempts {
                    warn!(
                        operation = operation_name,
                        attempts = attempt,
                        error = %error,
                        "Call failed, retry budget exhausted"
                    );
                    return Err(RetryError {
                        error,
                        attempts: attempt,
                        exhausted: true,
                    });
                }

                let backoff = config.backoff_duration(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt,
                    error = %error,
                    backoff_ms = backoff.as_millis() as u64,
                    "Call failed, retrying after backoff"
                );

                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}
