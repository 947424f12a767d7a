//! Bounded exponential-backoff retry with a per-attempt timeout.
//!
//! The pipeline wraps every collaborator call (embedding, generation) in a
//! [`RetryPolicy`]. Each attempt runs under `tokio::time::timeout`; transient
//! failures ([`RagError::is_transient`]) are retried after a growing delay,
//! anything else is returned immediately.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::config::{RagConfig, RetryConfig};
use crate::error::{RagError, Result};

/// How many times, how patiently, and for how long to call a collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
    timeout: Duration,
}

impl RetryPolicy {
    /// Create a policy from retry settings and a per-attempt timeout.
    pub fn new(retry: &RetryConfig, timeout: Duration) -> Self {
        Self {
            max_attempts: retry.max_attempts.max(1),
            initial_backoff: Duration::from_millis(retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(retry.max_backoff_ms),
            multiplier: retry.multiplier,
            timeout,
        }
    }

    /// Create a policy from a pipeline configuration.
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(&config.retry, config.request_timeout())
    }

    /// Maximum number of attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Deadline applied to each attempt.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Delay before the retry that follows failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let millis = self.initial_backoff.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = millis.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `operation` names the call in logs and in [`RagError::Timeout`].
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            let outcome = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(RagError::Timeout {
                    operation: operation.to_string(),
                    timeout: self.timeout,
                }),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(operation, attempt, error = %e, "operation failed");
                    return Err(e);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}
