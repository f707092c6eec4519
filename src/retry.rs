//! Retry executor with exponential backoff and jitter
//!
//! One policy type wraps every fallible network or storage step. Any `Err` is treated as
//! transient; the caller decides what counts as fatal once the attempts are exhausted.

use crate::config::RetrySettings;
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failure; doubles after each further failure
    pub base_delay: Duration,
    /// Upper bound of the uniform jitter added to every delay
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_jitter,
        }
    }

    /// Single attempt, no waiting
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Deterministic part of the delay after failed attempt `attempt` (1-based)
    ///
    /// Formula: `base_delay * 2^(attempt - 1)`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Full delay after failed attempt `attempt`, jitter included
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.backoff_delay(attempt);
        let jitter_ms = self.max_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return backoff;
        }
        let jitter = rand::thread_rng().gen_range(0..=jitter_ms);
        backoff.saturating_add(Duration::from_millis(jitter))
    }

    /// Runs `op` until it succeeds or the attempts are exhausted
    ///
    /// # Arguments
    ///
    /// * `label` - Short description of the operation, used in log events
    /// * `op` - Factory producing one attempt per call
    ///
    /// # Returns
    ///
    /// The first successful value, or the error of the last attempt
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(label, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if attempt >= self.max_attempts => {
                    warn!(label, attempts = attempt, error = %e, "Retries exhausted");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    debug!(
                        label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Attempt failed, backing off"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        Self::new(
            settings.max_attempts,
            Duration::from_millis(settings.base_delay_ms),
            Duration::from_millis(settings.max_jitter_ms),
        )
    }
}
