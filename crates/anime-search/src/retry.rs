//! Retry with exponential backoff.
//!
//! An operation is attempted once, then retried up to `retries` more times.
//! The wait before retry `n` (zero-based) is `initial_delay * 2^n`.

use shared::config::RetryConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy for fallible async operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries beyond the first attempt
    retries: u32,
    /// Delay before the first retry
    initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(500))
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, initial_delay: Duration) -> Self {
        Self {
            retries,
            initial_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, config.initial_delay())
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// The waits between attempts, in order. Saturates instead of overflowing.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let initial = self.initial_delay;
        (0..self.retries).map(move |n| initial.saturating_mul(2u32.saturating_pow(n)))
    }

    /// Run `op`, retrying on any error
    pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_classified(op, |_| true).await
    }

    /// Run `op`, retrying only errors for which `should_retry` holds
    ///
    /// Any other error is returned immediately without waiting. When the
    /// budget runs out, the last error is returned unchanged.
    pub async fn run_classified<T, E, F, Fut, C>(&self, mut op: F, should_retry: C) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        C: Fn(&E) -> bool,
    {
        let mut delays = self.delays();
        let mut attempt: u32 = 1;

        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !should_retry(&err) {
                debug!(attempt = attempt, error = %err, "Error is not retryable");
                return Err(err);
            }

            let Some(delay) = delays.next() else {
                warn!(attempts = attempt, error = %err, "Retries exhausted");
                return Err(err);
            };

            warn!(
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Attempt failed, retrying after delay"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}
