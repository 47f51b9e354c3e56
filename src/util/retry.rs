//! Bounded retry with jittered exponential backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::ResearchError;

/// How many times to try an operation and how long to wait in between.
///
/// `max_attempts` counts the first try, so `1` means no retry at all.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay, before jitter.
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_attempt()
    }
}

impl RetryPolicy {
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }

    /// Set the attempt budget. Zero is treated as one.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Un-jittered delay after the `failed`-th failed attempt (1-based).
    pub fn backoff_for(&self, failed: u32) -> Duration {
        let exponent = failed.saturating_sub(1).min(32) as i32;
        let nanos = self.initial_backoff.as_nanos() as f64 * self.multiplier.max(1.0).powi(exponent);
        let capped = nanos.min(self.max_backoff.as_nanos() as f64);
        Duration::from_nanos(capped.round() as u64)
    }

    /// Retry errors that report [`ResearchError::is_retryable`].
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T, ResearchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ResearchError>>,
    {
        self.execute_when(operation, ResearchError::is_retryable).await
    }

    /// Retry errors accepted by `should_retry`; any other error is returned at once.
    pub async fn execute_when<F, Fut, T, E, P>(
        &self,
        mut operation: F,
        should_retry: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        let budget = self.max_attempts.max(1);
        let mut failed = 0u32;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            failed += 1;
            if failed >= budget || !should_retry(&err) {
                return Err(err);
            }

            let delay = jittered(self.backoff_for(failed));
            warn!(attempt = failed, budget, ?delay, error = %err, "retrying");
            tokio::time::sleep(delay).await;
        }
    }
}

/// Scale `delay` by a random factor in [0.75, 1.25).
fn jittered(delay: Duration) -> Duration {
    let bits = uuid::Uuid::new_v4().as_u128() as u16;
    let factor = 0.75 + f64::from(bits) / f64::from(u16::MAX) * 0.5;
    delay.mul_f64(factor)
}
