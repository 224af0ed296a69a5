//! Bounded exponential-backoff retry for transient upstream failures

use crate::error::{PlugupError, PlugupResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry configuration.
///
/// `attempts` counts tries, not retries: with the defaults an operation is
/// run at most four times, sleeping 3s, 6s and 12s in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts
    pub attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry
    pub backoff: u32,
}

impl RetryPolicy {
    /// Create a retry policy
    pub fn new(attempts: u32, initial_delay: Duration, backoff: u32) -> Self {
        Self {
            attempts,
            initial_delay,
            backoff,
        }
    }

    /// Policy that retries without sleeping
    pub fn immediate(attempts: u32) -> Self {
        Self::new(attempts, Duration::ZERO, 1)
    }

    /// Run `op`, retrying failures that `PlugupError::is_retryable` accepts
    pub async fn run<T, F, Fut>(&self, op: F) -> PlugupResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PlugupResult<T>>,
    {
        self.run_if(op, PlugupError::is_retryable).await
    }

    /// Run `op`, retrying failures for which `retryable` returns true.
    ///
    /// Once the guarded attempts are used up the operation runs one last
    /// time unguarded, so the caller sees the original error.
    pub async fn run_if<T, F, Fut, R>(&self, mut op: F, retryable: R) -> PlugupResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PlugupResult<T>>,
        R: Fn(&PlugupError) -> bool,
    {
        let mut remaining = self.attempts;
        let mut delay = self.initial_delay;

        while remaining > 1 {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if retryable(&e) => {
                    warn!("{}, retrying in {:?}...", e, delay);
                    tokio::time::sleep(delay).await;
                    remaining -= 1;
                    delay = delay.saturating_mul(self.backoff);
                }
                Err(e) => return Err(e),
            }
        }

        op().await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(4, Duration::from_secs(3), 2)
    }
}
