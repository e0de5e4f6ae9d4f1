// file: src/store/retry.rs
// description: bounded retry with exponential backoff for transient backend failures
// reference: https://docs.rs/tokio/latest/tokio/time/fn.sleep.html

use crate::config::BackendConfig;
use crate::error::{Result, TroviError};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(config.retry_base_ms))
    }

    /// Delay before retry number `attempt` (0-based): base, 2x base, 4x base, ...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run `f` until it succeeds, fails with a non-transient error, or retries run out.
    pub async fn run<F, Fut, T>(&self, operation: &str, cancel: &CancellationToken, f: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("{} succeeded after {} retries", operation, attempt);
                    }
                    return Ok(value);
                }
                Err(err) if attempt < self.max_retries && err.is_transient() => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} failed ({}), retrying in {}ms",
                        operation,
                        err,
                        delay.as_millis()
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(TroviError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
