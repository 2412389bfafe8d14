//! Retry with exponential backoff at the provider-call boundary.
//!
//! SDK-internal retries are disabled in [`super::context::AwsContext`]; every
//! provider call goes through a [`RetryPolicy`] instead, so the number of
//! attempts is visible in configuration and can be set to zero delay in tests.

use crate::aws::error::AwsError;
use backon::{BackoffBuilder, ExponentialBuilder};
use stack_sweep_common::defaults::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_INITIAL_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS,
};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Exponential backoff configuration for provider calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Maximum delay between attempts (cap for exponential growth)
    pub max_delay: Duration,
    /// Randomize delays to spread retries from concurrent callers
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(DEFAULT_RETRY_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Default backoff with the given attempt budget.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Retry without sleeping between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// The sequence of delays between attempts.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize);
        if self.jitter {
            builder = builder.with_jitter();
        }
        builder.build()
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. The last error is returned unchanged.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, AwsError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<AwsError>,
    {
        let mut delays = self.delays();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let error = match call().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Provider call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e.into(),
            };

            if !error.is_retryable() || attempt >= self.max_attempts {
                return Err(error);
            }
            let Some(delay) = delays.next() else {
                return Err(error);
            };

            warn!(
                operation,
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retryable provider error, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
