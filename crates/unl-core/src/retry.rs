//! Retry policy with linear backoff
//!
//! Only errors the caller classifies as retryable are retried; anything else
//! is returned after the first attempt. Delays go through [`Effects::delay`],
//! so simulated clocks observe the schedule without real sleeping.

use crate::effects::Effects;
use std::future::Future;
use std::time::Duration;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt; the n-th wait is n times this
    pub initial_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy used for rate-limited manifest lookups: 5 attempts,
    /// waiting 500ms, 1000ms, 1500ms, 2000ms between them
    pub fn manifest_lookup() -> Self {
        Self::linear(Duration::from_millis(500)).with_max_attempts(5)
    }

    /// Create a retry policy with linear backoff
    pub fn linear(initial_delay: Duration) -> Self {
        Self {
            max_attempts: 3,
            initial_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Set total attempts (values below 1 are treated as 1)
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Calculate delay after the given zero-based attempt failed
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(attempt.saturating_add(1))
            .min(self.max_delay)
    }

    /// Execute an async operation, retrying errors accepted by `is_retryable`
    ///
    /// The operation receives the zero-based attempt number. No delay follows
    /// the final attempt.
    pub async fn execute<F, Fut, T, E, P>(
        &self,
        effects: &Effects,
        mut operation: F,
        is_retryable: P,
    ) -> RetryResult<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        let mut total_delay = Duration::ZERO;

        loop {
            match operation(attempt).await {
                Ok(value) => {
                    return RetryResult {
                        result: Ok(value),
                        attempts: attempt + 1,
                        total_retry_delay: total_delay,
                        exhausted: false,
                    };
                }
                Err(err) => {
                    let attempts = attempt + 1;
                    let retryable = is_retryable(&err);
                    if !retryable || attempts >= max_attempts {
                        return RetryResult {
                            result: Err(err),
                            attempts,
                            total_retry_delay: total_delay,
                            exhausted: retryable,
                        };
                    }

                    let delay = self.calculate_delay(attempt);
                    tracing::warn!(
                        attempt = attempts,
                        wait_ms = delay.as_millis() as u64,
                        "Rate limited, retrying"
                    );
                    effects.delay(delay).await;
                    total_delay += delay;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::manifest_lookup()
    }
}

/// Result of a retry operation with statistics
#[derive(Debug, Clone)]
pub struct RetryResult<T, E> {
    /// Final result (success or failure)
    pub result: Result<T, E>,
    /// Number of attempts made
    pub attempts: u32,
    /// Total time spent waiting between attempts
    pub total_retry_delay: Duration,
    /// True when the last error was retryable but the attempt budget ran out
    pub exhausted: bool,
}

impl<T, E> RetryResult<T, E> {
    /// Get the result
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}
