//! Retry Logic with Exponential Backoff
//!
//! Used by the chat collaborator only. The core (resolver, bridge, router)
//! never retries: boundary violations are final, and classification failures
//! fall back to the restrictive route instead.
//!
//! The caller decides which errors are transient through a predicate, so the
//! decision stays with the error type (see [`crate::model::ModelError::is_transient`]).
//!
//! ```rust,ignore
//! use sluice::retry::{RetryConfig, execute_with_retry};
//!
//! let config = RetryConfig::default();
//! let body = execute_with_retry(&config, || client.post_once(&request), ModelError::is_transient).await?;
//! ```

use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Retry policy strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Delays grow exponentially: initial_delay * backoff_factor^attempt
    #[default]
    ExponentialBackoff,
    Immediate,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub policy: RetryPolicy,
    /// Randomize each delay by ±50%.
    pub jitter_enabled: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            policy: RetryPolicy::ExponentialBackoff,
            jitter_enabled: true,
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_jitter(mut self, enabled: bool) -> Self {
        self.jitter_enabled = enabled;
        self
    }

    /// Delay before retry number `attempt` (0-indexed), without jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = match self.policy {
            RetryPolicy::ExponentialBackoff => {
                let multiplier = self.backoff_factor.powi(attempt as i32);
                let delay_ms = self.initial_delay.as_millis() as f64 * multiplier;
                Duration::from_millis(delay_ms as u64)
            }
            RetryPolicy::Immediate => Duration::ZERO,
        };
        std::cmp::min(delay, self.max_delay)
    }

    fn sleep_duration(&self, attempt: u32) -> Duration {
        let base = self.delay_for_attempt(attempt);
        if !self.jitter_enabled || base.is_zero() {
            return base;
        }
        let base_ms = base.as_millis() as f64;
        let jitter_range = base_ms * 0.5;
        let jitter = rand::rng().random_range(-jitter_range..jitter_range);
        Duration::from_millis((base_ms + jitter).max(0.0) as u64)
    }
}

/// Run `operation` until it succeeds, fails with an error `is_retryable`
/// rejects, or the retry budget is spent. Returns the last error.
pub async fn execute_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    operation: F,
    is_retryable: impl Fn(&E) -> bool,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retryable(&err) || attempt >= config.max_retries {
                    tracing::debug!(attempt = attempt + 1, error = %err, "giving up");
                    return Err(err);
                }
                let delay = config.sleep_duration(attempt);
                tracing::debug!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    retries_left = config.max_retries - attempt,
                    error = %err,
                    "retrying transient failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
