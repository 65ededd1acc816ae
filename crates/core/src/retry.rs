//! Bounded exponential backoff for upstream fetches.
//!
//! A single retry combinator replaces per-call-site retry loops. Only
//! retryable errors (network, 5xx, 429) are re-attempted; `NotFound` and
//! `MalformedResponse` short-circuit immediately.

use crate::error::{SourceError, SourceResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry schedule: `delay(n) = base * 2^(n-1)`, capped at `max_delay`.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Ceiling so no single sleep is unbounded.
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay to sleep after the given failed attempt (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let delay = self.base_delay.saturating_mul(2u32.saturating_pow(exponent));
        delay.min(self.max_delay)
    }
}

/// Runs `op` up to `policy.max_attempts` times with exponential backoff
/// between attempts.
///
/// Safe only for idempotent operations; everything the pipeline wraps is a
/// read-only fetch. When attempts are exhausted the final error surfaces as
/// `UpstreamUnavailable`.
///
/// # Errors
/// Returns the first non-retryable error unchanged, or `UpstreamUnavailable`
/// once retryable failures exhaust the attempt budget.
pub async fn retry_with_backoff<T, F, Fut>(policy: &BackoffPolicy, mut op: F) -> SourceResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SourceResult<T>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retryable fetch failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) if err.is_retryable() => {
                return Err(SourceError::unavailable(format!(
                    "retries exhausted after {} attempts: {err}",
                    policy.max_attempts
                )));
            }
            Err(err) => return Err(err),
        }
    }
}
