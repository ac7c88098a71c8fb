//! Retry logic.
//!
//! # Responsibilities
//! - Re-run a failed operation up to `retries + 1` times in total
//! - Sleep a fixed delay between attempts
//! - Stop early on errors that a retry cannot fix
//!
//! # Design Decisions
//! - Fixed delay instead of backoff: routes declare the delay they want
//! - The last error is returned unchanged; callers decide how to surface it

use std::future::Future;
use std::time::Duration;

use crate::config::TimeoutPolicy;

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl From<&TimeoutPolicy> for RetryPolicy {
    fn from(policy: &TimeoutPolicy) -> Self {
        Self {
            retries: policy.retries,
            delay: policy.retry_delay(),
        }
    }
}

/// Run `op` until it succeeds, fails permanently, or attempts run out.
///
/// `op` receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && e.is_retryable() => {
                tracing::info!(
                    attempt,
                    max_attempts,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %e,
                    "Retrying after upstream failure"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
