//! Fixed-window rate limiting.
//!
//! # Data Flow
//! ```text
//! (route, identifier) → key "rate_limit.{route}.{identifier}"
//!     → load window state from the store
//!     → same window: count + 1 / new window: count = 1
//!     → compare-and-swap back (TTL = 2 × period)
//!     → RateLimitResult (allowed iff count <= limit)
//! ```
//!
//! # Design Decisions
//! - Windows are aligned to the epoch: `floor(now / period) * period`
//! - Lost CAS races are retried a bounded number of times, then the
//!   update degrades to an unconditional write (counts are approximate)
//! - Store failures fail open: traffic is allowed and the error is logged

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::RateLimitPolicy;
use crate::observability::metrics;
use crate::store::{KeyValueStore, StoreError};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_USED: HeaderName = HeaderName::from_static("x-ratelimit-used");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Attempts at a conditional update before falling back to a blind write.
const MAX_CAS_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    pub used: u64,
    /// Epoch second at which the current window ends.
    pub reset: u64,
    /// Seconds until the client may retry; zero when allowed.
    pub retry_after: u64,
}

impl RateLimitResult {
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(X_RATELIMIT_USED, HeaderValue::from(self.used));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(self.reset));
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct WindowState {
    count: u64,
    window_start: u64,
}

pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn key(route: &str, identifier: &str) -> String {
        format!("rate_limit.{route}.{identifier}")
    }

    /// Identifier shared by every client of a route without per-client limits.
    pub fn route_identifier(route_path: &str) -> String {
        format!("{:x}", Sha256::digest(route_path.as_bytes()))
    }

    pub async fn check(&self, route: &str, identifier: &str, policy: &RateLimitPolicy) -> RateLimitResult {
        self.check_at(route, identifier, policy, unix_now()).await
    }

    /// Count one request at `now` (epoch seconds).
    pub async fn check_at(
        &self,
        route: &str,
        identifier: &str,
        policy: &RateLimitPolicy,
        now: u64,
    ) -> RateLimitResult {
        let limit = policy.limit.max(0) as u64;
        let period = policy.period.max(1);
        let window_start = now / period * period;
        let window_end = window_start.saturating_add(period);
        let key = Self::key(route, identifier);

        let ttl = Duration::from_secs(period.saturating_mul(2));

        let used = match self.increment(&key, window_start, ttl).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(route = %route, key = %key, error = %e, "Rate limit store failed, allowing request");
                metrics::record_store_error("rate_limit");
                return RateLimitResult {
                    allowed: true,
                    limit,
                    remaining: limit,
                    used: 0,
                    reset: now.saturating_add(period),
                    retry_after: 0,
                };
            }
        };

        if used <= limit {
            RateLimitResult {
                allowed: true,
                limit,
                remaining: limit - used,
                used,
                reset: window_end,
                retry_after: 0,
            }
        } else {
            RateLimitResult {
                allowed: false,
                limit,
                remaining: 0,
                used,
                reset: window_end,
                retry_after: window_end.saturating_sub(now).max(1),
            }
        }
    }

    /// Bump the window counter and return the new count.
    async fn increment(&self, key: &str, window_start: u64, ttl: Duration) -> Result<u64, StoreError> {
        let mut next = WindowState {
            count: 1,
            window_start,
        };

        for _ in 0..MAX_CAS_ATTEMPTS {
            let current = self.store.get(key).await?;
            let previous = current
                .as_deref()
                .and_then(|bytes| serde_json::from_slice::<WindowState>(bytes).ok());

            next = match previous {
                Some(state) if state.window_start == window_start => WindowState {
                    count: state.count + 1,
                    window_start,
                },
                _ => WindowState {
                    count: 1,
                    window_start,
                },
            };

            if self
                .store
                .compare_and_swap(key, current.as_deref(), encode(&next)?, ttl)
                .await?
            {
                return Ok(next.count);
            }
        }

        tracing::debug!(key = %key, "Rate limit CAS contended, writing unconditionally");
        self.store.set(key, encode(&next)?, ttl).await?;
        Ok(next.count)
    }
}

fn encode(state: &WindowState) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(state).map_err(|e| StoreError::Unavailable(e.to_string()))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
