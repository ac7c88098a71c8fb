//! Shared key-value store.
//!
//! # Responsibilities
//! - Hold rate-limit window state and cached responses
//! - Expire entries after a per-entry TTL
//! - Offer an atomic compare-and-swap for read-modify-write updates
//!
//! # Data Flow
//! ```text
//! security/rate_limit.rs ─┐
//!                         ├→ KeyValueStore (trait) → memory.rs (DashMap)
//! cache.rs ───────────────┘
//! ```
//!
//! # Design Decisions
//! - Values are opaque bytes; callers own the encoding (JSON)
//! - Trait seam so a networked store can replace the in-process one
//! - Expired entries are invisible to reads even before the sweeper runs

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

pub use memory::InMemoryStore;

/// Longest expiry a store honours; larger TTLs are clamped to it.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Unconditional write; the entry expires after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError>;

    /// Write `new` only if the live value equals `expected` (`None` = absent).
    ///
    /// Returns `Ok(false)` when another writer got there first.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        new: Vec<u8>,
        ttl: Duration,
    ) -> Result<bool, StoreError>;
}
