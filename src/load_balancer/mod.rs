//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → Target
//!     - Single(url) → returned unchanged
//!     - Pool(urls)  → LoadBalancer::select (weighted.rs)
//!     → target URL (placeholders still unresolved)
//! ```
//!
//! # Design Decisions
//! - Weights are expressed by repetition: a URL listed twice is picked twice as often
//! - Selection is stateless; no health tracking or connection counting
//! - An empty pool is rejected at config validation, so it is an error here

pub mod weighted;

pub use weighted::WeightedRandom;

use crate::config::Target;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no targets configured")]
pub struct EmptyTargets;

/// Strategy for picking one URL out of a target pool.
pub trait LoadBalancer: Send + Sync {
    fn next_target<'a>(&self, targets: &'a [String]) -> Option<&'a str>;

    /// Resolve a route target to a single URL.
    fn select<'a>(&self, target: &'a Target) -> Result<&'a str, EmptyTargets> {
        match target {
            Target::Single(url) => Ok(url),
            Target::Pool(urls) => self.next_target(urls).ok_or(EmptyTargets),
        }
    }
}
