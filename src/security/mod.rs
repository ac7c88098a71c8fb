//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (resolve client address, strip hop-by-hop headers)
//!     → rate_limit.rs (fixed-window budget per route and identifier)
//!     → auth (per-route credentials, see crate::auth)
//! ```
//!
//! # Design Decisions
//! - Rate limiting fails open on store errors; authentication fails closed
//! - No trust in client-supplied forwarding headers by default

pub mod headers;
pub mod rate_limit;

pub use headers::{sanitize_headers, strip_hop_by_hop, HOP_BY_HOP_HEADERS};
pub use rate_limit::{RateLimitResult, RateLimiter};
