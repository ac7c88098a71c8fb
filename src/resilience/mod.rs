//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (bound each attempt by the route deadline)
//!     → On transport failure: retries.rs (fixed delay, bounded attempts)
//!     → Last failure propagated to the caller
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream attempt has a deadline
//! - A timed-out attempt is a transport failure and is retried like one
//! - Non-2xx responses are answers, not failures, and are never retried

pub mod retries;
pub mod timeouts;

pub use retries::{retry, RetryPolicy, Retryable};
pub use timeouts::{with_deadline, DeadlineExceeded};
