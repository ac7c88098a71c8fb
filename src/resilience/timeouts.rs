//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap upstream calls with the route's deadline
//! - Cancel the in-flight call cleanly when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; dropping the future aborts the call
//! - Timeout errors are distinct from other errors so logs can tell them apart

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("request timed out after {}ms", .0.as_millis())]
pub struct DeadlineExceeded(pub Duration);

pub async fn with_deadline<F: Future>(deadline: Duration, fut: F) -> Result<F::Output, DeadlineExceeded> {
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| DeadlineExceeded(deadline))
}
