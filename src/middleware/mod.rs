//! Per-route middleware.
//!
//! # Data Flow
//! ```text
//! Route matched and method allowed
//!     → chain.rs: [system middlewares] ++ [route's declared middlewares]
//!         → each middleware gets the request and a `Next` continuation
//!         → may short-circuit, or call `next.run()` and post-process
//!     → Endpoint (cache → rate limit → auth → upstream → filter → cache)
//! ```
//!
//! # Design Decisions
//! - Chains are resolved once per route at startup; unknown ids are fatal
//! - System middlewares (access logging) always run ahead of user ones
//! - The endpoint returns a finished response, so middlewares observe
//!   the final status of rejected requests too

pub mod access_log;
pub mod chain;
pub mod header_validation;
pub mod registry;

use async_trait::async_trait;

use crate::http::{GatewayRequest, GatewayResponse};

pub use access_log::AccessLog;
pub use chain::{MiddlewareChain, Next};
pub use header_validation::HeaderValidation;
pub use registry::MiddlewareRegistry;

#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    async fn process(&self, request: GatewayRequest, next: Next<'_>) -> GatewayResponse;
}

/// Innermost handler a chain wraps.
#[async_trait]
pub trait Endpoint: Send + Sync {
    async fn call(&self, request: GatewayRequest) -> GatewayResponse;
}
