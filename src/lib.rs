//! Routegate: a declarative reverse-proxy API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ gateway::GatewayPipeline
//!                                         │
//!                                         ├─ routing      (match path, extract variables)
//!                                         ├─ middleware   (access log, user middlewares)
//!                                         ├─ cache        (hit returns immediately)
//!                                         ├─ security     (fixed-window rate limit)
//!                                         ├─ auth         (api key / basic / jwt)
//!                                         ├─ load_balancer (pick target, substitute vars)
//!                                         ├─ upstream     (sanitize, timeout, retry)
//!                                         └─ filter       (project JSON fields)
//!     Client Response                     │
//!     ◀───────────────────────────────────┘
//!
//!     Cross-cutting: config, store, observability, resilience, lifecycle
//! ```

// Core pipeline
pub mod gateway;
pub mod http;
pub mod middleware;
pub mod routing;

// Per-route policies
pub mod auth;
pub mod cache;
pub mod filter;
pub mod load_balancer;
pub mod upstream;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;
pub mod store;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::GatewayPipeline;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
