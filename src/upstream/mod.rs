//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! target URL + GatewayRequest + TimeoutPolicy
//!     → client.rs (parse URL, sanitize headers, attach body if any)
//!     → resilience::retry (attempts = retries + 1, fixed delay)
//!         → resilience::with_deadline (per-attempt timeout)
//!             → transport.rs (reqwest, or a scripted transport in tests)
//!     → GatewayResponse with hop-by-hop headers removed
//! ```
//!
//! # Design Decisions
//! - The transport is a trait so pipeline tests never open sockets
//! - Only transport failures and timeouts are retried; a 5xx is a response
//! - Redirects are relayed to the client, not followed

pub mod client;
pub mod transport;

pub use client::{UpstreamClient, UpstreamError};
pub use transport::{ReqwestTransport, TransportError, UpstreamRequest, UpstreamTransport};
