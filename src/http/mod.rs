//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum fallback handler, request-id and trace layers)
//!     → request.rs (buffer body, resolve client address) → GatewayRequest
//!     → gateway pipeline
//!     → response.rs (GatewayResponse → axum Response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{GatewayRequest, UuidRequestId, X_REQUEST_ID};
pub use response::GatewayResponse;
pub use server::GatewayServer;
