//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! GatewayRequest + route AuthPolicy
//!     → AuthenticationDispatcher (match on policy variant)
//!         - None   → Ok
//!         - ApiKey → api_key.rs
//!         - Basic  → basic.rs
//!         - Jwt    → jwt.rs
//!     → Ok(()) or AuthError (401, terminal for the request)
//! ```
//!
//! # Design Decisions
//! - Exhaustive match instead of runtime capability probing
//! - Each validator is a pure function of (headers, policy)
//! - Runs before any upstream call; failures are never retried

pub mod api_key;
pub mod basic;
pub mod jwt;

use crate::config::AuthPolicy;
use crate::http::GatewayRequest;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid API key format")]
    ApiKeyInvalidFormat,

    #[error("Invalid API key")]
    ApiKeyInvalid,

    #[error("Missing username or password")]
    BasicMissingCredentials,

    #[error("Invalid username or password")]
    BasicInvalidCredentials,

    #[error("Invalid JWT token format")]
    JwtInvalidFormat,

    #[error("Missing JWT token")]
    JwtMissingToken,

    #[error("Invalid JWT token: {0}")]
    JwtInvalidToken(String),
}

impl AuthError {
    /// Challenge scheme for the `WWW-Authenticate` header.
    pub fn scheme(&self) -> &'static str {
        match self {
            AuthError::ApiKeyInvalidFormat | AuthError::ApiKeyInvalid => "API-Key",
            AuthError::BasicMissingCredentials | AuthError::BasicInvalidCredentials => "Basic",
            AuthError::JwtInvalidFormat | AuthError::JwtMissingToken | AuthError::JwtInvalidToken(_) => {
                "Bearer"
            }
        }
    }
}

/// Routes a request to the validator for its route's auth policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticationDispatcher;

impl AuthenticationDispatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, request: &GatewayRequest, policy: &AuthPolicy) -> Result<(), AuthError> {
        match policy {
            AuthPolicy::None => Ok(()),
            AuthPolicy::ApiKey(p) => api_key::validate(&request.headers, p),
            AuthPolicy::Basic(p) => basic::validate(&request.headers, p),
            AuthPolicy::Jwt(p) => jwt::validate(&request.headers, p),
        }
    }
}

/// Compare secrets without short-circuiting on the first differing byte.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
