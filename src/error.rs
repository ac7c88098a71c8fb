//! Request-time error taxonomy and its mapping to HTTP responses.
//!
//! Errors are raised anywhere in the pipeline and translated exactly once,
//! at the pipeline boundary, into a `{"error": <message>}` JSON body.

use axum::http::header::{HeaderValue, ALLOW, RETRY_AFTER, WWW_AUTHENTICATE};
use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::auth::AuthError;
use crate::http::GatewayResponse;
use crate::security::rate_limit::RateLimitResult;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Route not found")]
    RouteNotFound,

    #[error("Method not allowed")]
    MethodNotAllowed { allowed: Vec<Method> },

    #[error(transparent)]
    Authentication(#[from] AuthError),

    #[error("Rate limit exceeded")]
    RateLimitExceeded(RateLimitResult),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Failed to read request body")]
    InvalidBody,

    #[error("Failed to reach target API: {0}")]
    Upstream(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Authentication(_) => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::InvalidBody => StatusCode::BAD_REQUEST,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<GatewayError> for GatewayResponse {
    fn from(err: GatewayError) -> Self {
        let mut response = GatewayResponse::json(err.status(), &json!({ "error": err.to_string() }));

        match &err {
            GatewayError::MethodNotAllowed { allowed } => {
                let list = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
                if let Ok(value) = HeaderValue::from_str(&list) {
                    response.headers.insert(ALLOW, value);
                }
            }
            GatewayError::Authentication(auth) => {
                response
                    .headers
                    .insert(WWW_AUTHENTICATE, HeaderValue::from_static(auth.scheme()));
            }
            GatewayError::RateLimitExceeded(result) => {
                result.apply_headers(&mut response.headers);
                response.headers.insert(RETRY_AFTER, HeaderValue::from(result.retry_after));
            }
            _ => {}
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_not_found_body() {
        let response = GatewayResponse::from(GatewayError::RouteNotFound);
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.text(), r#"{"error":"Route not found"}"#);
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let response = GatewayResponse::from(GatewayError::MethodNotAllowed {
            allowed: vec![Method::GET, Method::POST],
        });
        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.header("allow"), Some("GET, POST"));
    }

    #[test]
    fn test_auth_error_has_challenge() {
        let response = GatewayResponse::from(GatewayError::from(AuthError::BasicInvalidCredentials));
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.header("www-authenticate"), Some("Basic"));
        assert_eq!(response.text(), r#"{"error":"Invalid username or password"}"#);
    }

    #[test]
    fn test_rate_limit_headers() {
        let result = RateLimitResult {
            allowed: false,
            limit: 2,
            remaining: 0,
            used: 3,
            reset: 1_700_000_060,
            retry_after: 17,
        };
        let response = GatewayResponse::from(GatewayError::RateLimitExceeded(result));
        assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.header("retry-after"), Some("17"));
        assert_eq!(response.header("x-ratelimit-remaining"), Some("0"));
        assert_eq!(response.header("x-ratelimit-used"), Some("3"));
    }

    #[test]
    fn test_upstream_error_is_bad_gateway() {
        let response = GatewayResponse::from(GatewayError::Upstream("connection refused".into()));
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            response.text(),
            r#"{"error":"Failed to reach target API: connection refused"}"#
        );
    }
}
