//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Buffer the inbound request into a `GatewayRequest`
//! - Extract routing-relevant information (path, query, client address)
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Body buffered once so retries and cache keys see the same bytes
//! - Original request preserved; the upstream client builds its own copy

use std::net::IpAddr;

use axum::http::header::{HeaderName, HeaderValue};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method};
use bytes::Bytes;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates a UUID v4 request id when the client did not send one.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// A fully buffered inbound request.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub client_addr: Option<IpAddr>,
}

impl GatewayRequest {
    /// Build a request from a method and a `path?query` string.
    pub fn new(method: Method, path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (path_and_query.to_string(), None),
        };
        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            client_addr: None,
        }
    }

    /// Assemble from decomposed axum request parts.
    pub fn from_parts(parts: Parts, body: Bytes, client_addr: Option<IpAddr>) -> Self {
        Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers,
            body,
            client_addr,
        }
    }

    /// Add a header; invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_client_addr(mut self, addr: IpAddr) -> Self {
        self.client_addr = Some(addr);
        self
    }

    /// First value of a header as text, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Path plus raw query string, as the client sent it.
    pub fn uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }

    pub fn request_id(&self) -> &str {
        self.header(X_REQUEST_ID).unwrap_or("-")
    }

    /// Client address as text, or "unknown" when the listener did not provide one.
    pub fn client_ip(&self) -> String {
        self.client_addr
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path_and_query() {
        let req = GatewayRequest::new(Method::GET, "/users/1?fields=id&sort=asc");
        assert_eq!(req.path, "/users/1");
        assert_eq!(req.query.as_deref(), Some("fields=id&sort=asc"));
        assert_eq!(req.uri(), "/users/1?fields=id&sort=asc");

        let req = GatewayRequest::new(Method::GET, "/users");
        assert!(req.query.is_none());
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let req = GatewayRequest::new(Method::GET, "/").with_header("X-API-Key", "abc");
        assert_eq!(req.header("x-api-key"), Some("abc"));
        assert_eq!(req.request_id(), "-");
        assert_eq!(req.client_ip(), "unknown");
    }
}
