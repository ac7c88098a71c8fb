//! Header manipulation.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers before a request or response crosses a hop
//! - Resolve the client address from `X-Forwarded-For` when trusted
//!
//! # Design Decisions
//! - `HeaderName` is always lowercase, so matching is case-insensitive
//! - Existing `X-Forwarded-For` is ignored unless the operator opts in

use std::net::IpAddr;

use axum::http::header::{
    ACCEPT_ENCODING, CONNECTION, CONTENT_LENGTH, HOST, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE,
    TRANSFER_ENCODING, UPGRADE,
};
use axum::http::{HeaderMap, HeaderName};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Connection-scoped headers never relayed to the next hop.
pub const HOP_BY_HOP_HEADERS: [HeaderName; 10] = [
    CONNECTION,
    UPGRADE,
    PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION,
    TE,
    HeaderName::from_static("trailers"),
    TRANSFER_ENCODING,
    CONTENT_LENGTH,
    ACCEPT_ENCODING,
    HOST,
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(name)
}

pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

/// Merge `extra` over `incoming` (extra wins) and drop hop-by-hop headers.
pub fn sanitize_headers(incoming: &HeaderMap, extra: &HeaderMap) -> HeaderMap {
    let mut merged = incoming.clone();
    for name in extra.keys() {
        merged.remove(name);
        for value in extra.get_all(name) {
            merged.append(name.clone(), value.clone());
        }
    }
    strip_hop_by_hop(&mut merged);
    merged
}

/// Left-most parseable address of `X-Forwarded-For`.
pub fn forwarded_client(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse().ok())
}
