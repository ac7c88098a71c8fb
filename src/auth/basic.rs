//! HTTP Basic authentication (RFC 7617).

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::auth::{constant_time_eq, AuthError};
use crate::config::BasicPolicy;

/// Legacy CGI-style header some clients still send.
const LEGACY_AUTHORIZATION: &str = "http_authorization";

pub fn validate(headers: &HeaderMap, policy: &BasicPolicy) -> Result<(), AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .or_else(|| headers.get(LEGACY_AUTHORIZATION))
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::BasicMissingCredentials)?;

    let encoded = strip_basic_scheme(header).ok_or(AuthError::BasicMissingCredentials)?;

    let decoded = STANDARD
        .decode(encoded)
        .ok()
        .filter(|bytes| !bytes.is_empty())
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or(AuthError::BasicInvalidCredentials)?;

    // user-id cannot contain colons, the password may
    let (username, password) = decoded
        .split_once(':')
        .ok_or(AuthError::BasicInvalidCredentials)?;

    let matched = policy.users.iter().any(|user| {
        constant_time_eq(user.username.as_bytes(), username.as_bytes())
            && constant_time_eq(user.password.as_bytes(), password.as_bytes())
    });

    if matched {
        Ok(())
    } else {
        Err(AuthError::BasicInvalidCredentials)
    }
}

/// `Basic <token>` with a case-insensitive scheme and any run of whitespace.
fn strip_basic_scheme(header: &str) -> Option<&str> {
    let (scheme, rest) = header.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    Some(rest.trim())
}
