//! API key authentication.

use axum::http::HeaderMap;

use crate::auth::{constant_time_eq, AuthError};
use crate::config::ApiKeyPolicy;

/// Check the configured header against the allowed key set.
///
/// With a prefix configured, the header value must start with it and the
/// prefix is stripped before comparison.
pub fn validate(headers: &HeaderMap, policy: &ApiKeyPolicy) -> Result<(), AuthError> {
    let raw = headers
        .get(policy.header.as_str())
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::ApiKeyInvalid)?;

    let key = match &policy.prefix {
        Some(prefix) => raw.strip_prefix(prefix.as_str()).ok_or(AuthError::ApiKeyInvalidFormat)?,
        None => raw,
    };

    if policy
        .keys
        .iter()
        .any(|valid| constant_time_eq(valid.as_bytes(), key.as_bytes()))
    {
        Ok(())
    } else {
        Err(AuthError::ApiKeyInvalid)
    }
}
