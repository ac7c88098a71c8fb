//! JWT bearer authentication.
//!
//! Tokens are verified with the route's shared secret. Only the time claims
//! are checked (`exp` and `nbf`, zero leeway); payload claims are accepted
//! as-is and never forwarded.

use axum::http::HeaderMap;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::auth::AuthError;
use crate::config::JwtPolicy;

pub fn validate(headers: &HeaderMap, policy: &JwtPolicy) -> Result<(), AuthError> {
    let raw = headers
        .get(policy.header.as_str())
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::JwtMissingToken)?;

    let token = if policy.prefix.is_empty() {
        raw
    } else {
        raw.strip_prefix(policy.prefix.as_str())
            .ok_or(AuthError::JwtInvalidFormat)?
    }
    .trim();

    if token.is_empty() {
        return Err(AuthError::JwtMissingToken);
    }

    let mut validation = Validation::new(policy.algorithm);
    validation.required_spec_claims.clear();
    validation.validate_nbf = true;
    validation.validate_aud = false;
    validation.leeway = 0;

    decode::<serde_json::Value>(
        token,
        &DecodingKey::from_secret(policy.secret.as_bytes()),
        &validation,
    )
    .map(|_| ())
    .map_err(|e| {
        let detail = match e.kind() {
            ErrorKind::InvalidSignature => "Invalid token signature".to_string(),
            ErrorKind::ImmatureSignature => "Token not yet valid".to_string(),
            ErrorKind::ExpiredSignature => "Token expired".to_string(),
            _ => e.to_string(),
        };
        AuthError::JwtInvalidToken(detail)
    })
}
