//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate route names, path patterns, methods and targets
//! - Validate policy values (rate-limit periods, auth material, log levels)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use axum::http::Method;
use jsonwebtoken::Algorithm;
use url::Url;

use crate::config::route::{AuthPolicy, RouteDefinition};
use crate::config::schema::GatewayConfig;
use crate::routing::matcher::PathPattern;

/// Methods a route may declare.
const SUPPORTED_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("route with empty name")]
    EmptyRouteName,

    #[error("duplicate route name '{0}'")]
    DuplicateRoute(String),

    #[error("route '{route}': invalid path: {reason}")]
    InvalidPath { route: String, reason: String },

    #[error("route '{route}': no methods declared")]
    NoMethods { route: String },

    #[error("route '{route}': unsupported method '{method}'")]
    InvalidMethod { route: String, method: String },

    #[error("route '{route}': target list is empty")]
    EmptyTargets { route: String },

    #[error("route '{route}': invalid target '{target}': {reason}")]
    InvalidTarget {
        route: String,
        target: String,
        reason: String,
    },

    #[error("route '{route}': rate limit period must be greater than zero")]
    InvalidRateLimit { route: String },

    #[error("route '{route}': {field} must not exceed {max} seconds")]
    DurationTooLong {
        route: String,
        field: &'static str,
        max: u64,
    },

    #[error("route '{route}': {reason}")]
    InvalidAuth { route: String, reason: String },

    #[error("route '{route}': unknown logging level '{level}'")]
    InvalidLogLevel { route: String, level: String },
}

/// Upper bound for `cache.ttl` and `rate_limit.period` (one year).
pub const MAX_POLICY_SECS: u64 = 365 * 24 * 60 * 60;

/// Validate the whole configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for route in &config.routes {
        if route.name.trim().is_empty() {
            errors.push(ValidationError::EmptyRouteName);
        } else if !seen.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }
        validate_route(route, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_route(route: &RouteDefinition, errors: &mut Vec<ValidationError>) {
    let name = route.name.clone();

    if let Err(e) = PathPattern::compile(&route.path) {
        errors.push(ValidationError::InvalidPath {
            route: name.clone(),
            reason: e.to_string(),
        });
    }

    if route.methods.is_empty() {
        errors.push(ValidationError::NoMethods { route: name.clone() });
    }
    for method in &route.methods {
        let upper = method.to_ascii_uppercase();
        if !SUPPORTED_METHODS.contains(&upper.as_str()) || Method::from_bytes(upper.as_bytes()).is_err() {
            errors.push(ValidationError::InvalidMethod {
                route: name.clone(),
                method: method.clone(),
            });
        }
    }

    let targets = route.target.urls();
    if targets.is_empty() {
        errors.push(ValidationError::EmptyTargets { route: name.clone() });
    }
    for target in targets {
        if let Err(reason) = check_target(target) {
            errors.push(ValidationError::InvalidTarget {
                route: name.clone(),
                target: target.clone(),
                reason,
            });
        }
    }

    if route.rate_limit.is_enabled() && route.rate_limit.period == 0 {
        errors.push(ValidationError::InvalidRateLimit { route: name.clone() });
    }
    if route.rate_limit.period > MAX_POLICY_SECS {
        errors.push(ValidationError::DurationTooLong {
            route: name.clone(),
            field: "rate_limit.period",
            max: MAX_POLICY_SECS,
        });
    }
    if route.cache.ttl > MAX_POLICY_SECS {
        errors.push(ValidationError::DurationTooLong {
            route: name.clone(),
            field: "cache.ttl",
            max: MAX_POLICY_SECS,
        });
    }

    if let Some(reason) = check_auth(&route.auth) {
        errors.push(ValidationError::InvalidAuth {
            route: name.clone(),
            reason,
        });
    }

    if route.logging.max_level().is_none() {
        errors.push(ValidationError::InvalidLogLevel {
            route: name,
            level: route.logging.level.clone(),
        });
    }
}

/// Targets must be absolute http(s) URLs once placeholders are filled in.
fn check_target(target: &str) -> Result<(), String> {
    let probe = fill_placeholders(target);
    let url = Url::parse(&probe).map_err(|e| e.to_string())?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("missing host".to_string());
    }
    Ok(())
}

fn fill_placeholders(target: &str) -> String {
    let mut out = String::with_capacity(target.len());
    let mut in_var = false;
    for c in target.chars() {
        match c {
            '{' => in_var = true,
            '}' if in_var => {
                in_var = false;
                out.push('x');
            }
            _ if in_var => {}
            _ => out.push(c),
        }
    }
    out
}

fn check_auth(policy: &AuthPolicy) -> Option<String> {
    match policy {
        AuthPolicy::None => None,
        AuthPolicy::ApiKey(p) if p.keys.is_empty() => Some("api_key auth requires at least one key".into()),
        AuthPolicy::ApiKey(p) if p.header.trim().is_empty() => Some("api_key auth header is empty".into()),
        AuthPolicy::ApiKey(_) => None,
        AuthPolicy::Basic(p) if p.users.is_empty() => Some("basic auth requires at least one user".into()),
        AuthPolicy::Basic(_) => None,
        AuthPolicy::Jwt(p) if p.secret.is_empty() => Some("jwt auth requires a secret".into()),
        AuthPolicy::Jwt(p) if !matches!(p.algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) => {
            Some(format!("unsupported jwt algorithm {:?}", p.algorithm))
        }
        AuthPolicy::Jwt(_) => None,
    }
}
