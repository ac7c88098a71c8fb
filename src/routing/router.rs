//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for a request path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in declaration order; first match wins
//! - No specificity ranking: declaration order decides ambiguous paths
//! - Explicit NoMatch rather than silent default

use std::collections::HashMap;

use axum::http::Method;

use crate::config::{ConfigError, RouteDefinition};
use crate::config::validation::ValidationError;
use crate::routing::matcher::PathPattern;

/// A route definition with its pattern and method set compiled.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    pub definition: RouteDefinition,
    pattern: PathPattern,
    methods: Vec<Method>,
}

impl CompiledRoute {
    pub fn compile(definition: RouteDefinition) -> Result<Self, ConfigError> {
        let pattern = PathPattern::compile(&definition.path).map_err(|e| ConfigError::InvalidPattern {
            route: definition.name.clone(),
            reason: e.to_string(),
        })?;

        let mut methods = Vec::with_capacity(definition.methods.len());
        for raw in &definition.methods {
            let method = Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).map_err(|_| {
                ConfigError::Validation(vec![ValidationError::InvalidMethod {
                    route: definition.name.clone(),
                    method: raw.clone(),
                }])
            })?;
            if !methods.contains(&method) {
                methods.push(method);
            }
        }

        Ok(Self {
            definition,
            pattern,
            methods,
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Allowed methods in declaration order.
    pub fn allowed_methods(&self) -> &[Method] {
        &self.methods
    }
}

/// Result of a successful lookup: the route plus captured path variables.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub route: &'a CompiledRoute,
    pub variables: HashMap<String, String>,
}

/// Ordered, immutable route table.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    /// Compile route definitions, preserving declaration order.
    pub fn from_config(definitions: Vec<RouteDefinition>) -> Result<Self, ConfigError> {
        let routes = definitions
            .into_iter()
            .map(CompiledRoute::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { routes })
    }

    /// Find the first route whose pattern matches `path`.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.iter().find_map(|route| {
            route
                .pattern
                .captures(path)
                .map(|variables| RouteMatch { route, variables })
        })
    }

    /// Look up a route by its unique name.
    pub fn get(&self, name: &str) -> Option<&CompiledRoute> {
        self.routes.iter().find(|r| r.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledRoute> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Target;

    fn table() -> RouteTable {
        let mut detail = RouteDefinition::new(
            "user_detail",
            "/users/{id}",
            Target::from("https://api.example.com/users/{id}"),
        );
        detail.methods = vec!["GET".into(), "put".into(), "DELETE".into()];

        RouteTable::from_config(vec![
            RouteDefinition::new("users_list", "/users", "https://api.example.com/users".into()),
            detail,
            RouteDefinition::new("user_me", "/users/me", "https://api.example.com/me".into()),
        ])
        .unwrap()
    }

    #[test]
    fn test_match_literal_route() {
        let table = table();
        let m = table.match_path("/users").unwrap();
        assert_eq!(m.route.name(), "users_list");
        assert!(m.variables.is_empty());
    }

    #[test]
    fn test_match_with_variables() {
        let table = table();
        let m = table.match_path("/users/123").unwrap();
        assert_eq!(m.route.name(), "user_detail");
        assert_eq!(m.variables.get("id").map(String::as_str), Some("123"));
    }

    #[test]
    fn test_first_match_wins() {
        // "/users/me" is also matched by "/users/{id}", which is declared first.
        let table = table();
        let m = table.match_path("/users/me").unwrap();
        assert_eq!(m.route.name(), "user_detail");
        assert_eq!(m.variables["id"], "me");
    }

    #[test]
    fn test_no_match() {
        let table = table();
        assert!(table.match_path("/nonexistent").is_none());
        assert!(table.match_path("/users/1/extra").is_none());
    }

    #[test]
    fn test_methods_normalized() {
        let table = table();
        let route = table.get("user_detail").unwrap();
        assert!(route.allows(&Method::PUT));
        assert!(!route.allows(&Method::PATCH));
        assert_eq!(route.allowed_methods().len(), 3);
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = RouteTable::from_config(vec![RouteDefinition::new("bad", "/x/{", "http://a".into())])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }
}
