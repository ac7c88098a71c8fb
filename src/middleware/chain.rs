//! Ordered middleware execution.

use std::sync::Arc;

use crate::config::{ConfigError, RouteDefinition};
use crate::http::{GatewayRequest, GatewayResponse};
use crate::middleware::{AccessLog, Endpoint, Middleware, MiddlewareRegistry};

/// Continuation handed to a middleware: the rest of the chain plus the endpoint.
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    pub fn new(middlewares: &'a [Arc<dyn Middleware>], endpoint: &'a dyn Endpoint) -> Self {
        Self {
            middlewares,
            endpoint,
        }
    }

    pub async fn run(self, request: GatewayRequest) -> GatewayResponse {
        match self.middlewares.split_first() {
            Some((current, rest)) => {
                current
                    .process(request, Next::new(rest, self.endpoint))
                    .await
            }
            None => self.endpoint.call(request).await,
        }
    }
}

/// A route's resolved middleware list, outermost first.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self { middlewares }
    }

    /// System middlewares enabled by the route, then its declared ones.
    pub fn for_route(route: &RouteDefinition, registry: &MiddlewareRegistry) -> Result<Self, ConfigError> {
        let mut middlewares: Vec<Arc<dyn Middleware>> = Vec::new();

        if route.logging.enabled {
            middlewares.push(Arc::new(AccessLog::for_route(route)));
        }

        for id in &route.middleware {
            let middleware = registry.get(id).ok_or_else(|| ConfigError::UnknownMiddleware {
                route: route.name.clone(),
                id: id.clone(),
            })?;
            middlewares.push(middleware);
        }

        Ok(Self { middlewares })
    }

    pub fn names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub async fn apply(&self, request: GatewayRequest, endpoint: &dyn Endpoint) -> GatewayResponse {
        Next::new(&self.middlewares, endpoint).run(request).await
    }
}
