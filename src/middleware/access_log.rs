//! Per-route access logging.
//!
//! Emits `request received` before and `request processed` after the rest of
//! the chain, plus a WARN for 4xx and an ERROR for 5xx. Each event is gated
//! by the route's configured level.

use std::time::Instant;

use async_trait::async_trait;
use tracing::Level;

use crate::config::RouteDefinition;
use crate::http::{GatewayRequest, GatewayResponse};
use crate::middleware::{Middleware, Next};

#[derive(Debug, Clone)]
pub struct AccessLog {
    route: String,
    max_level: Level,
}

impl AccessLog {
    pub const ID: &'static str = "access_log";

    pub fn new(route: impl Into<String>, max_level: Level) -> Self {
        Self {
            route: route.into(),
            max_level,
        }
    }

    pub fn for_route(route: &RouteDefinition) -> Self {
        Self::new(route.name.clone(), route.logging.max_level().unwrap_or(Level::INFO))
    }

    /// Whether an event at `level` passes this route's threshold.
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.max_level
    }
}

#[async_trait]
impl Middleware for AccessLog {
    fn name(&self) -> &str {
        Self::ID
    }

    async fn process(&self, request: GatewayRequest, next: Next<'_>) -> GatewayResponse {
        let method = request.method.clone();
        let uri = request.uri();
        let client_ip = request.client_ip();
        let request_id = request.request_id().to_string();

        if self.enabled(Level::INFO) {
            tracing::info!(
                route = %self.route,
                request_id = %request_id,
                method = %method,
                uri = %uri,
                ip = %client_ip,
                "request received"
            );
        }

        let start = Instant::now();
        let response = next.run(request).await;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        let status = response.status.as_u16();

        if self.enabled(Level::INFO) {
            tracing::info!(
                route = %self.route,
                request_id = %request_id,
                method = %method,
                uri = %uri,
                status,
                duration_ms,
                "request processed"
            );
        }

        if response.status.is_client_error() && self.enabled(Level::WARN) {
            tracing::warn!(
                route = %self.route,
                request_id = %request_id,
                method = %method,
                uri = %uri,
                status,
                duration_ms,
                "client error"
            );
        }

        if response.status.is_server_error() && self.enabled(Level::ERROR) {
            tracing::error!(
                route = %self.route,
                request_id = %request_id,
                method = %method,
                uri = %uri,
                status,
                duration_ms,
                "server error"
            );
        }

        response
    }
}
