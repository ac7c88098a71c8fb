//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, route
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency by route
//! - `gateway_cache_total` (counter): cache lookups by route and hit/miss
//! - `gateway_rate_limited_total` (counter): 429s by route
//! - `gateway_auth_failures_total` (counter): 401s by route
//! - `gateway_upstream_retries_total` (counter): extra upstream attempts by route
//! - `gateway_store_errors_total` (counter): key-value store failures by operation
//!
//! # Design Decisions
//! - Unmatched requests are labelled `route="none"` to bound cardinality

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    ::metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);
    ::metrics::histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache(route: &str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    ::metrics::counter!("gateway_cache_total", "route" => route.to_string(), "result" => result)
        .increment(1);
}

pub fn record_rate_limited(route: &str) {
    ::metrics::counter!("gateway_rate_limited_total", "route" => route.to_string()).increment(1);
}

pub fn record_auth_failure(route: &str) {
    ::metrics::counter!("gateway_auth_failures_total", "route" => route.to_string()).increment(1);
}

pub fn record_upstream_retry(route: &str) {
    ::metrics::counter!("gateway_upstream_retries_total", "route" => route.to_string())
        .increment(1);
}

pub fn record_store_error(op: &'static str) {
    ::metrics::counter!("gateway_store_errors_total", "op" => op).increment(1);
}
