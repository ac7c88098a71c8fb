//! Request-processing pipeline.
//!
//! # Data Flow
//! ```text
//! GatewayRequest
//!     → RouteTable::match_path        (404 if none)
//!     → method check                  (405 if not allowed)
//!     → MiddlewareChain wraps:
//!         → ResponseCache::get        (hit returns verbatim)
//!         → RateLimiter::check        (429 if exceeded)
//!         → AuthenticationDispatcher  (401 on failure)
//!         → LoadBalancer::select → substitute path variables
//!         → UpstreamClient::forward   (502 on failure)
//!         → response filter → ResponseCache::set
//!     → GatewayResponse
//! ```
//!
//! # Design Decisions
//! - Errors are typed until the endpoint boundary, then rendered once
//! - A cache hit skips rate limiting and authentication entirely
//! - Quota headers are added after caching so entries never carry
//!   another client's counters

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::auth::AuthenticationDispatcher;
use crate::cache::ResponseCache;
use crate::config::{ConfigError, RouteDefinition};
use crate::error::GatewayError;
use crate::filter;
use crate::http::{GatewayRequest, GatewayResponse};
use crate::load_balancer::{LoadBalancer, WeightedRandom};
use crate::middleware::{Endpoint, MiddlewareChain, MiddlewareRegistry};
use crate::observability::metrics;
use crate::routing::{substitute, CompiledRoute, RouteTable};
use crate::security::RateLimiter;
use crate::store::KeyValueStore;
use crate::upstream::{UpstreamClient, UpstreamTransport};

pub struct GatewayPipeline {
    routes: RouteTable,
    chains: HashMap<String, MiddlewareChain>,
    auth: AuthenticationDispatcher,
    rate_limiter: RateLimiter,
    cache: ResponseCache,
    balancer: Arc<dyn LoadBalancer>,
    upstream: UpstreamClient,
}

impl GatewayPipeline {
    /// Compile routes and resolve every route's middleware chain.
    ///
    /// Fails on an invalid path pattern or an unknown middleware id.
    pub fn new(
        definitions: Vec<RouteDefinition>,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn UpstreamTransport>,
        registry: &MiddlewareRegistry,
    ) -> Result<Self, ConfigError> {
        let routes = RouteTable::from_config(definitions)?;

        let mut chains = HashMap::with_capacity(routes.len());
        for route in routes.iter() {
            let chain = MiddlewareChain::for_route(&route.definition, registry)?;
            tracing::debug!(route = %route.name(), middleware = ?chain.names(), "Resolved middleware chain");
            chains.insert(route.name().to_string(), chain);
        }

        Ok(Self {
            routes,
            chains,
            auth: AuthenticationDispatcher::new(),
            rate_limiter: RateLimiter::new(Arc::clone(&store)),
            cache: ResponseCache::new(store),
            balancer: Arc::new(WeightedRandom::new()),
            upstream: UpstreamClient::new(transport),
        })
    }

    pub fn with_load_balancer(mut self, balancer: Arc<dyn LoadBalancer>) -> Self {
        self.balancer = balancer;
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn chain(&self, route: &str) -> Option<&MiddlewareChain> {
        self.chains.get(route)
    }

    /// Run one request through the pipeline. Never fails: every error
    /// becomes a JSON error response.
    pub async fn handle(&self, request: GatewayRequest) -> GatewayResponse {
        let start = Instant::now();
        let method = request.method.as_str().to_string();

        let Some(matched) = self.routes.match_path(&request.path) else {
            tracing::debug!(method = %method, path = %request.path, "No route matched");
            metrics::record_request(&method, 404, "none", start);
            return GatewayError::RouteNotFound.into();
        };
        let route = matched.route;

        let response = if !route.allows(&request.method) {
            tracing::debug!(route = %route.name(), method = %method, "Method not allowed");
            GatewayError::MethodNotAllowed {
                allowed: route.allowed_methods().to_vec(),
            }
            .into()
        } else {
            let endpoint = RouteEndpoint {
                pipeline: self,
                route,
                variables: matched.variables,
            };
            match self.chains.get(route.name()) {
                Some(chain) => chain.apply(request, &endpoint).await,
                None => endpoint.call(request).await,
            }
        };

        metrics::record_request(&method, response.status.as_u16(), route.name(), start);
        response
    }

    async fn process(
        &self,
        route: &CompiledRoute,
        variables: &HashMap<String, String>,
        request: GatewayRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        let definition = &route.definition;
        let name = route.name();

        if definition.cache.is_enabled() {
            if let Some(cached) = self.cache.get(definition, &request).await {
                metrics::record_cache(name, true);
                tracing::debug!(route = %name, request_id = %request.request_id(), "Serving cached response");
                return Ok(cached);
            }
            metrics::record_cache(name, false);
        }

        let mut quota = None;
        if definition.rate_limit.is_enabled() {
            let identifier = if definition.rate_limit.per_client {
                request.client_ip()
            } else {
                RateLimiter::route_identifier(&definition.path)
            };
            let result = self
                .rate_limiter
                .check(name, &identifier, &definition.rate_limit)
                .await;
            if !result.allowed {
                metrics::record_rate_limited(name);
                tracing::info!(
                    route = %name,
                    identifier = %identifier,
                    used = result.used,
                    retry_after = result.retry_after,
                    "Rate limit exceeded"
                );
                return Err(GatewayError::RateLimitExceeded(result));
            }
            quota = Some(result);
        }

        if let Err(e) = self.auth.validate(&request, &definition.auth) {
            metrics::record_auth_failure(name);
            tracing::info!(
                route = %name,
                request_id = %request.request_id(),
                auth = definition.auth.kind(),
                error = %e,
                "Authentication failed"
            );
            return Err(e.into());
        }

        let target = self
            .balancer
            .select(&definition.target)
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;
        let url = substitute(target, variables);

        let mut response = self
            .upstream
            .forward(name, &url, &request, &definition.timeout)
            .await
            .map_err(|e| {
                tracing::warn!(
                    route = %name,
                    request_id = %request.request_id(),
                    url = %url,
                    error = %e,
                    "Upstream request failed"
                );
                GatewayError::Upstream(e.to_string())
            })?;

        if !definition.response_filter.is_empty() {
            response.body = filter::apply(&response.body, &definition.response_filter);
        }

        self.cache.set(definition, &request, &response).await;

        if let Some(quota) = quota {
            quota.apply_headers(&mut response.headers);
        }
        Ok(response)
    }
}

/// Innermost step of a route's chain for one request.
struct RouteEndpoint<'a> {
    pipeline: &'a GatewayPipeline,
    route: &'a CompiledRoute,
    variables: HashMap<String, String>,
}

#[async_trait]
impl<'a> Endpoint for RouteEndpoint<'a> {
    async fn call(&self, request: GatewayRequest) -> GatewayResponse {
        self.pipeline
            .process(self.route, &self.variables, request)
            .await
            .unwrap_or_else(GatewayResponse::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKeyPolicy, AuthPolicy, Target};
    use crate::store::{InMemoryStore, StoreError};
    use crate::upstream::{TransportError, UpstreamRequest};
    use axum::http::{Method, StatusCode};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers every call with a fixed JSON body and records the URLs hit.
    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicU32,
        urls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl CountingTransport {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UpstreamTransport for CountingTransport {
        async fn send(&self, request: UpstreamRequest) -> Result<GatewayResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(request.url.to_string());
            if self.fail {
                return Err(TransportError("connection refused".into()));
            }
            Ok(GatewayResponse::new(StatusCode::OK)
                .with_header("content-type", "application/json")
                .with_body(r#"{"id":1,"name":"x","email":"y","age":1}"#))
        }
    }

    struct FailingStore;

    #[async_trait]
    impl KeyValueStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }

        async fn compare_and_swap(
            &self,
            _key: &str,
            _expected: Option<&[u8]>,
            _new: Vec<u8>,
            _ttl: Duration,
        ) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    fn route(name: &str, path: &str, target: &str) -> RouteDefinition {
        RouteDefinition::new(name, path, Target::from(target))
    }

    fn pipeline_with(
        routes: Vec<RouteDefinition>,
        transport: Arc<CountingTransport>,
        store: Arc<dyn KeyValueStore>,
    ) -> GatewayPipeline {
        GatewayPipeline::new(routes, store, transport, &MiddlewareRegistry::with_builtins()).unwrap()
    }

    fn pipeline(routes: Vec<RouteDefinition>, transport: Arc<CountingTransport>) -> GatewayPipeline {
        pipeline_with(routes, transport, Arc::new(InMemoryStore::new()))
    }

    fn get(path: &str) -> GatewayRequest {
        GatewayRequest::new(Method::GET, path).with_client_addr("10.0.0.1".parse().unwrap())
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let transport = Arc::new(CountingTransport::default());
        let gateway = pipeline(vec![route("users", "/users", "http://b/users")], transport.clone());

        let response = gateway.handle(get("/orders")).await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.text(), r#"{"error":"Route not found"}"#);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let transport = Arc::new(CountingTransport::default());
        let gateway = pipeline(vec![route("users", "/users", "http://b/users")], transport.clone());

        let response = gateway
            .handle(GatewayRequest::new(Method::DELETE, "/users"))
            .await;

        assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.header("allow"), Some("GET"));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_path_variables_substituted_into_target() {
        let transport = Arc::new(CountingTransport::default());
        let gateway = pipeline(
            vec![route("user", "/users/{id}", "http://b/api/users/{id}")],
            transport.clone(),
        );

        let response = gateway.handle(get("/users/42")).await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(*transport.urls.lock().unwrap(), vec!["http://b/api/users/42"]);
    }

    #[tokio::test]
    async fn test_cached_response_skips_upstream() {
        let transport = Arc::new(CountingTransport::default());
        let mut cached = route("users", "/users", "http://b/users");
        cached.cache.ttl = 60;
        let gateway = pipeline(vec![cached], transport.clone());

        let first = gateway.handle(get("/users")).await;
        let second = gateway.handle(get("/users")).await;

        assert_eq!(first, second);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_bypasses_auth() {
        let transport = Arc::new(CountingTransport::default());
        let mut secured = route("users", "/users", "http://b/users");
        secured.cache.ttl = 60;
        secured.auth = AuthPolicy::ApiKey(ApiKeyPolicy {
            header: "X-API-Key".into(),
            prefix: None,
            keys: vec!["k1".into()],
        });
        let gateway = pipeline(vec![secured], transport.clone());

        let warm = gateway.handle(get("/users").with_header("X-API-Key", "k1")).await;
        let anonymous = gateway.handle(get("/users")).await;

        assert_eq!(warm.status, StatusCode::OK);
        assert_eq!(anonymous.status, StatusCode::OK);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_exceeded_is_429() {
        let transport = Arc::new(CountingTransport::default());
        let mut limited = route("users", "/users", "http://b/users");
        limited.rate_limit.limit = 1;
        limited.rate_limit.period = 60;
        let gateway = pipeline(vec![limited], transport.clone());

        let first = gateway.handle(get("/users")).await;
        let second = gateway.handle(get("/users")).await;

        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(first.header("x-ratelimit-remaining"), Some("0"));
        assert_eq!(second.status, StatusCode::TOO_MANY_REQUESTS);
        let retry_after: u64 = second.header("retry-after").unwrap().parse().unwrap();
        assert!(retry_after >= 1);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_global_rate_limit_shared_across_clients() {
        let transport = Arc::new(CountingTransport::default());
        let mut limited = route("users", "/users", "http://b/users");
        limited.rate_limit.limit = 1;
        limited.rate_limit.period = 60;
        limited.rate_limit.per_client = false;
        let gateway = pipeline(vec![limited], transport);

        let a = GatewayRequest::new(Method::GET, "/users").with_client_addr("10.0.0.1".parse().unwrap());
        let b = GatewayRequest::new(Method::GET, "/users").with_client_addr("10.0.0.2".parse().unwrap());

        assert_eq!(gateway.handle(a).await.status, StatusCode::OK);
        assert_eq!(gateway.handle(b).await.status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_rate_limit_store_failure_fails_open() {
        let transport = Arc::new(CountingTransport::default());
        let mut limited = route("users", "/users", "http://b/users");
        limited.rate_limit.limit = 1;
        limited.rate_limit.period = 60;
        let gateway = pipeline_with(vec![limited], transport, Arc::new(FailingStore));

        assert_eq!(gateway.handle(get("/users")).await.status, StatusCode::OK);
        assert_eq!(gateway.handle(get("/users")).await.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_auth_failure_never_reaches_upstream() {
        let transport = Arc::new(CountingTransport::default());
        let mut secured = route("users", "/users", "http://b/users");
        secured.auth = AuthPolicy::ApiKey(ApiKeyPolicy {
            header: "X-API-Key".into(),
            prefix: None,
            keys: vec!["k1".into()],
        });
        let gateway = pipeline(vec![secured], transport.clone());

        let denied = gateway.handle(get("/users").with_header("X-API-Key", "bad")).await;
        assert_eq!(denied.status, StatusCode::UNAUTHORIZED);
        assert_eq!(denied.text(), r#"{"error":"Invalid API key"}"#);
        assert_eq!(transport.calls(), 0);

        let allowed = gateway.handle(get("/users").with_header("X-API-Key", "k1")).await;
        assert_eq!(allowed.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_502() {
        let transport = Arc::new(CountingTransport::failing());
        let gateway = pipeline(vec![route("users", "/users", "http://b/users")], transport);

        let response = gateway.handle(get("/users")).await;

        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            response.text(),
            r#"{"error":"Failed to reach target API: connection refused"}"#
        );
    }

    #[tokio::test]
    async fn test_response_filter_applied() {
        let transport = Arc::new(CountingTransport::default());
        let mut filtered = route("users", "/users", "http://b/users");
        filtered.response_filter.include = vec!["id".into(), "name".into()];
        let gateway = pipeline(vec![filtered], transport);

        let response = gateway.handle(get("/users")).await;
        assert_eq!(response.text(), r#"{"id":1,"name":"x"}"#);
    }

    #[tokio::test]
    async fn test_user_middleware_short_circuits() {
        let transport = Arc::new(CountingTransport::default());
        let mut guarded = route("users", "/users", "http://b/users");
        guarded.middleware = vec!["header_validation".into()];
        guarded.logging.enabled = true;
        let gateway = pipeline(vec![guarded], transport.clone());

        let response = gateway
            .handle(get("/users").with_header("X-Custom-Validation", "forged"))
            .await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(transport.calls(), 0);
        assert_eq!(
            gateway.chain("users").unwrap().names(),
            vec!["access_log", "header_validation"]
        );
    }

    #[test]
    fn test_unknown_middleware_fails_construction() {
        let mut bad = route("users", "/users", "http://b/users");
        bad.middleware = vec!["nope".into()];

        let result = GatewayPipeline::new(
            vec![bad],
            Arc::new(InMemoryStore::new()),
            Arc::new(CountingTransport::default()),
            &MiddlewareRegistry::with_builtins(),
        );
        assert!(matches!(result, Err(ConfigError::UnknownMiddleware { .. })));
    }
}
