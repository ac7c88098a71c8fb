//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: every path and method goes to one handler
//! - Wire up layers (request ID, tracing)
//! - Buffer the body under the configured size limit
//! - Resolve the client address (socket, or `X-Forwarded-For` when trusted)
//! - Serve until the shutdown signal, then drain

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    Router,
};
use http_body_util::LengthLimitError;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::GatewayError;
use crate::gateway::GatewayPipeline;
use crate::http::{GatewayRequest, GatewayResponse, UuidRequestId};
use crate::lifecycle::Shutdown;
use crate::security::headers::forwarded_client;

/// State injected into the handler.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<GatewayPipeline>,
    max_body_size: usize,
    trust_forwarded_for: bool,
}

pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    pub fn new(pipeline: Arc<GatewayPipeline>, config: &ServerConfig) -> Self {
        let state = AppState {
            pipeline,
            max_body_size: config.max_body_size,
            trust_forwarded_for: config.trust_forwarded_for,
        };
        Self {
            router: Self::build_router(state),
        }
    }

    fn build_router(state: AppState) -> Router {
        Router::new().fallback(gateway_handler).with_state(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    /// The assembled router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Accept connections until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.notified())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let peer = client_addr(&request, state.trust_forwarded_for);
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) if exceeds_limit(&e) => {
            tracing::warn!(
                path = %parts.uri.path(),
                limit = state.max_body_size,
                "Request body over limit"
            );
            return GatewayResponse::from(GatewayError::PayloadTooLarge).into_response();
        }
        Err(e) => {
            tracing::warn!(path = %parts.uri.path(), error = %e, "Failed to read request body");
            return GatewayResponse::from(GatewayError::InvalidBody).into_response();
        }
    };

    state
        .pipeline
        .handle(GatewayRequest::from_parts(parts, body, peer))
        .await
        .into_response()
}

/// Whether a body read failed because it crossed the size limit, as opposed
/// to the client aborting or sending a malformed stream.
fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

fn client_addr<B>(request: &Request<B>, trust_forwarded_for: bool) -> Option<IpAddr> {
    if trust_forwarded_for {
        if let Some(addr) = forwarded_client(request.headers()) {
            return Some(addr);
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}
