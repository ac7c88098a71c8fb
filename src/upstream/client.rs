//! Upstream client: header hygiene, deadline and retries around a transport.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue};
use url::Url;

use crate::config::TimeoutPolicy;
use crate::http::{GatewayRequest, GatewayResponse};
use crate::observability::metrics;
use crate::resilience::{retry, with_deadline, DeadlineExceeded, RetryPolicy, Retryable};
use crate::security::headers::{sanitize_headers, strip_hop_by_hop, X_FORWARDED_FOR};
use crate::upstream::transport::{TransportError, UpstreamRequest, UpstreamTransport};

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid target URL '{url}': {reason}")]
    InvalidTarget { url: String, reason: String },

    #[error(transparent)]
    Timeout(#[from] DeadlineExceeded),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Retryable for UpstreamError {
    fn is_retryable(&self) -> bool {
        !matches!(self, UpstreamError::InvalidTarget { .. })
    }
}

#[derive(Clone)]
pub struct UpstreamClient {
    transport: Arc<dyn UpstreamTransport>,
}

impl UpstreamClient {
    pub fn new(transport: Arc<dyn UpstreamTransport>) -> Self {
        Self { transport }
    }

    /// Forward `request` to `target_url` under the route's timeout policy.
    ///
    /// `route` only labels logs and metrics.
    pub async fn forward(
        &self,
        route: &str,
        target_url: &str,
        request: &GatewayRequest,
        policy: &TimeoutPolicy,
    ) -> Result<GatewayResponse, UpstreamError> {
        let url = Url::parse(target_url).map_err(|e| UpstreamError::InvalidTarget {
            url: target_url.to_string(),
            reason: e.to_string(),
        })?;

        let headers = sanitize_headers(&request.headers, &forwarding_headers(request));
        let body = (!request.body.is_empty()).then(|| request.body.clone());
        let deadline = policy.duration();

        let mut response = retry(RetryPolicy::from(policy), |attempt| {
            if attempt > 1 {
                metrics::record_upstream_retry(route);
            }
            let outbound = UpstreamRequest {
                method: request.method.clone(),
                url: url.clone(),
                headers: headers.clone(),
                body: body.clone(),
            };
            let transport = Arc::clone(&self.transport);
            async move {
                let response = with_deadline(deadline, transport.send(outbound)).await??;
                Ok::<_, UpstreamError>(response)
            }
        })
        .await?;

        tracing::debug!(
            route = %route,
            url = %url,
            status = response.status.as_u16(),
            "Upstream responded"
        );

        strip_hop_by_hop(&mut response.headers);
        Ok(response)
    }
}

/// `X-Forwarded-For` for requests that arrive without one.
///
/// An existing chain is relayed as-is.
fn forwarding_headers(request: &GatewayRequest) -> HeaderMap {
    let mut extra = HeaderMap::new();
    if request.headers.contains_key(X_FORWARDED_FOR) {
        return extra;
    }
    if let Some(addr) = request.client_addr {
        if let Ok(value) = HeaderValue::from_str(&addr.to_string()) {
            extra.insert(X_FORWARDED_FOR, value);
        }
    }
    extra
}
