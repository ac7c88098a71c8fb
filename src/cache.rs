//! Response cache keyed on route and request identity.
//!
//! The key covers route name, path, method and raw query string. Bodies and
//! headers are not part of the key, so requests that differ only there share
//! an entry. Expiry is left to the store.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::RouteDefinition;
use crate::http::{GatewayRequest, GatewayResponse};
use crate::observability::metrics;
use crate::store::KeyValueStore;

/// Serialized form of a cached response.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedResponseEntry {
    status: u16,
    headers: Vec<(String, String)>,
    /// Base64 so binary payloads survive the JSON encoding.
    body: String,
}

impl CachedResponseEntry {
    fn from_response(response: &GatewayResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        Self {
            status: response.status.as_u16(),
            headers,
            body: STANDARD.encode(&response.body),
        }
    }

    fn into_response(self) -> Option<GatewayResponse> {
        let status = StatusCode::from_u16(self.status).ok()?;
        let body = STANDARD.decode(self.body).ok()?;

        let mut headers = HeaderMap::new();
        for (name, value) in self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                headers.append(name, value);
            }
        }

        Some(GatewayResponse {
            status,
            headers,
            body: body.into(),
        })
    }
}

pub struct ResponseCache {
    store: Arc<dyn KeyValueStore>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn key(route: &RouteDefinition, request: &GatewayRequest) -> String {
        let mut hasher = Sha256::new();
        // Length-prefixed so no two field tuples hash the same byte stream.
        for field in [
            route.name.as_str(),
            request.path.as_str(),
            request.method.as_str(),
            request.query.as_deref().unwrap_or(""),
        ] {
            hasher.update((field.len() as u64).to_be_bytes());
            hasher.update(field.as_bytes());
        }
        format!("cache_{:x}", hasher.finalize())
    }

    /// Cached response for this request, if the route caches and one is live.
    ///
    /// Store failures and undecodable entries count as a miss.
    pub async fn get(&self, route: &RouteDefinition, request: &GatewayRequest) -> Option<GatewayResponse> {
        if !route.cache.is_enabled() {
            return None;
        }

        let key = Self::key(route, request);
        let bytes = match self.store.get(&key).await {
            Ok(bytes) => bytes?,
            Err(e) => {
                tracing::warn!(route = %route.name, error = %e, "Cache lookup failed");
                metrics::record_store_error("cache_get");
                return None;
            }
        };

        let entry = serde_json::from_slice::<CachedResponseEntry>(&bytes)
            .ok()
            .and_then(CachedResponseEntry::into_response);
        if entry.is_none() {
            tracing::warn!(route = %route.name, key = %key, "Discarding undecodable cache entry");
        }
        entry
    }

    /// Store a response under the route's TTL. Failures are logged, never raised.
    pub async fn set(&self, route: &RouteDefinition, request: &GatewayRequest, response: &GatewayResponse) {
        if !route.cache.is_enabled() {
            return;
        }

        let key = Self::key(route, request);
        let encoded = match serde_json::to_vec(&CachedResponseEntry::from_response(response)) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(route = %route.name, error = %e, "Failed to encode cache entry");
                return;
            }
        };

        if let Err(e) = self
            .store
            .set(&key, encoded, Duration::from_secs(route.cache.ttl))
            .await
        {
            tracing::warn!(route = %route.name, error = %e, "Cache write failed");
            metrics::record_store_error("cache_set");
        }
    }
}
