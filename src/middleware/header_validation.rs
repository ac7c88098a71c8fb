//! Rejects requests carrying a bad `X-Custom-Validation` header.

use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::json;

use crate::http::{GatewayRequest, GatewayResponse};
use crate::middleware::{Middleware, Next};

const VALIDATION_HEADER: &str = "x-custom-validation";

/// Absent header passes; present header must equal `valid`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderValidation;

impl HeaderValidation {
    pub const ID: &'static str = "header_validation";
}

#[async_trait]
impl Middleware for HeaderValidation {
    fn name(&self) -> &str {
        Self::ID
    }

    async fn process(&self, request: GatewayRequest, next: Next<'_>) -> GatewayResponse {
        if let Some(value) = request.headers.get(VALIDATION_HEADER) {
            if value.as_bytes() != b"valid" {
                tracing::debug!(value = ?value, "Rejected by custom validation header");
                return GatewayResponse::json(
                    StatusCode::BAD_REQUEST,
                    &json!({ "error": "Invalid custom validation header" }),
                );
            }
        }
        next.run(request).await
    }
}
