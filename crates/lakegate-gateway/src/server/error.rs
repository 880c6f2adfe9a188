//! HTTP mapping for the gateway error taxonomy.
//!
//! Clients can tell "try again" (503/504) from "something is broken"
//! (401/409/500). Database internals are never echoed to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::{error, warn};

use lakegate_core::GatewayError;

pub type ApiResult<T> = Result<T, ApiError>;

pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            GatewayError::MissingAuthHeaders | GatewayError::AuthenticationFailed(_) => {
                (StatusCode::UNAUTHORIZED, self.0.to_string())
            }
            GatewayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            GatewayError::NotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            GatewayError::ResourceTransitionConflict { .. } => {
                (StatusCode::CONFLICT, self.0.to_string())
            }
            GatewayError::PoolExhausted(_)
            | GatewayError::CredentialExpired
            | GatewayError::CredentialMintFailed(_)
            | GatewayError::ResourceProvisioningFailed(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.0.to_string())
            }
            GatewayError::QueryTimeout(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                "Request timed out. Please try again.".to_string(),
            ),
            GatewayError::Provider(_) => (
                StatusCode::BAD_GATEWAY,
                "Provider request failed. Please try again later.".to_string(),
            ),
            GatewayError::Database(_) | GatewayError::Settings(_) | GatewayError::Server(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error occurred. Please try again later.".to_string(),
            ),
        };

        if status.is_server_error() {
            error!("[Gateway] {} -> {}", self.0, status);
        } else {
            warn!("[Gateway] {} -> {}", self.0, status);
        }

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
