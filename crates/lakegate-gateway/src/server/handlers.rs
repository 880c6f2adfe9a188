//! HTTP handlers for health and resource provisioning.

use axum::extract::State;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use lakegate_core::{ResourceSpec, ResourceState};

use crate::pool::PoolStatus;

use super::error::ApiResult;
use super::state::AppState;

/// Root response, mostly useful to verify the API is running.
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to the Lakegate API. See /api/v1 for endpoints."
    }))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Simple liveness check.
pub async fn health() -> Json<HealthResponse> {
    debug!("[Gateway] Health check");
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

#[derive(Serialize)]
pub struct DatabaseHealth {
    pub reachable: bool,
    pub credential_within_valid_window: bool,
    pub pool: PoolStatus,
}

#[derive(Serialize)]
pub struct HealthcheckResponse {
    pub status: String,
    pub resource_state: ResourceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseHealth>,
    pub timestamp: DateTime<Utc>,
}

/// Detailed health: resource state, pool liveness, and whether the
/// service credential is still inside its valid window.
pub async fn healthcheck(State(state): State<AppState>) -> Json<HealthcheckResponse> {
    let resource = state.lifecycle.current().await;

    let database = match &state.db {
        Some(db) => {
            let credential = db.credentials.current();
            let reachable = match db.pool.ping(&credential).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("[Gateway] Database health check failed: {}", e);
                    false
                }
            };
            Some(DatabaseHealth {
                reachable,
                credential_within_valid_window: db.credentials.is_within_valid_window(),
                pool: db.pool.status(),
            })
        }
        None => None,
    };

    let healthy = match &database {
        Some(db) => db.reachable && db.credential_within_valid_window,
        None => resource.state != ResourceState::Failed,
    };

    Json(HealthcheckResponse {
        status: if healthy { "OK" } else { "degraded" }.to_string(),
        resource_state: resource.state,
        database,
        timestamp: Utc::now(),
    })
}

#[derive(Debug, Deserialize)]
pub struct CreateResourcesRequest {
    /// Acknowledges that provisioning creates billable resources.
    pub create_resources: bool,
    pub capacity: Option<String>,
    pub node_count: Option<u32>,
    pub retention_window_in_days: Option<u32>,
}

#[derive(Serialize)]
pub struct ResourceStateResponse {
    pub instance: String,
    pub state: ResourceState,
    pub last_transition_at: DateTime<Utc>,
    pub message: String,
}

impl ResourceStateResponse {
    fn new(instance: &str, state: ResourceState, at: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            instance: instance.to_string(),
            state,
            last_transition_at: at,
            message: message.into(),
        }
    }
}

/// Create the managed resource. Idempotent: repeated requests while
/// provisioning is in flight (or already done) return the current
/// state without re-issuing the provider call. Returns immediately;
/// completion is observed via the status endpoint.
pub async fn create_resources(
    State(state): State<AppState>,
    Json(request): Json<CreateResourcesRequest>,
) -> ApiResult<Json<ResourceStateResponse>> {
    let instance = &state.settings.instance_name;

    if !request.create_resources {
        info!("[Gateway] create_resources not acknowledged; nothing created");
        let resource = state.lifecycle.current().await;
        return Ok(Json(ResourceStateResponse::new(
            instance,
            resource.state,
            resource.last_transition_at,
            "No resources were created (create_resources=false)",
        )));
    }

    let mut spec = ResourceSpec::new(instance.clone());
    if let Some(capacity) = request.capacity {
        spec.capacity = capacity;
    }
    if let Some(node_count) = request.node_count {
        spec.node_count = node_count;
    }
    if let Some(retention) = request.retention_window_in_days {
        spec.retention_window_in_days = retention;
    }

    let new_state = state.lifecycle.request_create(Some(spec)).await?;
    let resource = state.lifecycle.current().await;

    let message = match new_state {
        ResourceState::Creating => {
            "Resource creation accepted; provisioning runs asynchronously. Poll the status endpoint."
        }
        ResourceState::Ready => "Resource already exists; nothing to do.",
        _ => "Create request acknowledged.",
    };

    Ok(Json(ResourceStateResponse::new(
        instance,
        new_state,
        resource.last_transition_at,
        message,
    )))
}

#[derive(Debug, Deserialize)]
pub struct DeleteResourcesRequest {
    /// Safety gate: deletion proceeds only when explicitly confirmed.
    pub confirm_deletion: bool,
}

/// Delete the managed resource. An unconfirmed request is rejected
/// with a validation error and leaves the state untouched.
pub async fn delete_resources(
    State(state): State<AppState>,
    Json(request): Json<DeleteResourcesRequest>,
) -> ApiResult<Json<ResourceStateResponse>> {
    let new_state = state.lifecycle.request_delete(request.confirm_deletion).await?;
    let resource = state.lifecycle.current().await;

    Ok(Json(ResourceStateResponse::new(
        &state.settings.instance_name,
        new_state,
        resource.last_transition_at,
        "Resource deletion accepted; teardown runs asynchronously.",
    )))
}

/// Current resource state. Polls the provider when a transition is in
/// flight, so the response reflects completed work.
pub async fn resource_status(
    State(state): State<AppState>,
) -> ApiResult<Json<ResourceStateResponse>> {
    let new_state = state.lifecycle.poll().await?;
    let resource = state.lifecycle.current().await;

    Ok(Json(ResourceStateResponse::new(
        &state.settings.instance_name,
        new_state,
        resource.last_transition_at,
        format!("Resource is {}", new_state),
    )))
}
