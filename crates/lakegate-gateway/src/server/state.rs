//! Shared state for the HTTP handlers.

use std::sync::Arc;

use axum::http::HeaderMap;

use lakegate_core::{Credential, GatewayError, Settings};

use crate::credentials::{ServiceCredentialManager, UserCredentialCache};
use crate::lifecycle::LifecycleController;
use crate::pool::PostgresPool;

use super::auth_headers::extract_forwarded_identity;

/// Which trust model governs database authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// One shared service identity, refreshed in the background.
    AppLevel,
    /// Identity forwarded per request by the upstream gateway.
    PerUser,
}

/// The database-facing half of the application: credentials and pool.
/// Only constructed when the managed resource is available.
pub struct DbStack {
    pub credentials: Arc<ServiceCredentialManager>,
    pub user_cache: Arc<UserCredentialCache>,
    pub pool: Arc<PostgresPool>,
    pub auth_mode: AuthMode,
}

impl DbStack {
    /// Resolve the credential for a request under the active auth mode.
    /// In per-user mode a missing token header is a hard failure.
    pub fn credential_for(&self, headers: &HeaderMap) -> Result<Arc<Credential>, GatewayError> {
        match self.auth_mode {
            AuthMode::AppLevel => Ok(self.credentials.current()),
            AuthMode::PerUser => {
                let forwarded = extract_forwarded_identity(headers)?;
                Ok(self.user_cache.get_or_insert(
                    &forwarded.user_id,
                    &forwarded.access_token,
                    &forwarded.email,
                    self.credentials.epoch(),
                ))
            }
        }
    }
}

/// State for the always-mounted routes (health, provisioning).
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub lifecycle: Arc<LifecycleController>,
    pub db: Option<Arc<DbStack>>,
}

/// State for the capability-gated orders routes.
#[derive(Clone)]
pub struct OrdersState {
    pub settings: Arc<Settings>,
    pub db: Arc<DbStack>,
}
