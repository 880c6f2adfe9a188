//! Gateway error taxonomy.
//!
//! Callers can distinguish "try again" conditions (pool exhaustion,
//! query timeout) from hard failures (credential rejection, state
//! conflicts). Background refresh failures are recovered locally and
//! only surface here once they manifest as a connect-time failure.

use std::time::Duration;

use thiserror::Error;

use crate::domain::ResourceState;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The token source could not mint a credential. Retried on the
    /// next scheduled cycle, never synchronously in the request path.
    #[error("failed to mint credential: {0}")]
    CredentialMintFailed(String),

    /// The retained service credential has exceeded its lifetime after
    /// repeated mint failures.
    #[error("service credential expired and could not be refreshed")]
    CredentialExpired,

    /// Timed out waiting for a pool slot.
    #[error("connection pool exhausted (waited {0:?})")]
    PoolExhausted(Duration),

    /// The database rejected the credential at connect time.
    #[error("database authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A query exceeded the per-command timeout.
    #[error("query exceeded command timeout of {0:?}")]
    QueryTimeout(Duration),

    /// A lifecycle request conflicts with the current resource state.
    #[error("cannot {requested} while resource is {from}")]
    ResourceTransitionConflict {
        from: ResourceState,
        requested: &'static str,
    },

    /// The provider reported a failed provisioning or deletion.
    #[error("resource provisioning failed: {0}")]
    ResourceProvisioningFailed(String),

    /// Per-user mode request without the forwarded token header.
    #[error("missing forwarded authentication headers")]
    MissingAuthHeaders,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Vendor control-plane request failed.
    #[error("provider request failed: {0}")]
    Provider(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid configuration: {0}")]
    Settings(String),

    /// Listener or transport failure in the HTTP server.
    #[error("server error: {0}")]
    Server(String),
}

impl GatewayError {
    /// Whether a client could reasonably retry the request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::PoolExhausted(_) | GatewayError::QueryTimeout(_)
        )
    }
}
