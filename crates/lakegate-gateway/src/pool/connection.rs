//! Connection factory seam.
//!
//! The pool opens connections through a factory so the pool logic can
//! be exercised without a live database. The production factory opens
//! individual Postgres connections authenticated with the credential's
//! token as the password.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::Connection;
use tracing::debug;

use lakegate_core::{Credential, GatewayError};

/// Opens and checks authenticated connections for the pool.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    type Conn: Send + 'static;

    /// Open a new connection authenticated with `credential`. A
    /// credential rejected by the server maps to
    /// [`GatewayError::AuthenticationFailed`].
    async fn connect(&self, credential: &Credential) -> Result<Self::Conn, GatewayError>;

    /// Cheap liveness probe for health reporting.
    async fn ping(&self, conn: &mut Self::Conn) -> Result<(), GatewayError>;
}

/// Factory for real Postgres connections.
pub struct PgConnectionFactory {
    host: String,
    port: u16,
    database: String,
    service_user: String,
    application_name: String,
}

impl PgConnectionFactory {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        service_user: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            service_user: service_user.into(),
            application_name: "lakegate".to_string(),
        }
    }

    fn options(&self, credential: &Credential) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(credential.identity().db_username(&self.service_user))
            .password(credential.secret())
            .ssl_mode(PgSslMode::Require)
            .application_name(&self.application_name)
    }

    /// Postgres class 28 = invalid authorization specification.
    fn classify(err: sqlx::Error) -> GatewayError {
        match &err {
            sqlx::Error::Database(db) => {
                if db.code().map(|c| c.starts_with("28")).unwrap_or(false) {
                    return GatewayError::AuthenticationFailed(db.message().to_string());
                }
                GatewayError::Database(err)
            }
            _ => GatewayError::Database(err),
        }
    }
}

#[async_trait]
impl ConnectionFactory for PgConnectionFactory {
    type Conn = PgConnection;

    async fn connect(&self, credential: &Credential) -> Result<Self::Conn, GatewayError> {
        debug!(
            "[Pool] Opening connection for {} (epoch {})",
            credential.identity(),
            credential.epoch()
        );
        PgConnection::connect_with(&self.options(credential))
            .await
            .map_err(Self::classify)
    }

    async fn ping(&self, conn: &mut Self::Conn) -> Result<(), GatewayError> {
        sqlx::query("SELECT 1").execute(conn).await?;
        Ok(())
    }
}
