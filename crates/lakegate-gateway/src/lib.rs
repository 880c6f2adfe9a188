//! # Lakegate Gateway
//!
//! HTTP facade over a managed Postgres whose credentials are
//! short-lived OAuth tokens.
//!
//! ## Modules
//!
//! - `credentials` - Service credential manager and per-user cache
//! - `pool` - Bounded connection pool with credential epochs and recycling
//! - `lifecycle` - Managed-resource state machine
//! - `server` - Axum server, handlers, and capability-gated routing

pub mod credentials;
pub mod lifecycle;
pub mod pool;
pub mod server;

pub use credentials::{ServiceCredentialManager, UserCredentialCache};
pub use lifecycle::LifecycleController;
pub use pool::{
    ConnectionFactory, ConnectionPool, PgConnectionFactory, PoolConfig, PoolStatus, PooledConn,
    PostgresPool,
};
pub use server::{
    auth_mode_from_settings, AppState, AuthMode, CapabilityProbe, DbStack, GatewayConfig,
    GatewayServer, OrdersState, ReadyProbe, RouteCapabilitySnapshot,
};
