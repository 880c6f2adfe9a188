//! Connection pool.
//!
//! A bounded pool of live database connections, each tagged with the
//! credential epoch it authenticated with. Connections are recycled at
//! acquisition time once they exceed the recycle interval, bounding
//! worst-case exposure to a token that expired mid-life.

mod connection;
mod manager;

pub use connection::{ConnectionFactory, PgConnectionFactory};
pub use manager::{ConnectionPool, PoolConfig, PoolStatus, PooledConn};

/// The production pool over Postgres connections.
pub type PostgresPool = ConnectionPool<PgConnectionFactory>;
