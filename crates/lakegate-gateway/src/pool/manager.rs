//! Pool manager: bounded acquisition, epoch tagging, recycling.
//!
//! Capacity is `size + max_overflow` semaphore permits; at most `size`
//! idle connections are retained between checkouts. Waiters past the
//! checkout timeout fail with `PoolExhausted`. A checked-out connection
//! is returned on every exit path via the guard's Drop.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::debug;

use lakegate_core::{Credential, GatewayError};

use super::ConnectionFactory;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub size: usize,
    pub max_overflow: usize,
    pub checkout_timeout: Duration,
    pub command_timeout: Duration,
    pub recycle_interval: Duration,
}

impl PoolConfig {
    fn capacity(&self) -> usize {
        self.size + self.max_overflow
    }
}

/// Point-in-time pool counters for health reporting.
#[derive(Debug, Serialize)]
pub struct PoolStatus {
    pub size: usize,
    pub max_overflow: usize,
    pub idle: usize,
    pub available_slots: usize,
}

struct IdleConn<C> {
    conn: C,
    created_at: Instant,
    epoch: u64,
}

struct PoolShared<C> {
    /// Idle connections partitioned by identity key.
    idle: Mutex<HashMap<String, VecDeque<IdleConn<C>>>>,
    recycle_interval: Duration,
    /// Max idle connections retained across all identities.
    retain_limit: usize,
}

impl<C> PoolShared<C> {
    fn idle_count(&self) -> usize {
        self.idle.lock().values().map(VecDeque::len).sum()
    }
}

pub struct ConnectionPool<F: ConnectionFactory> {
    factory: F,
    shared: Arc<PoolShared<F::Conn>>,
    permits: Arc<Semaphore>,
    config: PoolConfig,
}

impl<F: ConnectionFactory> ConnectionPool<F> {
    pub fn new(factory: F, config: PoolConfig) -> Self {
        Self {
            factory,
            shared: Arc::new(PoolShared {
                idle: Mutex::new(HashMap::new()),
                recycle_interval: config.recycle_interval,
                retain_limit: config.size,
            }),
            permits: Arc::new(Semaphore::new(config.capacity())),
            config,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Check out a connection authenticated for the credential's
    /// identity. Idle connections past the recycle interval are
    /// discarded and replaced; a fresh connection is opened when no
    /// usable idle one exists.
    pub async fn acquire(&self, credential: &Credential) -> Result<PooledConn<F>, GatewayError> {
        let permit = tokio::time::timeout(
            self.config.checkout_timeout,
            Arc::clone(&self.permits).acquire_owned(),
        )
        .await
        .map_err(|_| GatewayError::PoolExhausted(self.config.checkout_timeout))?
        .expect("pool semaphore closed");

        let key = credential.identity().key();

        loop {
            let candidate = {
                let mut idle = self.shared.idle.lock();
                idle.get_mut(&key).and_then(VecDeque::pop_front)
            };

            match candidate {
                Some(entry) if entry.created_at.elapsed() < self.config.recycle_interval => {
                    return Ok(PooledConn {
                        conn: Some(entry.conn),
                        created_at: entry.created_at,
                        epoch: entry.epoch,
                        key,
                        shared: Arc::clone(&self.shared),
                        _permit: permit,
                    });
                }
                Some(entry) => {
                    debug!(
                        "[Pool] Recycling connection for {} (age {:?})",
                        key,
                        entry.created_at.elapsed()
                    );
                    drop(entry.conn);
                }
                None => break,
            }
        }

        let conn = self.factory.connect(credential).await?;
        Ok(PooledConn {
            conn: Some(conn),
            created_at: Instant::now(),
            epoch: credential.epoch(),
            key,
            shared: Arc::clone(&self.shared),
            _permit: permit,
        })
    }

    /// Run a query future under the per-command timeout. Timeout is
    /// independent of pool checkout.
    pub async fn run_query<T, E, Fut>(&self, query: Fut) -> Result<T, GatewayError>
    where
        Fut: Future<Output = Result<T, E>>,
        GatewayError: From<E>,
    {
        match tokio::time::timeout(self.config.command_timeout, query).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(GatewayError::from(e)),
            Err(_) => Err(GatewayError::QueryTimeout(self.config.command_timeout)),
        }
    }

    /// Liveness probe: check out a connection and ping it.
    pub async fn ping(&self, credential: &Credential) -> Result<(), GatewayError> {
        let mut conn = self.acquire(credential).await?;
        self.run_query(self.factory.ping(&mut conn)).await
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            size: self.config.size,
            max_overflow: self.config.max_overflow,
            idle: self.shared.idle_count(),
            available_slots: self.permits.available_permits(),
        }
    }
}

/// A checked-out connection. Derefs to the underlying connection and
/// returns it to the pool when dropped, on every exit path.
pub struct PooledConn<F: ConnectionFactory> {
    conn: Option<F::Conn>,
    created_at: Instant,
    epoch: u64,
    key: String,
    shared: Arc<PoolShared<F::Conn>>,
    _permit: OwnedSemaphorePermit,
}

impl<F: ConnectionFactory> PooledConn<F> {
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Epoch of the credential this connection authenticated with.
    pub fn credential_epoch(&self) -> u64 {
        self.epoch
    }

    /// Drop the connection instead of returning it to the pool. Used
    /// after errors that leave the connection in an unknown state.
    pub fn discard(mut self) {
        if self.conn.take().is_some() {
            debug!("[Pool] Discarding connection for {}", self.key);
        }
    }
}

impl<F: ConnectionFactory> fmt::Debug for PooledConn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConn")
            .field("key", &self.key)
            .field("epoch", &self.epoch)
            .field("age", &self.age())
            .finish_non_exhaustive()
    }
}

impl<F: ConnectionFactory> Deref for PooledConn<F> {
    type Target = F::Conn;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("connection already taken")
    }
}

impl<F: ConnectionFactory> DerefMut for PooledConn<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("connection already taken")
    }
}

impl<F: ConnectionFactory> Drop for PooledConn<F> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            let age = self.created_at.elapsed();
            if age >= self.shared.recycle_interval {
                debug!("[Pool] Dropping aged-out connection for {} ({:?})", self.key, age);
                return;
            }
            let mut idle = self.shared.idle.lock();
            let total: usize = idle.values().map(VecDeque::len).sum();
            if total >= self.shared.retain_limit {
                // Overflow connection: close instead of pooling.
                return;
            }
            idle.entry(self.key.clone()).or_default().push_back(IdleConn {
                conn,
                created_at: self.created_at,
                epoch: self.epoch,
            });
        }
        // The permit is released after this body, waking any waiter.
    }
}
