//! Service credential manager.
//!
//! Holds the single app-level credential in an atomically swappable
//! cell. A background task refreshes it on a fixed period strictly
//! shorter than the credential's lifetime; readers never block on
//! network I/O and never observe a partially written credential.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use lakegate_core::{Credential, GatewayError, Identity, TokenSource};

pub struct ServiceCredentialManager {
    source: Arc<dyn TokenSource>,
    /// Replaced whole on refresh. Readers clone the Arc under a read
    /// lock held only for the pointer copy.
    cell: RwLock<Arc<Credential>>,
    epoch: AtomicU64,
    lifetime: Duration,
}

impl ServiceCredentialManager {
    /// Mint the initial credential and build the manager. Startup fails
    /// if the very first mint fails; after that, refresh failures only
    /// retain the previous credential.
    pub async fn bootstrap(
        source: Arc<dyn TokenSource>,
        lifetime: Duration,
    ) -> Result<Arc<Self>, GatewayError> {
        let minted = source.mint_token(&Identity::Service).await?;
        let credential = Arc::new(Credential::new(
            minted.token.to_string(),
            Identity::Service,
            1,
        ));

        info!("[CredentialManager] Initial service credential minted");

        Ok(Arc::new(Self {
            source,
            cell: RwLock::new(credential),
            epoch: AtomicU64::new(1),
            lifetime,
        }))
    }

    /// The last successfully minted credential. Never performs I/O.
    pub fn current(&self) -> Arc<Credential> {
        self.cell.read().clone()
    }

    /// Monotone counter, bumped once per successful swap.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Whether the retained credential is still inside its lifetime.
    /// False means repeated mint failures have outlived the token and
    /// connection authentication is expected to fail.
    pub fn is_within_valid_window(&self) -> bool {
        self.current().is_within(self.lifetime)
    }

    /// Mint a fresh credential and swap it in. On failure the previous
    /// credential stays current and the error is returned to the caller
    /// (the background task logs and retries next tick).
    pub async fn refresh(&self) -> Result<(), GatewayError> {
        let minted = self.source.mint_token(&Identity::Service).await?;

        // Bump and swap under the write lock: the cell never holds a
        // credential whose epoch lags `epoch()`, even if refreshes
        // overlap.
        let epoch = {
            let mut cell = self.cell.write();
            let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
            *cell = Arc::new(Credential::new(
                minted.token.to_string(),
                Identity::Service,
                epoch,
            ));
            epoch
        };

        info!("[CredentialManager] Service credential refreshed (epoch {})", epoch);
        Ok(())
    }

    /// Spawn the long-lived refresh task. Runs until cancelled; a
    /// failed refresh never aborts the task or the process.
    pub fn spawn_refresh_task(
        self: &Arc<Self>,
        period: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            info!(
                "[CredentialManager] Refresh task started (period {:?})",
                period
            );

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("[CredentialManager] Refresh task stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = manager.refresh().await {
                            error!(
                                "[CredentialManager] Scheduled refresh failed, retaining previous credential: {}",
                                e
                            );
                        }
                    }
                }
            }
        })
    }
}
