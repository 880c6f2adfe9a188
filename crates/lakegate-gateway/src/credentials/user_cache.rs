//! Per-user credential cache.
//!
//! Used only in per-user authentication mode. Entries wrap the token
//! forwarded by the upstream gateway at cache time; they are not
//! re-derived per request. Expiry is checked lazily on lookup, with an
//! optional periodic sweep to reclaim memory for long-idle users, and a
//! hard entry cap so user cardinality cannot grow the map unbounded.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use lakegate_core::{Credential, Identity};

#[derive(Clone)]
pub struct UserCredentialEntry {
    pub user_id: String,
    pub email: String,
    pub credential: Arc<Credential>,
    pub cached_at: Instant,
}

impl UserCredentialEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() >= ttl
    }
}

pub struct UserCredentialCache {
    entries: DashMap<String, UserCredentialEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl UserCredentialCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries,
        }
    }

    /// Return the live cached credential for `user_id`, or build a new
    /// entry from the forwarded token. Two calls within the TTL return
    /// the identical credential; a call after expiry replaces the entry.
    ///
    /// `epoch` is the service manager's current epoch, recorded so
    /// pooled connections opened with this credential carry a
    /// comparable authentication epoch.
    pub fn get_or_insert(
        &self,
        user_id: &str,
        forwarded_token: &str,
        email: &str,
        epoch: u64,
    ) -> Arc<Credential> {
        if let Some(entry) = self.entries.get(user_id) {
            if !entry.is_expired(self.ttl) {
                debug!("[UserCache] Cache hit for user {}", user_id);
                return entry.credential.clone();
            }
            debug!("[UserCache] Entry expired for user {}", user_id);
        }

        if !self.entries.contains_key(user_id) && self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }

        let credential = Arc::new(Credential::new(
            forwarded_token,
            Identity::User {
                id: user_id.to_string(),
                email: email.to_string(),
            },
            epoch,
        ));

        let entry = UserCredentialEntry {
            user_id: user_id.to_string(),
            email: email.to_string(),
            credential: credential.clone(),
            cached_at: Instant::now(),
        };

        info!("[UserCache] Cached credentials for user {}", user_id);
        self.entries.insert(user_id.to_string(), entry);
        credential
    }

    /// Drop all expired entries. O(n), invoked off the request path.
    pub fn sweep(&self) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(self.ttl));
        let removed = before - self.entries.len();
        if removed > 0 {
            info!("[UserCache] Sweep removed {} expired entries", removed);
        }
    }

    pub fn remove(&self, user_id: &str) -> bool {
        self.entries.remove(user_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.cached_at)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            debug!("[UserCache] Evicting oldest entry (user {})", key);
            self.entries.remove(&key);
        }
    }

    /// Optional background sweep so long-idle users do not pin memory
    /// until their next request.
    pub fn spawn_sweep_task(
        self: &Arc<Self>,
        every: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => cache.sweep(),
                }
            }
        })
    }
}
