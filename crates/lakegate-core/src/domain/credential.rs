//! Credential entity - short-lived database access tokens.
//!
//! The secret value is held in zeroizing memory, never serialized, and
//! redacted from Debug output. Ages are measured with `tokio::time::Instant`
//! so expiry behavior is drivable from paused-time tests.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use zeroize::Zeroizing;

/// The identity a credential was minted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// The shared application-level service identity.
    Service,
    /// A per-request user identity forwarded by the upstream gateway.
    User { id: String, email: String },
}

impl Identity {
    /// Stable key used to partition pooled connections by identity.
    pub fn key(&self) -> String {
        match self {
            Identity::Service => "service".to_string(),
            Identity::User { id, .. } => format!("user:{}", id),
        }
    }

    /// Database login name for this identity, given the configured
    /// service username.
    pub fn db_username<'a>(&'a self, service_user: &'a str) -> &'a str {
        match self {
            Identity::Service => service_user,
            Identity::User { email, .. } => email,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Service => write!(f, "service"),
            Identity::User { id, .. } => write!(f, "user:{}", id),
        }
    }
}

/// A time-limited database credential.
///
/// Owned by the component that minted it (service manager or user cache)
/// and shared with the pool behind an `Arc`. Replaced whole on refresh,
/// never mutated in place.
#[derive(Clone)]
pub struct Credential {
    secret: Zeroizing<String>,
    issued_at: Instant,
    identity: Identity,
    epoch: u64,
}

impl Credential {
    pub fn new(secret: impl Into<String>, identity: Identity, epoch: u64) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
            issued_at: Instant::now(),
            identity,
            epoch,
        }
    }

    /// The opaque token value. Callers must not log or serialize this.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    /// Epoch of the credential cell at mint time. Monotone across
    /// successful refreshes.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn age(&self) -> Duration {
        self.issued_at.elapsed()
    }

    /// Whether the credential is still inside the given lifetime window.
    pub fn is_within(&self, lifetime: Duration) -> bool {
        self.age() < lifetime
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &"[REDACTED]")
            .field("identity", &self.identity)
            .field("epoch", &self.epoch)
            .field("age", &self.age())
            .finish()
    }
}
