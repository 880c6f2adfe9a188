//! Capability-gated route registration.
//!
//! Endpoint groups that depend on the managed resource are mounted only
//! when a startup-time probe says the resource is ready. Requests to an
//! unmounted group terminate in the transport's generic 404.

use std::sync::Arc;

use async_trait::async_trait;

use lakegate_core::ResourceState;

use crate::lifecycle::LifecycleController;

/// A yes/no availability check for one capability group.
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    async fn probe(&self) -> bool;
}

/// Probe backed by the lifecycle controller: the capability is live
/// when the managed resource is `Ready`.
pub struct ReadyProbe {
    lifecycle: Arc<LifecycleController>,
}

impl ReadyProbe {
    pub fn new(lifecycle: Arc<LifecycleController>) -> Self {
        Self { lifecycle }
    }
}

#[async_trait]
impl CapabilityProbe for ReadyProbe {
    async fn probe(&self) -> bool {
        self.lifecycle.current().await.state == ResourceState::Ready
    }
}

/// Point-in-time capability evaluation, consumed when the router is
/// built. Rebuilding the router re-captures it; per-request re-probing
/// is deliberately not done.
#[derive(Debug, Clone, Copy)]
pub struct RouteCapabilitySnapshot {
    pub orders_available: bool,
}

impl RouteCapabilitySnapshot {
    pub async fn capture(probe: &dyn CapabilityProbe) -> Self {
        Self {
            orders_available: probe.probe().await,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            orders_available: false,
        }
    }
}
