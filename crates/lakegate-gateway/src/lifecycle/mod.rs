//! Resource lifecycle controller.
//!
//! Drives the managed database resource through
//! `Absent -> Creating -> Ready -> Deleting -> Absent`, with `Failed`
//! terminal until an explicit re-create. Create and delete return
//! immediately with the new intermediate state; completion is observed
//! by polling the provider out-of-band. A single mutex guarantees
//! at-most-one active transition, so impatient retries collapse into
//! the in-flight operation instead of re-issuing provider calls.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use lakegate_core::{
    GatewayError, ManagedResource, ProviderResourceState, ResourceHandle, ResourceProvider,
    ResourceSpec, ResourceState,
};

pub struct LifecycleController {
    provider: Arc<dyn ResourceProvider>,
    spec: ResourceSpec,
    resource: Mutex<ManagedResource>,
}

impl LifecycleController {
    pub fn new(provider: Arc<dyn ResourceProvider>, spec: ResourceSpec) -> Self {
        Self {
            provider,
            spec,
            resource: Mutex::new(ManagedResource::absent()),
        }
    }

    /// Discover a pre-existing resource at startup. A provider error
    /// here is logged and leaves the state `Absent`; the resource can
    /// still be provisioned through the API.
    pub async fn bootstrap(&self) {
        let handle = ResourceHandle(self.spec.instance_name.clone());
        match self.provider.resource_status(&handle).await {
            Ok(status) => {
                let mut resource = self.resource.lock().await;
                let state = match status {
                    ProviderResourceState::Available => ResourceState::Ready,
                    ProviderResourceState::Provisioning => ResourceState::Creating,
                    ProviderResourceState::Deleting => ResourceState::Deleting,
                    ProviderResourceState::Failed => ResourceState::Failed,
                    ProviderResourceState::NotFound => ResourceState::Absent,
                };
                if state != ResourceState::Absent {
                    resource.handle = Some(handle);
                }
                resource.transition_to(state);
                info!("[Lifecycle] Discovered resource in state {}", state);
            }
            Err(e) => {
                warn!("[Lifecycle] Startup status probe failed: {}", e);
            }
        }
    }

    pub async fn current(&self) -> ManagedResource {
        self.resource.lock().await.clone()
    }

    /// Request creation of the managed resource. Idempotent: while
    /// `Creating` or `Ready` this is a no-op returning the current
    /// state. From `Absent` or `Failed` it issues exactly one provider
    /// call and moves to `Creating`. `overrides` replaces the default
    /// provisioning spec when creation actually proceeds.
    pub async fn request_create(
        &self,
        overrides: Option<ResourceSpec>,
    ) -> Result<ResourceState, GatewayError> {
        let mut resource = self.resource.lock().await;

        match resource.state {
            ResourceState::Creating | ResourceState::Ready => {
                info!(
                    "[Lifecycle] Create requested while {}; returning current state",
                    resource.state
                );
                Ok(resource.state)
            }
            ResourceState::Deleting => Err(GatewayError::ResourceTransitionConflict {
                from: resource.state,
                requested: "create",
            }),
            ResourceState::Absent | ResourceState::Failed => {
                let spec = overrides.unwrap_or_else(|| self.spec.clone());
                info!("[Lifecycle] Creating resource {}", spec.instance_name);
                let handle = self.provider.create_resource(&spec).await?;
                resource.handle = Some(handle);
                resource.transition_to(ResourceState::Creating);
                Ok(resource.state)
            }
        }
    }

    /// Request deletion. Requires explicit confirmation; an
    /// unconfirmed request is rejected without touching the state.
    /// Only valid from `Ready` (no-op while already `Deleting`).
    pub async fn request_delete(&self, confirm: bool) -> Result<ResourceState, GatewayError> {
        let mut resource = self.resource.lock().await;

        if !confirm {
            return Err(GatewayError::ResourceTransitionConflict {
                from: resource.state,
                requested: "delete without confirmation",
            });
        }

        match resource.state {
            ResourceState::Deleting => Ok(resource.state),
            ResourceState::Ready => {
                let handle = resource
                    .handle
                    .clone()
                    .ok_or_else(|| GatewayError::Provider("ready resource without handle".into()))?;
                info!("[Lifecycle] Deleting resource {}", handle);
                self.provider.delete_resource(&handle).await?;
                resource.transition_to(ResourceState::Deleting);
                Ok(resource.state)
            }
            _ => Err(GatewayError::ResourceTransitionConflict {
                from: resource.state,
                requested: "delete",
            }),
        }
    }

    /// Poll the provider and apply any completed transition. Stable
    /// states return immediately without a provider call.
    pub async fn poll(&self) -> Result<ResourceState, GatewayError> {
        let mut resource = self.resource.lock().await;

        if !resource.state.is_transitional() {
            return Ok(resource.state);
        }

        let handle = match &resource.handle {
            Some(handle) => handle.clone(),
            None => return Ok(resource.state),
        };

        let status = self.provider.resource_status(&handle).await?;
        let next = match (resource.state, status) {
            (ResourceState::Creating, ProviderResourceState::Available) => ResourceState::Ready,
            (ResourceState::Creating, ProviderResourceState::Failed) => ResourceState::Failed,
            (ResourceState::Deleting, ProviderResourceState::NotFound) => ResourceState::Absent,
            (ResourceState::Deleting, ProviderResourceState::Failed) => ResourceState::Failed,
            (current, _) => current,
        };

        if next != resource.state {
            info!("[Lifecycle] Resource {} -> {}", resource.state, next);
            if next == ResourceState::Absent {
                resource.handle = None;
            }
            resource.transition_to(next);
        }

        Ok(resource.state)
    }

    /// Background poller: only does work while a transition is in
    /// flight, so it is free in steady state.
    pub fn spawn_poll_task(
        self: &Arc<Self>,
        every: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let transitional = controller.current().await.state.is_transitional();
                        if transitional {
                            if let Err(e) = controller.poll().await {
                                warn!("[Lifecycle] Background poll failed: {}", e);
                            }
                        }
                    }
                }
            }
        })
    }
}
