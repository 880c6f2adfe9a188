//! Managed resource entity - the externally provisioned database
//! instance and its lifecycle state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of the managed database resource.
///
/// Transitions are driven by explicit create/delete requests and by
/// polling the provider; see the lifecycle controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Absent,
    Creating,
    Ready,
    Deleting,
    Failed,
}

impl ResourceState {
    /// States with an in-flight provider operation worth polling.
    pub fn is_transitional(&self) -> bool {
        matches!(self, ResourceState::Creating | ResourceState::Deleting)
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceState::Absent => "absent",
            ResourceState::Creating => "creating",
            ResourceState::Ready => "ready",
            ResourceState::Deleting => "deleting",
            ResourceState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Opaque handle to a provisioned resource, as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandle(pub String);

impl ResourceHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provisioning request parameters for the managed instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub instance_name: String,
    pub capacity: String,
    pub node_count: u32,
    pub retention_window_in_days: u32,
}

impl ResourceSpec {
    pub fn new(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            capacity: "CU_1".to_string(),
            node_count: 1,
            retention_window_in_days: 7,
        }
    }
}

/// Resource state as reported by the vendor control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderResourceState {
    Provisioning,
    Available,
    Deleting,
    Failed,
    NotFound,
}

/// A managed resource and its last observed transition.
#[derive(Debug, Clone)]
pub struct ManagedResource {
    pub handle: Option<ResourceHandle>,
    pub state: ResourceState,
    pub last_transition_at: DateTime<Utc>,
}

impl ManagedResource {
    pub fn absent() -> Self {
        Self {
            handle: None,
            state: ResourceState::Absent,
            last_transition_at: Utc::now(),
        }
    }

    /// Record a transition to a new state, keeping the timestamp honest.
    pub fn transition_to(&mut self, state: ResourceState) {
        if self.state != state {
            self.state = state;
            self.last_transition_at = Utc::now();
        }
    }
}
