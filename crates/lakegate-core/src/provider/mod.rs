//! Vendor control-plane seams.
//!
//! The gateway treats the vendor API as an opaque capability: mint a
//! credential for an identity, and create/delete/inspect the managed
//! database resource. Production uses [`HttpProviderClient`]; tests
//! substitute in-memory fakes.

mod http;

pub use http::{HttpProviderClient, HttpProviderConfig};

use std::time::Duration;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::domain::{Identity, ProviderResourceState, ResourceHandle, ResourceSpec};
use crate::error::GatewayError;

/// A freshly minted token and the provider's expiry hint.
pub struct MintedToken {
    pub token: Zeroizing<String>,
    pub expires_in: Option<Duration>,
}

impl MintedToken {
    pub fn new(token: impl Into<String>, expires_in: Option<Duration>) -> Self {
        Self {
            token: Zeroizing::new(token.into()),
            expires_in,
        }
    }
}

/// Mints short-lived database credentials for an identity. Stateless.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn mint_token(&self, identity: &Identity) -> Result<MintedToken, GatewayError>;
}

/// Drives the managed resource's existence at the vendor.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    async fn create_resource(&self, spec: &ResourceSpec) -> Result<ResourceHandle, GatewayError>;

    async fn delete_resource(&self, handle: &ResourceHandle) -> Result<(), GatewayError>;

    async fn resource_status(
        &self,
        handle: &ResourceHandle,
    ) -> Result<ProviderResourceState, GatewayError>;
}
