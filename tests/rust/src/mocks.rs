//! In-memory fakes for the provider seams and the connection factory.
//!
//! Fast, deterministic stand-ins so pool, credential, and lifecycle
//! logic can be exercised without a vendor API or a live database.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use lakegate_core::{
    Credential, GatewayError, Identity, MintedToken, ProviderResourceState, ResourceHandle,
    ResourceProvider, ResourceSpec, TokenSource,
};
use lakegate_gateway::ConnectionFactory;

/// Token source minting sequentially numbered tokens. Flip `fail` to
/// simulate a control-plane outage.
#[derive(Default)]
pub struct FakeTokenSource {
    counter: AtomicU64,
    pub fail: AtomicBool,
}

impl FakeTokenSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn mint_count(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl TokenSource for FakeTokenSource {
    async fn mint_token(&self, identity: &Identity) -> Result<MintedToken, GatewayError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::CredentialMintFailed(
                "simulated mint outage".to_string(),
            ));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MintedToken::new(
            format!("token-{}-{}", identity.key(), n),
            None,
        ))
    }
}

/// Scriptable resource provider. Tests set the reported status and
/// inspect how many create/delete calls actually reached the provider.
pub struct FakeResourceProvider {
    status: Mutex<ProviderResourceState>,
    last_spec: Mutex<Option<ResourceSpec>>,
    pub create_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub fail_create: AtomicBool,
    pub fail_status: AtomicBool,
}

impl FakeResourceProvider {
    pub fn new(status: ProviderResourceState) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(status),
            last_spec: Mutex::new(None),
            create_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            fail_create: AtomicBool::new(false),
            fail_status: AtomicBool::new(false),
        })
    }

    pub fn set_status(&self, status: ProviderResourceState) {
        *self.status.lock() = status;
    }

    pub fn create_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn last_spec(&self) -> Option<ResourceSpec> {
        self.last_spec.lock().clone()
    }
}

#[async_trait]
impl ResourceProvider for FakeResourceProvider {
    async fn create_resource(&self, spec: &ResourceSpec) -> Result<ResourceHandle, GatewayError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(GatewayError::ResourceProvisioningFailed(
                "simulated create failure".to_string(),
            ));
        }
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_spec.lock() = Some(spec.clone());
        *self.status.lock() = ProviderResourceState::Provisioning;
        Ok(ResourceHandle(spec.instance_name.clone()))
    }

    async fn delete_resource(&self, _handle: &ResourceHandle) -> Result<(), GatewayError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        *self.status.lock() = ProviderResourceState::Deleting;
        Ok(())
    }

    async fn resource_status(
        &self,
        _handle: &ResourceHandle,
    ) -> Result<ProviderResourceState, GatewayError> {
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(GatewayError::Provider("simulated status outage".to_string()));
        }
        Ok(*self.status.lock())
    }
}

/// A connection handle recording which credential opened it.
#[derive(Debug)]
pub struct FakeConn {
    pub id: usize,
    pub identity_key: String,
    pub epoch: u64,
}

/// Connection factory counting every open. Flip `reject_auth` to make
/// the next connect fail like a server-side credential rejection.
#[derive(Default)]
pub struct FakeConnectionFactory {
    counter: AtomicUsize,
    pub reject_auth: AtomicBool,
}

impl FakeConnectionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect_count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionFactory for FakeConnectionFactory {
    type Conn = FakeConn;

    async fn connect(&self, credential: &Credential) -> Result<FakeConn, GatewayError> {
        if self.reject_auth.load(Ordering::SeqCst) {
            return Err(GatewayError::AuthenticationFailed(
                "simulated credential rejection".to_string(),
            ));
        }
        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(FakeConn {
            id,
            identity_key: credential.identity().key(),
            epoch: credential.epoch(),
        })
    }

    async fn ping(&self, _conn: &mut FakeConn) -> Result<(), GatewayError> {
        Ok(())
    }
}
