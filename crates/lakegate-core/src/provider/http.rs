//! HTTP client for the vendor control plane.
//!
//! Speaks JSON to the provider's instance and credential endpoints.
//! The wire format of the vendor's own authentication protocol is not
//! our concern; we send a bearer token and map responses.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::domain::{Identity, ProviderResourceState, ResourceHandle, ResourceSpec};
use crate::error::GatewayError;

use super::{MintedToken, ResourceProvider, TokenSource};

/// Connection settings for the provider API.
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    pub base_url: Url,
    pub api_token: String,
    /// Instance the minted credentials are scoped to.
    pub instance_name: String,
    /// Network timeout for control-plane calls.
    pub request_timeout: Duration,
}

pub struct HttpProviderClient {
    http: reqwest::Client,
    base_url: Url,
    api_token: Zeroizing<String>,
    instance_name: String,
}

#[derive(Serialize)]
struct MintRequest<'a> {
    request_id: String,
    instance_names: Vec<&'a str>,
    identity: String,
}

#[derive(Deserialize)]
struct MintResponse {
    token: String,
    /// Seconds until the token expires, if the provider reports it.
    expires_in: Option<u64>,
}

#[derive(Serialize)]
struct CreateInstanceRequest<'a> {
    name: &'a str,
    capacity: &'a str,
    node_count: u32,
    retention_window_in_days: u32,
}

#[derive(Deserialize)]
struct InstanceResponse {
    name: String,
    state: String,
}

impl HttpProviderClient {
    pub fn new(config: HttpProviderConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::Provider(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url,
            api_token: Zeroizing::new(config.api_token),
            instance_name: config.instance_name,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::Provider(format!("invalid endpoint {}: {}", path, e)))
    }

    fn map_state(state: &str) -> ProviderResourceState {
        match state {
            "AVAILABLE" => ProviderResourceState::Available,
            "PROVISIONING" | "STARTING" | "UPDATING" => ProviderResourceState::Provisioning,
            "DELETING" | "STOPPING" => ProviderResourceState::Deleting,
            _ => ProviderResourceState::Failed,
        }
    }
}

#[async_trait]
impl TokenSource for HttpProviderClient {
    async fn mint_token(&self, identity: &Identity) -> Result<MintedToken, GatewayError> {
        let url = self.endpoint("api/v1/credentials")?;
        let request = MintRequest {
            request_id: Uuid::new_v4().to_string(),
            instance_names: vec![self.instance_name.as_str()],
            identity: identity.to_string(),
        };

        let response = self
            .http
            .post(url)
            .bearer_auth(self.api_token.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::CredentialMintFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::CredentialMintFailed(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let body: MintResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::CredentialMintFailed(e.to_string()))?;

        debug!("[Provider] Minted credential for identity {}", identity);

        Ok(MintedToken::new(
            body.token,
            body.expires_in.map(Duration::from_secs),
        ))
    }
}

#[async_trait]
impl ResourceProvider for HttpProviderClient {
    async fn create_resource(&self, spec: &ResourceSpec) -> Result<ResourceHandle, GatewayError> {
        let url = self.endpoint("api/v1/instances")?;
        let request = CreateInstanceRequest {
            name: &spec.instance_name,
            capacity: &spec.capacity,
            node_count: spec.node_count,
            retention_window_in_days: spec.retention_window_in_days,
        };

        let response = self
            .http
            .post(url)
            .bearer_auth(self.api_token.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(GatewayError::Provider(format!(
                "instance creation returned {}",
                response.status()
            )));
        }

        let body: InstanceResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Provider(e.to_string()))?;

        debug!("[Provider] Instance creation accepted: {}", body.name);
        Ok(ResourceHandle(body.name))
    }

    async fn delete_resource(&self, handle: &ResourceHandle) -> Result<(), GatewayError> {
        let url = self.endpoint(&format!("api/v1/instances/{}", handle.as_str()))?;

        let response = self
            .http
            .delete(url)
            .bearer_auth(self.api_token.as_str())
            .send()
            .await
            .map_err(|e| GatewayError::Provider(e.to_string()))?;

        // Deleting something already gone is a success for our purposes.
        if response.status() == reqwest::StatusCode::NOT_FOUND || response.status().is_success() {
            debug!("[Provider] Instance deletion accepted: {}", handle);
            return Ok(());
        }

        Err(GatewayError::Provider(format!(
            "instance deletion returned {}",
            response.status()
        )))
    }

    async fn resource_status(
        &self,
        handle: &ResourceHandle,
    ) -> Result<ProviderResourceState, GatewayError> {
        let url = self.endpoint(&format!("api/v1/instances/{}", handle.as_str()))?;

        let response = self
            .http
            .get(url)
            .bearer_auth(self.api_token.as_str())
            .send()
            .await
            .map_err(|e| GatewayError::Provider(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(ProviderResourceState::NotFound);
        }

        if !response.status().is_success() {
            return Err(GatewayError::Provider(format!(
                "status query returned {}",
                response.status()
            )));
        }

        let body: InstanceResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Provider(e.to_string()))?;

        Ok(Self::map_state(&body.state))
    }
}
