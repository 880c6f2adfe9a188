//! # Lakegate Core Library
//!
//! Domain types and seams for the Lakegate gateway.
//!
//! ## Modules
//!
//! - `domain` - Core entities (Credential, ManagedResource, Order)
//! - `error` - Gateway error taxonomy
//! - `provider` - Vendor control-plane traits and HTTP client
//! - `settings` - Environment-backed configuration

pub mod domain;
pub mod error;
pub mod provider;
pub mod settings;

// Re-export commonly used types
pub use domain::*;
pub use error::GatewayError;
pub use provider::{
    HttpProviderClient, HttpProviderConfig, MintedToken, ResourceProvider, TokenSource,
};
pub use settings::Settings;
