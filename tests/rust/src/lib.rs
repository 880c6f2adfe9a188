//! Shared test utilities and fixtures for Lakegate integration tests.

pub mod mocks;

pub use mocks::{FakeConnectionFactory, FakeResourceProvider, FakeTokenSource};

use std::sync::Arc;
use std::time::Duration;

use lakegate_core::Settings;

/// Settings with small, test-friendly timeouts. Provider fields point
/// nowhere; tests that need provider traffic use the fakes instead.
pub fn test_settings() -> Arc<Settings> {
    Arc::new(Settings {
        host: "127.0.0.1".to_string(),
        port: 0,
        pool_size: 5,
        max_overflow: 10,
        checkout_timeout: Duration::from_secs(30),
        command_timeout: Duration::from_secs(10),
        recycle_interval: Duration::from_secs(3600),
        credential_lifetime: Duration::from_secs(3600),
        refresh_safety_margin: Duration::from_secs(600),
        user_cache_ttl: Duration::from_secs(2700),
        user_cache_max_entries: 1000,
        user_based_authentication: false,
        instance_name: "test-instance".to_string(),
        database_name: "demo_database".to_string(),
        database_host: "localhost".to_string(),
        database_port: 5432,
        database_user: "lakegate".to_string(),
        orders_schema: "public".to_string(),
        orders_table: "orders_synced".to_string(),
        provider_base_url: "http://localhost:1/".parse().expect("static url"),
        provider_api_token: "test-token".to_string(),
    })
}
