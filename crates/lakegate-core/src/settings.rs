//! Environment-backed application settings.
//!
//! Every knob has a default; only the provider endpoint and instance
//! name are required. Invariants that would silently break credential
//! rotation (safety margin >= lifetime, cache TTL >= lifetime) are
//! rejected at load time.

use std::time::Duration;

use url::Url;

use crate::error::GatewayError;

#[derive(Debug, Clone)]
pub struct Settings {
    /// HTTP bind address.
    pub host: String,
    pub port: u16,

    // Connection pool
    pub pool_size: usize,
    pub max_overflow: usize,
    pub checkout_timeout: Duration,
    pub command_timeout: Duration,
    pub recycle_interval: Duration,

    // Credentials
    pub credential_lifetime: Duration,
    pub refresh_safety_margin: Duration,
    pub user_cache_ttl: Duration,
    pub user_cache_max_entries: usize,
    pub user_based_authentication: bool,

    // Managed resource + database
    pub instance_name: String,
    pub database_name: String,
    pub database_host: String,
    pub database_port: u16,
    pub database_user: String,
    pub orders_schema: String,
    pub orders_table: String,

    // Provider control plane
    pub provider_base_url: Url,
    pub provider_api_token: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// The scheduled refresh period: lifetime minus the safety margin.
    pub fn refresh_period(&self) -> Duration {
        self.credential_lifetime - self.refresh_safety_margin
    }

    /// Schema-qualified orders table for query building.
    pub fn orders_relation(&self) -> String {
        format!("{}.{}", self.orders_schema, self.orders_table)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GatewayError> {
        let settings = Self {
            host: string(&lookup, "LAKEGATE_HOST", "0.0.0.0"),
            port: parse(&lookup, "LAKEGATE_PORT", 8000)?,
            pool_size: parse(&lookup, "DB_POOL_SIZE", 5)?,
            max_overflow: parse(&lookup, "DB_MAX_OVERFLOW", 10)?,
            checkout_timeout: seconds(&lookup, "DB_POOL_TIMEOUT", 30)?,
            command_timeout: seconds(&lookup, "DB_COMMAND_TIMEOUT", 10)?,
            recycle_interval: seconds(&lookup, "DB_POOL_RECYCLE_INTERVAL", 3600)?,
            credential_lifetime: seconds(&lookup, "CREDENTIAL_LIFETIME", 3600)?,
            refresh_safety_margin: seconds(&lookup, "REFRESH_SAFETY_MARGIN", 600)?,
            user_cache_ttl: seconds(&lookup, "USER_CACHE_TTL", 2700)?,
            user_cache_max_entries: parse(&lookup, "USER_CACHE_MAX_ENTRIES", 1000)?,
            user_based_authentication: string(&lookup, "USER_BASED_AUTHENTICATION", "false")
                .eq_ignore_ascii_case("true"),
            instance_name: required(&lookup, "LAKEGATE_INSTANCE_NAME")?,
            database_name: string(&lookup, "LAKEGATE_DATABASE_NAME", "demo_database"),
            database_host: string(&lookup, "DATABASE_HOST", "localhost"),
            database_port: parse(&lookup, "DATABASE_PORT", 5432)?,
            database_user: string(&lookup, "DATABASE_USER", "lakegate"),
            orders_schema: string(&lookup, "DEFAULT_POSTGRES_SCHEMA", "public"),
            orders_table: string(&lookup, "DEFAULT_POSTGRES_TABLE", "orders_synced"),
            provider_base_url: required(&lookup, "PROVIDER_BASE_URL")?
                .parse()
                .map_err(|e| GatewayError::Settings(format!("PROVIDER_BASE_URL: {}", e)))?,
            provider_api_token: required(&lookup, "PROVIDER_API_TOKEN")?,
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), GatewayError> {
        if self.refresh_safety_margin >= self.credential_lifetime {
            return Err(GatewayError::Settings(format!(
                "REFRESH_SAFETY_MARGIN ({:?}) must be shorter than CREDENTIAL_LIFETIME ({:?})",
                self.refresh_safety_margin, self.credential_lifetime
            )));
        }
        if self.user_cache_ttl >= self.credential_lifetime {
            return Err(GatewayError::Settings(format!(
                "USER_CACHE_TTL ({:?}) must be shorter than CREDENTIAL_LIFETIME ({:?})",
                self.user_cache_ttl, self.credential_lifetime
            )));
        }
        if self.pool_size == 0 {
            return Err(GatewayError::Settings(
                "DB_POOL_SIZE must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn string(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<String, GatewayError> {
    lookup(key).ok_or_else(|| GatewayError::Settings(format!("{} is required", key)))
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, GatewayError>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| GatewayError::Settings(format!("{}: {}", key, e))),
        None => Ok(default),
    }
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration, GatewayError> {
    parse(lookup, key, default).map(Duration::from_secs)
}
