//! Credential management.
//!
//! Two trust models: a single app-level service credential kept fresh
//! by a background task, and a per-user cache of forwarded credentials
//! with a bounded TTL.

mod service;
mod user_cache;

pub use service::ServiceCredentialManager;
pub use user_cache::{UserCredentialCache, UserCredentialEntry};
