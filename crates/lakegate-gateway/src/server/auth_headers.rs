//! Forwarded identity extraction for per-user authentication mode.
//!
//! The upstream gateway supplies three headers with the user's access
//! token, email, and identifier. The token is mandatory; the user id
//! falls back to the email when absent.

use axum::http::HeaderMap;

use lakegate_core::GatewayError;

pub const HEADER_FORWARDED_TOKEN: &str = "x-forwarded-access-token";
pub const HEADER_FORWARDED_EMAIL: &str = "x-forwarded-email";
pub const HEADER_FORWARDED_USER: &str = "x-forwarded-user";

#[derive(Debug, Clone)]
pub struct ForwardedIdentity {
    pub user_id: String,
    pub email: String,
    pub access_token: String,
}

pub fn extract_forwarded_identity(headers: &HeaderMap) -> Result<ForwardedIdentity, GatewayError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let access_token = header(HEADER_FORWARDED_TOKEN).ok_or(GatewayError::MissingAuthHeaders)?;
    let email = header(HEADER_FORWARDED_EMAIL).ok_or(GatewayError::MissingAuthHeaders)?;
    let user_id = header(HEADER_FORWARDED_USER).unwrap_or_else(|| email.clone());

    Ok(ForwardedIdentity {
        user_id,
        email,
        access_token,
    })
}
