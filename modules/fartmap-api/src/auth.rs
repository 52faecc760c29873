use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Caller presented the shared API secret.
pub struct ApiKey;

/// Caller presented the admin secret. Checked on its own; handlers that
/// need both extract both.
pub struct AdminKey;

impl FromRequestParts<Arc<AppState>> for ApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if header_matches(&parts.headers, API_KEY_HEADER, &state.api_secret) {
            Ok(ApiKey)
        } else {
            warn!(path = %parts.uri.path(), "Rejected request without valid API key");
            Err(ApiError::Unauthorized)
        }
    }
}

impl FromRequestParts<Arc<AppState>> for AdminKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if header_matches(&parts.headers, ADMIN_KEY_HEADER, &state.admin_key) {
            Ok(AdminKey)
        } else {
            warn!(path = %parts.uri.path(), "Rejected admin request without valid admin key");
            Err(ApiError::Unauthorized)
        }
    }
}

fn header_matches(headers: &HeaderMap, name: &str, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| constant_time_eq(v.as_bytes(), expected.as_bytes()))
}

/// Constant-time comparison to prevent timing attacks.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
