//! Bearer-session auth, grounded on `citadel-api::auth_middleware` — the
//! same `Authorization: Bearer <token>` extraction and per-request scope
//! check, validated here through [`sessions::SessionManager::validate`]
//! instead of a static API-key table.

use axum::http::HeaderMap;
use platform_common::{ErrorKind, TenantScope};
use sessions::Claims;

use crate::error::ApiError;
use crate::state::Shared;

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthorized("missing or malformed Authorization header"))
}

/// Validate the bearer session token and require its scope to match
/// `expected` (the tenant/realm path segment the request targets).
pub async fn require_scope(state: &Shared, headers: &HeaderMap, expected: TenantScope) -> Result<Claims, ApiError> {
    let token = bearer_token(headers)?;
    let claims = state.sessions.validate(token).await?;
    if claims.scope() != expected {
        return Err(ApiError::new(
            ErrorKind::Unauthorized,
            "session does not authorize this tenant/realm",
        ));
    }
    Ok(claims)
}
