//! `GET /.well-known/jwks.json`: public for tenants flagged
//! `public_discovery`, session-gated otherwise.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use platform_common::{ErrorKind, TenantScope};
use store::TenantRepository;
use uuid::Uuid;

use super::auth::require_scope;
use crate::error::ApiError;
use crate::state::Shared;

pub async fn jwks(
    State(state): State<Shared>,
    Path((tenant_id, realm_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let scope = TenantScope::new(tenant_id, realm_id);
    let tenant = state
        .store
        .get_tenant(tenant_id)
        .await?
        .ok_or_else(|| ApiError::new(ErrorKind::NotFound, format!("tenant {tenant_id} not found")))?;

    if !tenant.public_discovery {
        require_scope(&state, &headers, scope).await?;
    }

    let jwks = state.keystore.jwks(scope).await?;
    Ok(Json(jwks))
}
