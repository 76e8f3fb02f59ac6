//! Tenant/realm bootstrap. Not named in `spec.md` §6's route table, but
//! required by its own §9 bootstrap-cycle resolution: "realm creation
//! pre-provisions the two session elastic keys... not as part of first
//! session issuance." Something has to call that creation path; this is it.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use jwkgen::{Algorithm, KeyUse};
use platform_common::TenantScope;
use sessions::{SESSION_ENC_KID, SESSION_SIG_KID};
use serde::{Deserialize, Serialize};
use store::model::{Realm, Tenant};
use store::{with_transaction, LockKey, TenantRepository};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::Shared;

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    #[serde(default)]
    pub public_discovery: bool,
}

#[derive(Debug, Serialize)]
pub struct TenantResponse {
    pub id: Uuid,
    pub name: String,
    pub public_discovery: bool,
}

pub async fn create_tenant(
    State(state): State<Shared>,
    Json(req): Json<CreateTenantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = Tenant {
        id: Uuid::new_v4(),
        name: req.name,
        public_discovery: req.public_discovery,
        created_at: Utc::now(),
    };
    let row = tenant.clone();
    with_transaction(&state.store, LockKey::Global, tokio_util::sync::CancellationToken::new(), |tx| {
        let store = &state.store;
        let row = row.clone();
        async move { store.insert_tenant(tx, row).await }
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(TenantResponse {
            id: tenant.id,
            name: tenant.name,
            public_discovery: tenant.public_discovery,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CreateRealmRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RealmResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
}

/// Create a realm and, in the same request, pre-provision its `session-sig`
/// and `session-enc` elastic keys — the bootstrap-cycle break described in
/// `spec.md` §9.
pub async fn create_realm(
    State(state): State<Shared>,
    axum::extract::Path(tenant_id): axum::extract::Path<Uuid>,
    Json(req): Json<CreateRealmRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .store
        .get_tenant(tenant_id)
        .await?
        .ok_or_else(|| ApiError::new(platform_common::ErrorKind::NotFound, format!("tenant {tenant_id} not found")))?;

    let realm = Realm {
        id: Uuid::new_v4(),
        tenant_id,
        name: req.name,
        created_at: Utc::now(),
    };
    let row = realm.clone();
    with_transaction(&state.store, LockKey::Global, tokio_util::sync::CancellationToken::new(), |tx| {
        let store = &state.store;
        let row = row.clone();
        async move { store.insert_realm(tx, row).await }
    })
    .await?;

    let scope = TenantScope::new(tenant_id, realm.id);
    let request_id = Uuid::new_v4().to_string();
    state
        .keystore
        .create_elastic_key(
            scope,
            SESSION_SIG_KID.to_string(),
            Algorithm::EcP256,
            KeyUse::Sig,
            5,
            false,
            &request_id,
            "system",
            tokio_util::sync::CancellationToken::new(),
        )
        .await?;
    state
        .keystore
        .create_elastic_key(
            scope,
            SESSION_ENC_KID.to_string(),
            Algorithm::SymmetricA256Gcm,
            KeyUse::Enc,
            5,
            false,
            &request_id,
            "system",
            tokio_util::sync::CancellationToken::new(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RealmResponse {
            id: realm.id,
            tenant_id,
            name: realm.name,
        }),
    ))
}
