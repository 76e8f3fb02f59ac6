//! Elastic key and material CRUD, per the route table in `spec.md` §6.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use jwkgen::{Algorithm, KeyUse};
use platform_common::TenantScope;
use serde::{Deserialize, Serialize};
use store::model::{ElasticKey, MaterialKey};
use store::KeystoreRepository;
use uuid::Uuid;

use super::auth::require_scope;
use crate::error::ApiError;
use crate::state::Shared;

#[derive(Debug, Deserialize)]
pub struct CreateElasticKeyRequest {
    pub algorithm: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub max_materials: u32,
    #[serde(default)]
    pub public_discovery: bool,
}

#[derive(Debug, Serialize)]
pub struct ElasticKeyResponse {
    pub id: Uuid,
    pub kid: String,
    pub algorithm: String,
    #[serde(rename = "use")]
    pub key_use: String,
    pub max_materials: u32,
    pub current_material_count: u32,
    pub public_discovery: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ElasticKey> for ElasticKeyResponse {
    fn from(row: ElasticKey) -> Self {
        Self {
            id: row.id,
            kid: row.kid,
            algorithm: row.algorithm,
            key_use: row.key_use.as_str().to_string(),
            max_materials: row.max_materials,
            current_material_count: row.current_material_count,
            public_discovery: row.public_discovery,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ElasticKeyListResponse {
    pub keys: Vec<ElasticKeyResponse>,
}

#[derive(Debug, Serialize)]
pub struct MaterialResponse {
    pub id: Uuid,
    pub material_kid: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub retired_at: Option<DateTime<Utc>>,
}

impl From<MaterialKey> for MaterialResponse {
    fn from(row: MaterialKey) -> Self {
        Self {
            id: row.id,
            material_kid: row.material_kid,
            is_active: row.is_active,
            created_at: row.created_at,
            retired_at: row.retired_at,
        }
    }
}

fn parse_key_use(raw: &str) -> Result<KeyUse, ApiError> {
    match raw {
        "sig" => Ok(KeyUse::Sig),
        "enc" => Ok(KeyUse::Enc),
        other => Err(ApiError::new(
            platform_common::ErrorKind::Validation,
            format!("unknown use '{other}', expected sig|enc"),
        )),
    }
}

fn actor(headers: &HeaderMap) -> String {
    headers
        .get("x-actor")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("api")
        .to_string()
}

pub async fn create_elastic_key(
    State(state): State<Shared>,
    Path((tenant_id, realm_id, kid)): Path<(Uuid, Uuid, String)>,
    headers: HeaderMap,
    Json(req): Json<CreateElasticKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = TenantScope::new(tenant_id, realm_id);
    require_scope(&state, &headers, scope).await?;

    let algorithm = Algorithm::parse(&req.algorithm)
        .map_err(|e| ApiError::new(platform_common::ErrorKind::Validation, e.to_string()))?;
    let key_use = parse_key_use(&req.key_use)?;
    let request_id = Uuid::new_v4().to_string();

    let row = state
        .keystore
        .create_elastic_key(
            scope,
            kid,
            algorithm,
            key_use,
            req.max_materials,
            req.public_discovery,
            &request_id,
            &actor(&headers),
            tokio_util::sync::CancellationToken::new(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ElasticKeyResponse::from(row))))
}

pub async fn get_elastic_key(
    State(state): State<Shared>,
    Path((tenant_id, realm_id, kid)): Path<(Uuid, Uuid, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let scope = TenantScope::new(tenant_id, realm_id);
    require_scope(&state, &headers, scope).await?;
    let row = state.keystore.get_elastic_key(scope, &kid).await?;
    Ok(Json(ElasticKeyResponse::from(row)))
}

pub async fn list_elastic_keys(
    State(state): State<Shared>,
    Path((tenant_id, realm_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let scope = TenantScope::new(tenant_id, realm_id);
    require_scope(&state, &headers, scope).await?;
    let rows = state.keystore.list_elastic_keys(scope).await?;
    Ok(Json(ElasticKeyListResponse {
        keys: rows.into_iter().map(ElasticKeyResponse::from).collect(),
    }))
}

pub async fn delete_elastic_key(
    State(state): State<Shared>,
    Path((tenant_id, realm_id, kid)): Path<(Uuid, Uuid, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let scope = TenantScope::new(tenant_id, realm_id);
    require_scope(&state, &headers, scope).await?;
    let request_id = Uuid::new_v4().to_string();
    state
        .keystore
        .delete_elastic_key(scope, &kid, &request_id, &actor(&headers), tokio_util::sync::CancellationToken::new())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_material(
    State(state): State<Shared>,
    Path((tenant_id, realm_id, kid)): Path<(Uuid, Uuid, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let scope = TenantScope::new(tenant_id, realm_id);
    require_scope(&state, &headers, scope).await?;
    let request_id = Uuid::new_v4().to_string();
    let row = state
        .keystore
        .create_material(scope, &kid, &request_id, &actor(&headers), tokio_util::sync::CancellationToken::new())
        .await?;
    Ok((StatusCode::CREATED, Json(MaterialResponse::from(row))))
}

pub async fn rotate_material(
    State(state): State<Shared>,
    Path((tenant_id, realm_id, kid)): Path<(Uuid, Uuid, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let scope = TenantScope::new(tenant_id, realm_id);
    require_scope(&state, &headers, scope).await?;
    let request_id = Uuid::new_v4().to_string();
    let row = state
        .keystore
        .rotate_material(scope, &kid, &request_id, &actor(&headers), tokio_util::sync::CancellationToken::new())
        .await?;
    Ok((StatusCode::CREATED, Json(MaterialResponse::from(row))))
}

pub async fn list_materials(
    State(state): State<Shared>,
    Path((tenant_id, realm_id, kid)): Path<(Uuid, Uuid, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let scope = TenantScope::new(tenant_id, realm_id);
    require_scope(&state, &headers, scope).await?;
    let row = state.keystore.get_elastic_key(scope, &kid).await?;
    let materials = state.store.list_materials(row.id).await?;
    Ok(Json(MaterialListResponse {
        materials: materials.into_iter().map(MaterialResponse::from).collect(),
    }))
}

pub async fn active_material(
    State(state): State<Shared>,
    Path((tenant_id, realm_id, kid)): Path<(Uuid, Uuid, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let scope = TenantScope::new(tenant_id, realm_id);
    require_scope(&state, &headers, scope).await?;
    let row = state.keystore.get_active_material(scope, &kid).await?;
    Ok(Json(MaterialResponse::from(row)))
}

#[derive(Debug, Serialize)]
pub struct MaterialListResponse {
    pub materials: Vec<MaterialResponse>,
}
