//! `POST /sessions` and `POST /sessions/validate`.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use platform_common::TenantScope;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use store::model::SessionKind;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::Shared;

#[derive(Debug, Deserialize)]
pub struct IssueSessionRequest {
    pub kind: String,
    pub subject: String,
    #[serde(default)]
    pub claims: HashMap<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct IssueSessionResponse {
    pub token: String,
}

fn parse_kind(raw: &str) -> Result<SessionKind, ApiError> {
    match raw {
        "browser" => Ok(SessionKind::Browser),
        "service" => Ok(SessionKind::Service),
        other => Err(ApiError::new(
            platform_common::ErrorKind::Validation,
            format!("unknown session kind '{other}', expected browser|service"),
        )),
    }
}

pub async fn issue(
    State(state): State<Shared>,
    Path((tenant_id, realm_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<IssueSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = TenantScope::new(tenant_id, realm_id);
    let kind = parse_kind(&req.kind)?;
    let token = state
        .sessions
        .issue(scope, kind, &req.subject, req.claims, tokio_util::sync::CancellationToken::new())
        .await?;
    Ok((StatusCode::CREATED, Json(IssueSessionResponse { token })))
}

#[derive(Debug, Deserialize)]
pub struct ValidateSessionRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateSessionResponse {
    pub subject: String,
    pub kind: String,
    pub tenant_id: Uuid,
    pub realm_id: Uuid,
    pub expires_at: i64,
}

pub async fn validate(
    State(state): State<Shared>,
    Json(req): Json<ValidateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = state.sessions.validate(&req.token).await?;
    let scope = claims.scope();
    Ok(Json(ValidateSessionResponse {
        subject: claims.sub,
        kind: match claims.kind {
            SessionKind::Browser => "browser".to_string(),
            SessionKind::Service => "service".to_string(),
        },
        tenant_id: scope.tenant_id,
        realm_id: scope.realm_id,
        expires_at: claims.exp,
    }))
}
