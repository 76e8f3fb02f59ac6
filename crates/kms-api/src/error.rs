//! `ApiError`: the single place `ErrorKind` becomes an HTTP response, per
//! `spec.md` §7 — 4xx bodies carry `{error, message}`, 5xx bodies carry only
//! a request id, mirroring the teacher's `TokenError::is_retryable`/
//! `From<TokenError> for Status` split but targeting `axum::Response`
//! instead of `tonic::Status`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use platform_common::ErrorKind;
use serde::Serialize;
use uuid::Uuid;

/// An error ready to be turned into an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    request_id: Uuid,
}

#[derive(Serialize)]
struct ClientErrorBody {
    error: ErrorKind,
    message: String,
}

#[derive(Serialize)]
struct ServerErrorBody {
    request_id: Uuid,
}

impl ApiError {
    /// Build an error from an explicit kind and message, outside the
    /// `From` impls below — used for request-shape errors no component
    /// error enum covers (missing auth header, path/scope mismatch).
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            request_id: Uuid::new_v4(),
        }
    }

    /// A missing or malformed `Authorization` header.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(
                request_id = %self.request_id,
                kind = ?self.kind,
                message = %self.message,
                "request failed"
            );
            (status, Json(ServerErrorBody { request_id: self.request_id })).into_response()
        } else {
            (status, Json(ClientErrorBody { error: self.kind, message: self.message })).into_response()
        }
    }
}

macro_rules! from_component_error {
    ($ty:ty) => {
        impl From<$ty> for ApiError {
            fn from(e: $ty) -> Self {
                Self::new(e.kind(), e.to_string())
            }
        }
    };
}

from_component_error!(keystore::KeystoreError);
from_component_error!(sessions::SessionError);
from_component_error!(barrier::BarrierError);
from_component_error!(store::StoreError);
