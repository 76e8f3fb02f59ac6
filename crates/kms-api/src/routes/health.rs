//! `GET /health` (liveness) and `GET /metrics` (Prometheus exposition) —
//! unauthenticated, unthrottled ambient endpoints.

use axum::http::header;
use axum::response::IntoResponse;
use prometheus::{Encoder, TextEncoder};

pub async fn health() -> impl IntoResponse {
    "ok"
}

pub async fn metrics() -> impl IntoResponse {
    let families = prometheus::gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode prometheus metrics");
    }
    ([(header::CONTENT_TYPE, encoder.format_type().to_string())], buffer)
}
