//! End-to-end HTTP flow over the router built by [`kms_api::routes::build_router`],
//! exercised via `tower::ServiceExt::oneshot` the way `axum` itself documents
//! testing a `Router` without binding a socket.

use std::net::SocketAddr;
use std::sync::Arc;

use audit::RepositoryAuditSink;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use barrier::{BarrierService, StaticProvider};
use keystore::{AlwaysUnused, ElasticKeyManager};
use kms_api::routes::rate_limit::RateLimiter;
use kms_api::state::AppState;
use sessions::{SessionManager, SessionUsageChecker};
use serde_json::{json, Value};
use store::InMemoryStore;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

async fn test_state() -> Arc<AppState> {
    let store = InMemoryStore::new();
    let barrier = Arc::new(
        BarrierService::bootstrap(
            Arc::new(StaticProvider::new([3u8; 32])),
            store.clone(),
            CancellationToken::new(),
        )
        .await
        .unwrap(),
    );
    let audit = Arc::new(RepositoryAuditSink::new(store.clone()));
    let keystore_seed = Arc::new(ElasticKeyManager::new(
        store.clone(),
        barrier.clone(),
        audit.clone(),
        Arc::new(AlwaysUnused),
    ));
    let usage_checker = Arc::new(SessionUsageChecker::new(store.clone(), keystore_seed));
    let keystore = Arc::new(ElasticKeyManager::new(store.clone(), barrier, audit, usage_checker));
    let sessions = Arc::new(SessionManager::new(
        store.clone(),
        keystore.clone(),
        chrono::Duration::minutes(15),
        chrono::Duration::hours(1),
        chrono::Duration::seconds(30),
    ));
    Arc::new(AppState {
        store,
        keystore,
        sessions,
        rate_limiter: RateLimiter::new(1000.0, 1000),
    })
}

async fn send(app: axum::Router, method: &str, uri: &str, bearer: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let mut request = builder.body(Body::from(body.to_string())).unwrap();
    // `rate_limit_middleware` extracts `ConnectInfo<SocketAddr>`, which
    // only `into_make_service_with_connect_info` populates outside of a
    // real socket accept loop — stand in for it here.
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 0))));
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

#[tokio::test]
async fn health_check_is_unauthenticated() {
    let app = kms_api::routes::build_router(test_state().await);
    let mut request = Request::builder().method("GET").uri("/health").body(Body::empty()).unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 0))));
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn full_tenant_realm_session_key_flow() {
    let state = test_state().await;
    let app = kms_api::routes::build_router(state);

    let (status, tenant) = send(
        app.clone(),
        "POST",
        "/tenants",
        None,
        json!({"name": "acme", "public_discovery": false}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let tenant_id = tenant["id"].as_str().unwrap().to_string();

    let (status, realm) = send(
        app.clone(),
        "POST",
        &format!("/tenants/{tenant_id}/realms"),
        None,
        json!({"name": "production"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let realm_id = realm["id"].as_str().unwrap().to_string();

    // Realm creation must have pre-provisioned the two session elastic keys.
    let (status, jwks) = send(
        app.clone(),
        "GET",
        &format!("/tenants/{tenant_id}/realms/{realm_id}/jwks"),
        None,
        Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "jwks listing route is scope-gated, not public, for a non-discoverable tenant");
    let _ = jwks;

    let (status, issued) = send(
        app.clone(),
        "POST",
        &format!("/tenants/{tenant_id}/realms/{realm_id}/sessions"),
        None,
        json!({"kind": "service", "subject": "ci-runner", "claims": {}}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = issued["token"].as_str().unwrap().to_string();

    let (status, validated) = send(app.clone(), "POST", "/sessions/validate", None, json!({"token": token})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(validated["subject"], "ci-runner");

    let (status, created_key) = send(
        app.clone(),
        "POST",
        &format!("/tenants/{tenant_id}/realms/{realm_id}/jwk/service-signing"),
        Some(&token),
        json!({"algorithm": "EC/P256", "use": "sig", "max_materials": 3, "public_discovery": true}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created_key:?}");
    assert_eq!(created_key["current_material_count"], 1);

    let (status, rotated) = send(
        app.clone(),
        "POST",
        &format!("/tenants/{tenant_id}/realms/{realm_id}/elastic-jwks/service-signing/materials/rotate"),
        Some(&token),
        Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rotated["is_active"], true);

    let (status, _) = send(
        app.clone(),
        "GET",
        &format!("/tenants/{tenant_id}/realms/{realm_id}/jwk/service-signing"),
        None,
        Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "missing bearer token on a scope-gated route must be rejected");
}

#[tokio::test]
async fn mismatched_scope_token_is_rejected() {
    let state = test_state().await;
    let app = kms_api::routes::build_router(state);

    let (_, tenant_a) = send(app.clone(), "POST", "/tenants", None, json!({"name": "a"})).await;
    let tenant_a_id = tenant_a["id"].as_str().unwrap().to_string();
    let (_, realm_a) = send(app.clone(), "POST", &format!("/tenants/{tenant_a_id}/realms"), None, json!({"name": "r"})).await;
    let realm_a_id = realm_a["id"].as_str().unwrap().to_string();

    let (_, tenant_b) = send(app.clone(), "POST", "/tenants", None, json!({"name": "b"})).await;
    let tenant_b_id = tenant_b["id"].as_str().unwrap().to_string();
    let (_, realm_b) = send(app.clone(), "POST", &format!("/tenants/{tenant_b_id}/realms"), None, json!({"name": "r"})).await;
    let realm_b_id = realm_b["id"].as_str().unwrap().to_string();

    let (_, issued) = send(
        app.clone(),
        "POST",
        &format!("/tenants/{tenant_a_id}/realms/{realm_a_id}/sessions"),
        None,
        json!({"kind": "service", "subject": "svc", "claims": {}}),
    )
    .await;
    let token = issued["token"].as_str().unwrap().to_string();

    let (status, _) = send(
        app.clone(),
        "GET",
        &format!("/tenants/{tenant_b_id}/realms/{realm_b_id}/jwks"),
        Some(&token),
        Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "a session scoped to tenant A must not authorize tenant B's realm");
}
