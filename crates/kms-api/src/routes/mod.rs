//! Route modules and the `axum::Router` assembly, grounded on
//! `citadel-api`'s `Router::new().route(...).layer(...).with_state(state)`
//! shape.

pub mod auth;
pub mod elastic_keys;
pub mod health;
pub mod jwks;
pub mod rate_limit;
pub mod sessions;
pub mod tenants;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::Shared;

/// Build the full application router over `state`.
pub fn build_router(state: Shared) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .route(
            "/tenants/:tenant_id/realms/:realm_id/.well-known/jwks.json",
            get(jwks::jwks),
        )
        .route(
            "/tenants/:tenant_id/realms/:realm_id/jwk/:kid",
            post(elastic_keys::create_elastic_key)
                .get(elastic_keys::get_elastic_key)
                .delete(elastic_keys::delete_elastic_key),
        )
        .route("/tenants/:tenant_id/realms/:realm_id/jwks", get(elastic_keys::list_elastic_keys))
        .route(
            "/tenants/:tenant_id/realms/:realm_id/elastic-jwks/:kid/materials",
            post(elastic_keys::create_material).get(elastic_keys::list_materials),
        )
        .route(
            "/tenants/:tenant_id/realms/:realm_id/elastic-jwks/:kid/materials/rotate",
            post(elastic_keys::rotate_material),
        )
        .route(
            "/tenants/:tenant_id/realms/:realm_id/elastic-jwks/:kid/materials/active",
            get(elastic_keys::active_material),
        )
        .route("/tenants/:tenant_id/realms/:realm_id/sessions", post(sessions::issue))
        // Validation resolves its own tenant/realm scope from the token's
        // header/claims (see `sessions::SessionManager::validate_inner`), so
        // unlike every other route this one carries no scope in its path.
        .route("/sessions/validate", post(sessions::validate))
        .route("/tenants", post(tenants::create_tenant))
        .route("/tenants/:tenant_id/realms", post(tenants::create_realm))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit::rate_limit_middleware))
        .layer(cors)
        .with_state(state)
}
