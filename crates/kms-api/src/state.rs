//! `AppState`/`Shared`: the handle every route closes over, grounded on
//! `citadel-api`'s `AppState`/`Shared = Arc<AppState>` shape.

use std::sync::Arc;

use keystore::ElasticKeyManager;
use sessions::SessionManager;
use store::InMemoryStore;

use crate::routes::rate_limit::RateLimiter;

/// Everything a route handler needs to serve a request.
pub struct AppState {
    /// The backing store, cloned freely — `InMemoryStore` is itself a
    /// cheap, `Arc`-backed handle.
    pub store: InMemoryStore,
    /// Elastic key and material lifecycle.
    pub keystore: Arc<ElasticKeyManager<InMemoryStore>>,
    /// Session issuance, validation, and revocation.
    pub sessions: Arc<SessionManager<InMemoryStore>>,
    /// Per-IP request throttling.
    pub rate_limiter: RateLimiter,
}

/// Shared, cheaply cloned application state handed to every route.
pub type Shared = Arc<AppState>;
