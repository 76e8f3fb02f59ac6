//! Thin `axum` binary wiring the barrier, keystore, and session subsystems
//! together behind an HTTP surface, grounded on `citadel-api`'s bootstrap
//! shape: read config, build state, build the router, serve with graceful
//! shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use audit::RepositoryAuditSink;
use barrier::{BarrierService, ShamirProvider, StaticProvider, SystemDerivedProvider, UnsealKeyProvider};
use keystore::{AlwaysUnused, ElasticKeyManager};
use platform_common::{init_tracing, TracingConfig};
use sessions::{SessionManager, SessionUsageChecker};
use store::InMemoryStore;
use tokio_util::sync::CancellationToken;

use kms_api::config::{Config, LogFormat, StoreBackend, UnsealMode};
use kms_api::routes;
use kms_api::routes::rate_limit::RateLimiter;
use kms_api::state::{AppState, Shared};

fn build_unseal_provider(mode: &UnsealMode) -> Arc<dyn UnsealKeyProvider> {
    match mode {
        UnsealMode::System => {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "kms-api".to_string());
            let machine_id = std::fs::read_to_string("/etc/machine-id").unwrap_or_else(|_| "unknown".to_string());
            let fingerprint = std::env::var("UNSEAL_FINGERPRINT").unwrap_or_else(|_| "default".to_string());
            Arc::new(SystemDerivedProvider::new(hostname, machine_id.trim().to_string(), fingerprint))
        }
        UnsealMode::Static { kek } => Arc::new(StaticProvider::new(*kek)),
        UnsealMode::Shamir { shares, threshold } => Arc::new(ShamirProvider::new(shares.clone(), *threshold)),
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env().expect("invalid configuration");

    let tracing_config = match config.log_format {
        LogFormat::Json => TracingConfig::default(),
        LogFormat::Pretty => TracingConfig::default().with_pretty_output(),
    };
    init_tracing(&tracing_config);

    if config.store_backend != StoreBackend::Memory {
        panic!("only STORE_BACKEND=memory is implemented");
    }
    let store = InMemoryStore::new();

    let unseal = build_unseal_provider(&config.unseal_mode);
    let barrier = Arc::new(
        BarrierService::bootstrap(unseal, store.clone(), CancellationToken::new())
            .await
            .expect("barrier bootstrap failed"),
    );
    let audit: Arc<dyn audit::AuditSink> = Arc::new(RepositoryAuditSink::new(store.clone()));

    // `ElasticKeyManager` needs a `MaterialUsageChecker` up front, but the
    // concrete session-backed checker needs an `ElasticKeyManager` to
    // resolve the material a session token names. Break the cycle by
    // constructing a throwaway manager with `AlwaysUnused` purely to hand
    // to the checker — the checker only calls
    // `unseal_material_by_kid`/`list_sessions` through it, never its
    // `usage` field — then build the real manager with the real checker.
    let keystore_seed = Arc::new(ElasticKeyManager::new(
        store.clone(),
        barrier.clone(),
        audit.clone(),
        Arc::new(AlwaysUnused),
    ));
    let usage_checker = Arc::new(SessionUsageChecker::new(store.clone(), keystore_seed));
    let keystore = Arc::new(ElasticKeyManager::new(store.clone(), barrier.clone(), audit.clone(), usage_checker));

    let sessions = Arc::new(SessionManager::new(
        store.clone(),
        keystore.clone(),
        config.session_access_ttl,
        config.session_idle_ttl,
        config.session_grace,
    ));

    let cleanup_cancellation = CancellationToken::new();
    let cleanup_sessions = sessions.clone();
    let cleanup_token = cleanup_cancellation.clone();
    let cleanup_period = config.session_cleanup_interval;
    tokio::spawn(async move {
        cleanup_sessions.run_cleanup_loop(cleanup_period, cleanup_token).await;
    });

    let state: Shared = Arc::new(AppState {
        store,
        keystore,
        sessions,
        rate_limiter: RateLimiter::new(50.0, 100),
    });

    let eviction_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            eviction_state.rate_limiter.evict_idle().await;
        }
    });

    let app = routes::build_router(state);
    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind listener");
    tracing::info!(%addr, "kms-api listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    cleanup_cancellation.cancel();
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    tracing::info!("shutdown signal received");
}
