//! Concrete scenarios from `spec.md` §8: creation, the material cap,
//! rotation, and a concurrent rotation race at the cap boundary.

use std::sync::Arc;

use audit::RepositoryAuditSink;
use barrier::{BarrierService, StaticProvider};
use jwkgen::{Algorithm, KeyUse};
use keystore::{AlwaysUnused, ElasticKeyManager, KeystoreError};
use platform_common::TenantScope;
use store::InMemoryStore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

async fn new_manager() -> (ElasticKeyManager<InMemoryStore>, TenantScope) {
    let store = InMemoryStore::new();
    let barrier = Arc::new(
        BarrierService::bootstrap(
            Arc::new(StaticProvider::new([1u8; 32])),
            store.clone(),
            CancellationToken::new(),
        )
        .await
        .unwrap(),
    );
    let audit = Arc::new(RepositoryAuditSink::new(store.clone()));
    let manager = ElasticKeyManager::new(store, barrier, audit, Arc::new(AlwaysUnused));
    let scope = TenantScope::new(Uuid::new_v4(), Uuid::new_v4());
    (manager, scope)
}

#[tokio::test]
async fn create_elastic_key_seeds_one_active_material_and_appears_in_jwks() {
    let (manager, scope) = new_manager().await;

    let key = manager
        .create_elastic_key(
            scope,
            "signing-key".to_string(),
            Algorithm::Rsa2048,
            KeyUse::Sig,
            10,
            false,
            "req-1",
            "test",
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(key.current_material_count, 1);

    let jwks = manager.jwks(scope).await.unwrap();
    assert_eq!(jwks.keys.len(), 1);
    assert!(!jwks.keys[0].kid.is_empty());
}

#[tokio::test]
async fn mismatched_use_is_rejected_and_persists_nothing() {
    let (manager, scope) = new_manager().await;

    let result = manager
        .create_elastic_key(
            scope,
            "bad-key".to_string(),
            Algorithm::Rsa2048,
            KeyUse::Enc,
            10,
            false,
            "req-1",
            "test",
            CancellationToken::new(),
        )
        .await;
    assert!(matches!(result, Err(KeystoreError::Validation(_))));

    let keys = manager.list_elastic_keys(scope).await.unwrap();
    assert!(keys.is_empty());
}

#[tokio::test]
async fn create_material_refuses_at_cap() {
    let (manager, scope) = new_manager().await;
    manager
        .create_elastic_key(
            scope,
            "k".to_string(),
            Algorithm::EcP256,
            KeyUse::Sig,
            1,
            false,
            "req-1",
            "test",
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let result = manager
        .create_material(scope, "k", "req-2", "test", CancellationToken::new())
        .await;
    assert!(matches!(result, Err(KeystoreError::MaxMaterialsReached(_))));

    let key = manager.get_elastic_key(scope, "k").await.unwrap();
    assert_eq!(key.current_material_count, 1);
}

#[tokio::test]
async fn rotate_material_activates_new_and_retires_prior() {
    let (manager, scope) = new_manager().await;
    manager
        .create_elastic_key(
            scope,
            "k".to_string(),
            Algorithm::EcP256,
            KeyUse::Sig,
            5,
            false,
            "req-1",
            "test",
            CancellationToken::new(),
        )
        .await
        .unwrap();
    manager.create_material(scope, "k", "req-2", "test", CancellationToken::new()).await.unwrap();
    manager.create_material(scope, "k", "req-3", "test", CancellationToken::new()).await.unwrap();

    let first_active = manager.get_active_material(scope, "k").await.unwrap();
    let rotated = manager
        .rotate_material(scope, "k", "req-4", "test", CancellationToken::new())
        .await
        .unwrap();

    assert_ne!(rotated.id, first_active.id);
    assert!(rotated.is_active);

    let key = manager.get_elastic_key(scope, "k").await.unwrap();
    assert_eq!(key.current_material_count, 4);

    let active = manager.get_active_material(scope, "k").await.unwrap();
    assert_eq!(active.id, rotated.id);
}

#[tokio::test]
async fn concurrent_rotate_at_cap_exactly_one_succeeds() {
    let (manager, scope) = new_manager().await;
    manager
        .create_elastic_key(
            scope,
            "k".to_string(),
            Algorithm::EcP256,
            KeyUse::Sig,
            2,
            false,
            "req-1",
            "test",
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let manager = Arc::new(manager);
    let a = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            manager.rotate_material(scope, "k", "req-a", "test", CancellationToken::new()).await
        })
    };
    let b = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            manager.rotate_material(scope, "k", "req-b", "test", CancellationToken::new()).await
        })
    };

    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    let caps_reached = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Err(KeystoreError::MaxMaterialsReached(_))))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(caps_reached, 1);

    let key = manager.get_elastic_key(scope, "k").await.unwrap();
    assert_eq!(key.current_material_count, 2);
}
