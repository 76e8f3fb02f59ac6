//! Property-based checks for the two invariants `spec.md` §8 calls out for
//! elastic keys: `current_material_count` never exceeds `max_materials`,
//! and at most one material is active at a time. Built on the same
//! `new_manager()` bootstrap as `elastic_key_lifecycle.rs`.

use std::sync::Arc;

use audit::RepositoryAuditSink;
use barrier::{BarrierService, StaticProvider};
use jwkgen::{Algorithm, KeyUse};
use keystore::{AlwaysUnused, ElasticKeyManager};
use platform_common::TenantScope;
use proptest::prelude::*;
use store::{InMemoryStore, KeystoreRepository};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

async fn new_manager() -> (ElasticKeyManager<InMemoryStore>, InMemoryStore, TenantScope) {
    let store = InMemoryStore::new();
    let barrier = Arc::new(
        BarrierService::bootstrap(
            Arc::new(StaticProvider::new([7u8; 32])),
            store.clone(),
            CancellationToken::new(),
        )
        .await
        .unwrap(),
    );
    let audit = Arc::new(RepositoryAuditSink::new(store.clone()));
    let handle = store.clone();
    let manager = ElasticKeyManager::new(store, barrier, audit, Arc::new(AlwaysUnused));
    let scope = TenantScope::new(Uuid::new_v4(), Uuid::new_v4());
    (manager, handle, scope)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn rotations_never_exceed_cap_and_keep_exactly_one_active(
        max_materials in 1u32..6,
        rotation_attempts in 0u32..12,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (manager, store, scope) = new_manager().await;
            manager
                .create_elastic_key(
                    scope,
                    "k".to_string(),
                    Algorithm::EcP256,
                    KeyUse::Sig,
                    max_materials,
                    false,
                    "req-create",
                    "test",
                    CancellationToken::new(),
                )
                .await
                .unwrap();

            for i in 0..rotation_attempts {
                // Ignore the result: refusal at cap is an expected outcome,
                // not a failure of the property under test.
                let _ = manager
                    .rotate_material(scope, "k", &format!("req-{i}"), "test", CancellationToken::new())
                    .await;
            }

            let key = manager.get_elastic_key(scope, "k").await.unwrap();
            prop_assert!(key.current_material_count <= max_materials);

            let materials = store.list_materials(key.id).await.unwrap();
            prop_assert_eq!(materials.len() as u32, key.current_material_count);

            let active_count = materials.iter().filter(|m| m.is_active).count();
            prop_assert_eq!(active_count, 1);
            Ok(())
        })?;
    }
}
