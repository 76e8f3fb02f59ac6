//! `ElasticKeyManager`: elastic key and material lifecycle, plus the JWKS
//! projection. Exclusively owns write access to the elastic/material
//! tables, wrapping every stored material through [`BarrierService`].

use std::sync::Arc;

use chrono::Utc;
use jwkgen::{Algorithm, KeyUse, PrivateMaterial};
use platform_common::TenantScope;
use store::model::{AuditOutcome, ElasticKey, MaterialKey};
use store::{with_transaction, BarrierRepository, KeystoreRepository, LockKey, Store, StoreError};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use audit::AuditSink;
use barrier::BarrierService;

use crate::error::KeystoreError;
use crate::usage::MaterialUsageChecker;

const MAX_MATERIALS_CEILING: u32 = 1000;

fn validate_max_materials(max_materials: u32) -> Result<(), KeystoreError> {
    if (1..=MAX_MATERIALS_CEILING).contains(&max_materials) {
        Ok(())
    } else {
        Err(KeystoreError::Validation(format!(
            "max_materials must be in [1, {MAX_MATERIALS_CEILING}], got {max_materials}"
        )))
    }
}

/// Best-effort audit recording: failures are logged, never propagated —
/// the triggering operation has already succeeded or failed on its own
/// terms by the time this runs.
async fn record_audit(
    audit: &dyn AuditSink,
    scope: TenantScope,
    operation: &str,
    request_id: &str,
    actor: &str,
    subject_id: Option<&str>,
    outcome: AuditOutcome,
) {
    if let Err(e) = audit.record(scope, operation, request_id, actor, subject_id, outcome).await {
        tracing::warn!(error = %e, operation, "failed to record audit entry");
    }
}

/// The full lifecycle of elastic keys and their material, plus the JWKS
/// projection. Generic over the store backend, same as [`BarrierService`].
pub struct ElasticKeyManager<S: Store + KeystoreRepository + BarrierRepository> {
    store: S,
    barrier: Arc<BarrierService<S>>,
    audit: Arc<dyn AuditSink>,
    usage: Arc<dyn MaterialUsageChecker>,
}

impl<S: Store + KeystoreRepository + BarrierRepository> ElasticKeyManager<S> {
    /// Build a manager over `store`, sealing material through `barrier` and
    /// recording auditable events through `audit`. `usage` answers the
    /// `InUse` check on delete; pass [`crate::usage::AlwaysUnused`] if no
    /// session subsystem is wired yet.
    #[must_use]
    pub fn new(
        store: S,
        barrier: Arc<BarrierService<S>>,
        audit: Arc<dyn AuditSink>,
        usage: Arc<dyn MaterialUsageChecker>,
    ) -> Self {
        Self {
            store,
            barrier,
            audit,
            usage,
        }
    }

    /// Validate inputs, generate the first material, seal it, and persist
    /// both rows in one transaction with `current_material_count=1`.
    #[instrument(skip(self))]
    #[allow(clippy::too_many_arguments)]
    pub async fn create_elastic_key(
        &self,
        scope: TenantScope,
        kid: String,
        algorithm: Algorithm,
        key_use: KeyUse,
        max_materials: u32,
        public_discovery: bool,
        request_id: &str,
        actor: &str,
        cancellation: CancellationToken,
    ) -> Result<ElasticKey, KeystoreError> {
        validate_max_materials(max_materials)?;
        algorithm
            .validate_use(key_use)
            .map_err(|e| KeystoreError::Validation(e.to_string()))?;

        let generated = jwkgen::generate(algorithm, &mut rand::rngs::OsRng)?;
        let sealed = self.barrier.encrypt_content(&generated.private.to_bytes()).await?;

        let elastic_key_id = Uuid::new_v4();
        let now = Utc::now();
        let elastic_key = ElasticKey {
            id: elastic_key_id,
            tenant_scope: scope,
            kid: kid.clone(),
            algorithm: algorithm.as_str().to_string(),
            key_use,
            max_materials,
            current_material_count: 1,
            public_discovery,
            created_at: now,
        };
        let material = MaterialKey {
            id: Uuid::new_v4(),
            elastic_key_id,
            material_kid: generated.material_kid,
            sealed_material: sealed.into_bytes(),
            is_active: true,
            created_at: now,
            retired_at: None,
        };

        with_transaction(&self.store, LockKey::Tenant(scope), cancellation, |tx| {
            let store = &self.store;
            let elastic_key = elastic_key.clone();
            let material = material.clone();
            async move {
                store.insert_elastic_key(tx, elastic_key).await?;
                store.insert_material(tx, material, false).await?;
                Ok(())
            }
        })
        .await?;

        record_audit(
            self.audit.as_ref(),
            scope,
            "elastic_key.create",
            request_id,
            actor,
            Some(&kid),
            AuditOutcome::Success,
        )
        .await;

        Ok(elastic_key)
    }

    /// Look up an elastic key by `kid`.
    pub async fn get_elastic_key(&self, scope: TenantScope, kid: &str) -> Result<ElasticKey, KeystoreError> {
        self.store
            .get_elastic_key(scope, kid)
            .await?
            .ok_or_else(|| KeystoreError::NotFound(format!("elastic key {kid}")))
    }

    /// All elastic keys in scope.
    pub async fn list_elastic_keys(&self, scope: TenantScope) -> Result<Vec<ElasticKey>, KeystoreError> {
        Ok(self.store.list_elastic_keys(scope).await?)
    }

    /// Delete an elastic key, cascading its materials. Refuses with
    /// [`KeystoreError::InUse`] if any of its materials still back a live
    /// session.
    #[instrument(skip(self))]
    pub async fn delete_elastic_key(
        &self,
        scope: TenantScope,
        kid: &str,
        request_id: &str,
        actor: &str,
        cancellation: CancellationToken,
    ) -> Result<(), KeystoreError> {
        let row = self.get_elastic_key(scope, kid).await?;
        let materials = self.store.list_materials(row.id).await?;
        let material_kids: Vec<String> = materials.into_iter().map(|m| m.material_kid).collect();
        if self.usage.any_in_use(scope, &material_kids).await? {
            return Err(KeystoreError::InUse(kid.to_string()));
        }

        with_transaction(&self.store, LockKey::Tenant(scope), cancellation, |tx| {
            let store = &self.store;
            async move { store.delete_elastic_key(tx, scope, row.id).await }
        })
        .await?;

        record_audit(
            self.audit.as_ref(),
            scope,
            "elastic_key.delete",
            request_id,
            actor,
            Some(kid),
            AuditOutcome::Success,
        )
        .await;
        Ok(())
    }

    /// Generate and seal a new, inactive material. `RotateMaterial` is the
    /// only path to activation.
    #[instrument(skip(self))]
    pub async fn create_material(
        &self,
        scope: TenantScope,
        kid: &str,
        request_id: &str,
        actor: &str,
        cancellation: CancellationToken,
    ) -> Result<MaterialKey, KeystoreError> {
        let kid_owned = kid.to_string();
        let barrier = Arc::clone(&self.barrier);
        let new_material = with_transaction(&self.store, LockKey::Tenant(scope), cancellation, |tx| {
            let store = &self.store;
            let barrier = &barrier;
            let kid = &kid_owned;
            async move {
                let row = store
                    .get_elastic_key(scope, kid)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(format!("elastic key {kid}")))?;
                if row.current_material_count >= row.max_materials {
                    return Err(StoreError::Conflict(format!(
                        "elastic key {kid} has reached its material cap"
                    )));
                }
                let algorithm = Algorithm::parse(&row.algorithm).map_err(|e| StoreError::Backend(e.to_string()))?;
                let generated = jwkgen::generate(algorithm, &mut rand::rngs::OsRng)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                let sealed = barrier
                    .encrypt_content(&generated.private.to_bytes())
                    .await
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                let new_row = MaterialKey {
                    id: Uuid::new_v4(),
                    elastic_key_id: row.id,
                    material_kid: generated.material_kid,
                    sealed_material: sealed.into_bytes(),
                    is_active: false,
                    created_at: Utc::now(),
                    retired_at: None,
                };
                store.insert_material(tx, new_row.clone(), true).await?;
                Ok(new_row)
            }
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => KeystoreError::MaxMaterialsReached(kid_owned.clone()),
            other => KeystoreError::Storage(other),
        })?;

        record_audit(
            self.audit.as_ref(),
            scope,
            "material.create",
            request_id,
            actor,
            Some(&new_material.material_kid),
            AuditOutcome::Success,
        )
        .await;
        Ok(new_material)
    }

    /// Generate and seal a new active material, retiring the prior one.
    /// Post-condition: exactly one material is active, and it is the
    /// newly inserted row.
    #[instrument(skip(self))]
    pub async fn rotate_material(
        &self,
        scope: TenantScope,
        kid: &str,
        request_id: &str,
        actor: &str,
        cancellation: CancellationToken,
    ) -> Result<MaterialKey, KeystoreError> {
        let kid_owned = kid.to_string();
        let barrier = Arc::clone(&self.barrier);
        let new_material = with_transaction(&self.store, LockKey::Tenant(scope), cancellation, |tx| {
            let store = &self.store;
            let barrier = &barrier;
            let kid = &kid_owned;
            async move {
                let row = store
                    .get_elastic_key(scope, kid)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(format!("elastic key {kid}")))?;
                if row.current_material_count >= row.max_materials {
                    return Err(StoreError::Conflict(format!(
                        "elastic key {kid} has reached its material cap"
                    )));
                }
                let algorithm = Algorithm::parse(&row.algorithm).map_err(|e| StoreError::Backend(e.to_string()))?;
                let generated = jwkgen::generate(algorithm, &mut rand::rngs::OsRng)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                let sealed = barrier
                    .encrypt_content(&generated.private.to_bytes())
                    .await
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                let prior_active = store.get_active_material(row.id).await?;
                let new_row = MaterialKey {
                    id: Uuid::new_v4(),
                    elastic_key_id: row.id,
                    material_kid: generated.material_kid,
                    sealed_material: sealed.into_bytes(),
                    is_active: true,
                    created_at: Utc::now(),
                    retired_at: None,
                };
                store.insert_material(tx, new_row.clone(), true).await?;
                if let Some(prior) = prior_active {
                    store.retire_material(tx, prior.id, Utc::now()).await?;
                }
                Ok(new_row)
            }
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => KeystoreError::MaxMaterialsReached(kid_owned.clone()),
            other => KeystoreError::Storage(other),
        })?;

        record_audit(
            self.audit.as_ref(),
            scope,
            "material.rotate",
            request_id,
            actor,
            Some(&new_material.material_kid),
            AuditOutcome::Success,
        )
        .await;
        Ok(new_material)
    }

    /// Return the one active material, or [`KeystoreError::NotFound`].
    /// If more than one material is active (should never occur), the
    /// largest `created_at` is treated as canonical and a
    /// `material.invariant_violation` audit entry is recorded.
    #[instrument(skip(self))]
    pub async fn get_active_material(&self, scope: TenantScope, kid: &str) -> Result<MaterialKey, KeystoreError> {
        let row = self.get_elastic_key(scope, kid).await?;
        let materials = self.store.list_materials(row.id).await?;
        let mut active: Vec<MaterialKey> = materials.into_iter().filter(|m| m.is_active).collect();

        match active.len() {
            0 => Err(KeystoreError::NotFound(format!("active material for {kid}"))),
            1 => Ok(active.remove(0)),
            _ => {
                active.sort_by_key(|m| m.created_at);
                let canonical = active.pop().expect("len > 1 checked above");
                record_audit(
                    self.audit.as_ref(),
                    scope,
                    "material.invariant_violation",
                    "system",
                    "system",
                    Some(kid),
                    AuditOutcome::Failure,
                )
                .await;
                Ok(canonical)
            }
        }
    }

    /// Clear `is_active` on a material. Permitted only if another material
    /// is already active.
    #[instrument(skip(self))]
    pub async fn retire_material(
        &self,
        scope: TenantScope,
        kid: &str,
        material_id: Uuid,
        request_id: &str,
        actor: &str,
        cancellation: CancellationToken,
    ) -> Result<(), KeystoreError> {
        let row = self.get_elastic_key(scope, kid).await?;
        let materials = self.store.list_materials(row.id).await?;
        let other_active = materials
            .iter()
            .any(|m| m.is_active && m.id != material_id);
        if !other_active {
            return Err(KeystoreError::NoActiveMaterial(kid.to_string()));
        }

        with_transaction(&self.store, LockKey::Tenant(scope), cancellation, |tx| {
            let store = &self.store;
            async move { store.retire_material(tx, material_id, Utc::now()).await }
        })
        .await?;

        record_audit(
            self.audit.as_ref(),
            scope,
            "material.retire",
            request_id,
            actor,
            Some(kid),
            AuditOutcome::Success,
        )
        .await;
        Ok(())
    }

    /// Public components of the active `sig`-use material of every elastic
    /// key in scope, sorted by `kid`. Retired material is never exposed.
    pub async fn jwks(&self, scope: TenantScope) -> Result<jwkgen::JwkSet, KeystoreError> {
        let mut keys = self.store.list_elastic_keys(scope).await?;
        keys.retain(|k| k.key_use == KeyUse::Sig);
        keys.sort_by(|a, b| a.kid.cmp(&b.kid));

        let mut jwks = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(material) = self.store.get_active_material(key.id).await? else {
                continue;
            };
            let algorithm = Algorithm::parse(&key.algorithm)?;
            let private = self.unseal(&material, algorithm).await?;
            jwks.push(jwkgen::public_jwk(algorithm, &material.material_kid, &private)?);
        }
        Ok(jwkgen::JwkSet { keys: jwks })
    }

    /// Unseal and reconstruct the private material behind a `sealed_material`
    /// row, given the algorithm its parent elastic key was generated under.
    async fn unseal(&self, material: &MaterialKey, algorithm: Algorithm) -> Result<PrivateMaterial, KeystoreError> {
        let compact = String::from_utf8(material.sealed_material.clone()).map_err(|_| {
            KeystoreError::Barrier(barrier::BarrierError::Malformed(
                "sealed material is not valid UTF-8".to_string(),
            ))
        })?;
        let raw = self.barrier.decrypt_content(&compact).await?;
        Ok(PrivateMaterial::from_bytes(algorithm, &raw)?)
    }

    /// Unseal the currently active material of elastic key `kid`, for
    /// callers (session issuance) that need the private material directly
    /// rather than its public JWK projection. Returns the algorithm and the
    /// active material's `material_kid` alongside the unsealed bytes.
    pub async fn unseal_active_material(
        &self,
        scope: TenantScope,
        kid: &str,
    ) -> Result<(Algorithm, PrivateMaterial, String), KeystoreError> {
        let elastic_key = self.get_elastic_key(scope, kid).await?;
        let material = self
            .store
            .get_active_material(elastic_key.id)
            .await?
            .ok_or_else(|| KeystoreError::NoActiveMaterial(kid.to_string()))?;
        let algorithm = Algorithm::parse(&elastic_key.algorithm)?;
        let private = self.unseal(&material, algorithm).await?;
        Ok((algorithm, private, material.material_kid))
    }

    /// Unseal a material by its globally unique `material_kid`, active or
    /// retired. Used by session validation, which must resolve the
    /// signing/encryption material a token's header names — and the tenant
    /// scope that material belongs to — before the token's own scope claims
    /// can be cross-checked against it.
    pub async fn unseal_material_by_kid(
        &self,
        material_kid: &str,
    ) -> Result<(TenantScope, Algorithm, PrivateMaterial), KeystoreError> {
        let material = self
            .store
            .get_material_by_kid(material_kid)
            .await?
            .ok_or_else(|| KeystoreError::NotFound(format!("material {material_kid}")))?;
        let elastic_key = self
            .store
            .get_elastic_key_by_id_any(material.elastic_key_id)
            .await?
            .ok_or_else(|| KeystoreError::NotFound(format!("material {material_kid}")))?;
        let algorithm = Algorithm::parse(&elastic_key.algorithm)?;
        let private = self.unseal(&material, algorithm).await?;
        Ok((elastic_key.tenant_scope, algorithm, private))
    }
}
