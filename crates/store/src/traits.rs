//! The persistence contract: per-table repository traits plus the
//! transaction lifecycle (`Store::begin`/`commit`/`rollback`). A free
//! function, [`with_transaction`], composes the three into the
//! `WithTransaction(ctx, fn)` shape `spec.md` §4.5 names.
//!
//! `Store` is a plain generic bound (`S: Store`), not a trait object — the
//! substitutability requirement in `spec.md` §9 is satisfied by
//! [`crate::memory::InMemoryStore`] and the stubbed `postgres` module both
//! implementing it, matching the "parametric-interface" resolution of the
//! source's dynamic-dispatch repository pattern.

use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use platform_common::TenantScope;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{
    AuditLogEntry, BarrierContentKey, BarrierIntermediateKey, BarrierRootKey, ElasticKey,
    MaterialKey, Realm, Session, Tenant,
};
use crate::tx::{LockKey, TxHandle};

/// The transaction lifecycle every backend implements.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// This backend's transaction handle.
    type Tx: TxHandle;

    /// Acquire the writer lock for `lock_key` and open a transaction bound
    /// to `cancellation`. Blocks until the lock is available or
    /// `cancellation` fires.
    async fn begin(
        &self,
        lock_key: LockKey,
        cancellation: CancellationToken,
    ) -> Result<Self::Tx, StoreError>;

    /// Commit `tx`, making its writes visible and releasing the lock.
    async fn commit(&self, tx: Self::Tx) -> Result<(), StoreError>;

    /// Discard `tx`'s writes and release the lock. Never fails: a rollback
    /// is always possible by construction (every write recorded an undo).
    async fn rollback(&self, tx: Self::Tx);
}

/// Run `f` inside a transaction opened under `lock_key`, committing on
/// `Ok` and rolling back on `Err`. This is the `WithTransaction(ctx, fn)`
/// operation from `spec.md` §4.5.
pub async fn with_transaction<S, F, Fut, T>(
    store: &S,
    lock_key: LockKey,
    cancellation: CancellationToken,
    f: F,
) -> Result<T, StoreError>
where
    S: Store,
    F: FnOnce(&mut S::Tx) -> Fut + Send,
    Fut: Future<Output = Result<T, StoreError>> + Send,
    T: Send,
{
    let mut tx = store.begin(lock_key, cancellation).await?;
    match f(&mut tx).await {
        Ok(value) => {
            store.commit(tx).await?;
            Ok(value)
        }
        Err(err) => {
            store.rollback(tx).await;
            Err(err)
        }
    }
}

/// Reads and writes on the three barrier tables. Reads never take the
/// writer lock (`spec.md` §5: "no reader ever blocks another reader");
/// every write takes `&mut Self::Tx` opened with `LockKey::Barrier`.
#[async_trait]
pub trait BarrierRepository: Store {
    /// The currently active root row, if the barrier has been bootstrapped.
    async fn get_active_root(&self) -> Result<Option<BarrierRootKey>, StoreError>;
    /// A root row by id, active or retired.
    async fn get_root(&self, id: Uuid) -> Result<Option<BarrierRootKey>, StoreError>;
    /// The currently active intermediate row.
    async fn get_active_intermediate(&self) -> Result<Option<BarrierIntermediateKey>, StoreError>;
    /// An intermediate row by id, active or retired.
    async fn get_intermediate(&self, id: Uuid) -> Result<Option<BarrierIntermediateKey>, StoreError>;
    /// The currently active content row.
    async fn get_active_content(&self) -> Result<Option<BarrierContentKey>, StoreError>;
    /// A content row by id, active or retired.
    async fn get_content(&self, id: Uuid) -> Result<Option<BarrierContentKey>, StoreError>;
    /// All content rows wrapped by `intermediate_id`, used by compaction to
    /// decide whether that intermediate is still referenced.
    async fn list_content_by_intermediate(
        &self,
        intermediate_id: Uuid,
    ) -> Result<Vec<BarrierContentKey>, StoreError>;

    /// Insert a new root row.
    async fn insert_root(&self, tx: &mut Self::Tx, row: BarrierRootKey) -> Result<(), StoreError>;
    /// Mark a root row retired.
    async fn retire_root(
        &self,
        tx: &mut Self::Tx,
        id: Uuid,
        retired_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    /// Insert a new intermediate row.
    async fn insert_intermediate(
        &self,
        tx: &mut Self::Tx,
        row: BarrierIntermediateKey,
    ) -> Result<(), StoreError>;
    /// Mark an intermediate row retired.
    async fn retire_intermediate(
        &self,
        tx: &mut Self::Tx,
        id: Uuid,
        retired_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    /// Insert a new content row.
    async fn insert_content(&self, tx: &mut Self::Tx, row: BarrierContentKey) -> Result<(), StoreError>;
    /// Mark a content row retired.
    async fn retire_content(
        &self,
        tx: &mut Self::Tx,
        id: Uuid,
        retired_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Reads and writes on the elastic-key and material-key tables.
#[async_trait]
pub trait KeystoreRepository: Store {
    /// Look up an elastic key by its external `kid` within a tenant scope.
    async fn get_elastic_key(
        &self,
        scope: TenantScope,
        kid: &str,
    ) -> Result<Option<ElasticKey>, StoreError>;
    /// Look up an elastic key by primary key, still tenant-scoped.
    async fn get_elastic_key_by_id(
        &self,
        scope: TenantScope,
        id: Uuid,
    ) -> Result<Option<ElasticKey>, StoreError>;
    /// Look up an elastic key by primary key without a scope filter, for
    /// resolving a token's tenant scope from the material it names before
    /// that scope is otherwise known (session validation's entry point).
    async fn get_elastic_key_by_id_any(&self, id: Uuid) -> Result<Option<ElasticKey>, StoreError>;
    /// All elastic keys in a tenant scope.
    async fn list_elastic_keys(&self, scope: TenantScope) -> Result<Vec<ElasticKey>, StoreError>;
    /// All materials belonging to an elastic key, active and retired.
    async fn list_materials(&self, elastic_key_id: Uuid) -> Result<Vec<MaterialKey>, StoreError>;
    /// The single active material for an elastic key, if any.
    async fn get_active_material(&self, elastic_key_id: Uuid) -> Result<Option<MaterialKey>, StoreError>;
    /// A material by its globally unique `material_kid`.
    async fn get_material_by_kid(&self, material_kid: &str) -> Result<Option<MaterialKey>, StoreError>;

    /// Insert a new elastic key row.
    async fn insert_elastic_key(&self, tx: &mut Self::Tx, row: ElasticKey) -> Result<(), StoreError>;
    /// Delete an elastic key and cascade its materials.
    async fn delete_elastic_key(
        &self,
        tx: &mut Self::Tx,
        scope: TenantScope,
        id: Uuid,
    ) -> Result<(), StoreError>;
    /// Insert a new material row, bumping the parent elastic key's counter.
    async fn insert_material(
        &self,
        tx: &mut Self::Tx,
        row: MaterialKey,
        bump_count: bool,
    ) -> Result<(), StoreError>;
    /// Clear `is_active` and set `retired_at` on a material row.
    async fn retire_material(
        &self,
        tx: &mut Self::Tx,
        material_id: Uuid,
        retired_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Reads and writes on the session tables.
#[async_trait]
pub trait SessionRepository: Store {
    /// Look up a session by its id (the JWS `jti`).
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, StoreError>;
    /// All sessions in a tenant scope, revoked and expired rows included.
    /// Backs the elastic-key `InUse` check, which must be able to tell
    /// whether any session still references a material before it can be
    /// deleted.
    async fn list_sessions(&self, scope: TenantScope) -> Result<Vec<Session>, StoreError>;
    /// Insert a newly issued session row.
    async fn insert_session(&self, tx: &mut Self::Tx, row: Session) -> Result<(), StoreError>;
    /// Extend `idle_expires_at`; best-effort per `spec.md` §4.3 step 6 —
    /// callers log failures rather than propagating them.
    async fn touch_session(
        &self,
        tx: &mut Self::Tx,
        id: Uuid,
        idle_expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    /// Set `revoked=true` and `revoked_at=now`.
    async fn revoke_session(
        &self,
        tx: &mut Self::Tx,
        id: Uuid,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    /// Delete rows where `expires_at < cutoff` or the row was revoked before
    /// `cutoff`. `cutoff` already has the grace period subtracted by the
    /// caller.

    async fn delete_expired(&self, tx: &mut Self::Tx, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Append-only audit persistence. Writes never take a writer lock scoped to
/// another table — audit recording must not contend with the operation it
/// describes.
#[async_trait]
pub trait AuditRepository: Store {
    /// Append an audit record.
    async fn insert_audit_entry(&self, entry: AuditLogEntry) -> Result<(), StoreError>;
    /// List audit entries for a tenant scope, newest first. Test/debug use.
    async fn list_audit_entries(&self, scope: TenantScope) -> Result<Vec<AuditLogEntry>, StoreError>;
}

/// Tenant and realm bookkeeping backing `spec.md` §9's "realm creation
/// pre-provisions the two session elastic keys" bootstrap ordering.
#[async_trait]
pub trait TenantRepository: Store {
    /// Look up a tenant.
    async fn get_tenant(&self, id: Uuid) -> Result<Option<Tenant>, StoreError>;
    /// Insert a tenant.
    async fn insert_tenant(&self, tx: &mut Self::Tx, row: Tenant) -> Result<(), StoreError>;
    /// Look up a realm.
    async fn get_realm(&self, id: Uuid) -> Result<Option<Realm>, StoreError>;
    /// Insert a realm.
    async fn insert_realm(&self, tx: &mut Self::Tx, row: Realm) -> Result<(), StoreError>;
    /// All realms belonging to a tenant.
    async fn list_realms(&self, tenant_id: Uuid) -> Result<Vec<Realm>, StoreError>;
}
