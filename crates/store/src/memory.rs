//! `InMemoryStore`: the test double every crate's test suite runs against,
//! and (via the `postgres` feature being unimplemented) the only `Store`
//! this workspace actually ships, per `spec.md` §1's scope boundary around
//! database driver selection.
//!
//! Tables are `DashMap`s for lock-free reads; writes go through a
//! transaction opened against a per-`LockKey` `tokio::sync::Mutex`. Every
//! write method pushes an undo closure onto the transaction so `rollback`
//! can restore exactly the rows it touched, without snapshotting the whole
//! table.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use platform_common::TenantScope;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{
    AuditLogEntry, BarrierContentKey, BarrierIntermediateKey, BarrierRootKey, ElasticKey,
    MaterialKey, Realm, Session, Tenant,
};
use crate::traits::{AuditRepository, BarrierRepository, KeystoreRepository, SessionRepository, Store, TenantRepository};
use crate::tx::{LockKey, TxHandle};

type UndoOp = Box<dyn FnOnce() + Send>;

/// `InMemoryStore`'s transaction handle: a held lock guard plus the undo
/// log that makes `rollback` exact.
pub struct MemoryTx {
    lock_key: LockKey,
    _guard: OwnedMutexGuard<()>,
    cancellation: CancellationToken,
    undo: Vec<UndoOp>,
}

impl TxHandle for MemoryTx {
    fn lock_key(&self) -> &LockKey {
        &self.lock_key
    }

    fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// An in-memory, process-local implementation of the full `Store` contract.
/// Cheap to clone: every field is an `Arc`, so clones share the same tables.
#[derive(Clone)]
pub struct InMemoryStore {
    roots: Arc<DashMap<Uuid, BarrierRootKey>>,
    intermediates: Arc<DashMap<Uuid, BarrierIntermediateKey>>,
    contents: Arc<DashMap<Uuid, BarrierContentKey>>,
    elastic_keys: Arc<DashMap<Uuid, ElasticKey>>,
    materials: Arc<DashMap<Uuid, MaterialKey>>,
    sessions: Arc<DashMap<Uuid, Session>>,
    audit_log: Arc<DashMap<Uuid, AuditLogEntry>>,
    tenants: Arc<DashMap<Uuid, Tenant>>,
    realms: Arc<DashMap<Uuid, Realm>>,
    tenant_locks: Arc<DashMap<TenantScope, Arc<Mutex<()>>>>,
    barrier_lock: Arc<Mutex<()>>,
    global_lock: Arc<Mutex<()>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// An empty store with no tenants, keys, or sessions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            roots: Arc::new(DashMap::new()),
            intermediates: Arc::new(DashMap::new()),
            contents: Arc::new(DashMap::new()),
            elastic_keys: Arc::new(DashMap::new()),
            materials: Arc::new(DashMap::new()),
            sessions: Arc::new(DashMap::new()),
            audit_log: Arc::new(DashMap::new()),
            tenants: Arc::new(DashMap::new()),
            realms: Arc::new(DashMap::new()),
            tenant_locks: Arc::new(DashMap::new()),
            barrier_lock: Arc::new(Mutex::new(())),
            global_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn lock_for(
        &self,
        lock_key: &LockKey,
        cancellation: &CancellationToken,
    ) -> Result<OwnedMutexGuard<()>, StoreError> {
        let mutex = match lock_key {
            LockKey::Barrier => self.barrier_lock.clone(),
            LockKey::Global => self.global_lock.clone(),
            LockKey::Tenant(scope) => self
                .tenant_locks
                .entry(*scope)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone(),
        };
        tokio::select! {
            guard = mutex.lock_owned() => Ok(guard),
            () = cancellation.cancelled() => Err(StoreError::Cancelled),
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = MemoryTx;

    async fn begin(
        &self,
        lock_key: LockKey,
        cancellation: CancellationToken,
    ) -> Result<Self::Tx, StoreError> {
        if cancellation.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let guard = self.lock_for(&lock_key, &cancellation).await?;
        Ok(MemoryTx {
            lock_key,
            _guard: guard,
            cancellation,
            undo: Vec::new(),
        })
    }

    async fn commit(&self, _tx: Self::Tx) -> Result<(), StoreError> {
        // Writes were applied as each repository method was called; commit
        // only needs to drop the undo log and release the lock (via `Tx`'s
        // `Drop`).
        Ok(())
    }

    async fn rollback(&self, tx: Self::Tx) {
        for undo in tx.undo.into_iter().rev() {
            undo();
        }
    }
}

#[async_trait]
impl BarrierRepository for InMemoryStore {
    async fn get_active_root(&self) -> Result<Option<BarrierRootKey>, StoreError> {
        Ok(self.roots.iter().find(|r| r.is_active).map(|r| r.clone()))
    }

    async fn get_root(&self, id: Uuid) -> Result<Option<BarrierRootKey>, StoreError> {
        Ok(self.roots.get(&id).map(|r| r.clone()))
    }

    async fn get_active_intermediate(&self) -> Result<Option<BarrierIntermediateKey>, StoreError> {
        Ok(self.intermediates.iter().find(|r| r.is_active).map(|r| r.clone()))
    }

    async fn get_intermediate(&self, id: Uuid) -> Result<Option<BarrierIntermediateKey>, StoreError> {
        Ok(self.intermediates.get(&id).map(|r| r.clone()))
    }

    async fn get_active_content(&self) -> Result<Option<BarrierContentKey>, StoreError> {
        Ok(self.contents.iter().find(|r| r.is_active).map(|r| r.clone()))
    }

    async fn get_content(&self, id: Uuid) -> Result<Option<BarrierContentKey>, StoreError> {
        Ok(self.contents.get(&id).map(|r| r.clone()))
    }

    async fn list_content_by_intermediate(
        &self,
        intermediate_id: Uuid,
    ) -> Result<Vec<BarrierContentKey>, StoreError> {
        Ok(self
            .contents
            .iter()
            .filter(|r| r.parent_intermediate_id == intermediate_id)
            .map(|r| r.clone())
            .collect())
    }

    async fn insert_root(&self, tx: &mut Self::Tx, row: BarrierRootKey) -> Result<(), StoreError> {
        tx.check_cancelled()?;
        let id = row.id;
        self.roots.insert(id, row);
        let roots = self.roots.clone();
        tx.undo.push(Box::new(move || {
            roots.remove(&id);
        }));
        Ok(())
    }

    async fn retire_root(
        &self,
        tx: &mut Self::Tx,
        id: Uuid,
        retired_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        tx.check_cancelled()?;
        let mut row = self
            .roots
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("barrier root {id}")))?;
        let previous = row.clone();
        row.is_active = false;
        row.retired_at = Some(retired_at);
        drop(row);
        let roots = self.roots.clone();
        tx.undo.push(Box::new(move || {
            roots.insert(id, previous);
        }));
        Ok(())
    }

    async fn insert_intermediate(
        &self,
        tx: &mut Self::Tx,
        row: BarrierIntermediateKey,
    ) -> Result<(), StoreError> {
        tx.check_cancelled()?;
        let id = row.id;
        self.intermediates.insert(id, row);
        let intermediates = self.intermediates.clone();
        tx.undo.push(Box::new(move || {
            intermediates.remove(&id);
        }));
        Ok(())
    }

    async fn retire_intermediate(
        &self,
        tx: &mut Self::Tx,
        id: Uuid,
        retired_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        tx.check_cancelled()?;
        let mut row = self
            .intermediates
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("barrier intermediate {id}")))?;
        let previous = row.clone();
        row.is_active = false;
        row.retired_at = Some(retired_at);
        drop(row);
        let intermediates = self.intermediates.clone();
        tx.undo.push(Box::new(move || {
            intermediates.insert(id, previous);
        }));
        Ok(())
    }

    async fn insert_content(&self, tx: &mut Self::Tx, row: BarrierContentKey) -> Result<(), StoreError> {
        tx.check_cancelled()?;
        let id = row.id;
        self.contents.insert(id, row);
        let contents = self.contents.clone();
        tx.undo.push(Box::new(move || {
            contents.remove(&id);
        }));
        Ok(())
    }

    async fn retire_content(
        &self,
        tx: &mut Self::Tx,
        id: Uuid,
        retired_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        tx.check_cancelled()?;
        let mut row = self
            .contents
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("barrier content {id}")))?;
        let previous = row.clone();
        row.is_active = false;
        row.retired_at = Some(retired_at);
        drop(row);
        let contents = self.contents.clone();
        tx.undo.push(Box::new(move || {
            contents.insert(id, previous);
        }));
        Ok(())
    }
}

#[async_trait]
impl KeystoreRepository for InMemoryStore {
    async fn get_elastic_key(
        &self,
        scope: TenantScope,
        kid: &str,
    ) -> Result<Option<ElasticKey>, StoreError> {
        Ok(self
            .elastic_keys
            .iter()
            .find(|k| k.tenant_scope == scope && k.kid == kid)
            .map(|k| k.clone()))
    }

    async fn get_elastic_key_by_id(
        &self,
        scope: TenantScope,
        id: Uuid,
    ) -> Result<Option<ElasticKey>, StoreError> {
        Ok(self
            .elastic_keys
            .get(&id)
            .filter(|k| k.tenant_scope == scope)
            .map(|k| k.clone()))
    }

    async fn get_elastic_key_by_id_any(&self, id: Uuid) -> Result<Option<ElasticKey>, StoreError> {
        Ok(self.elastic_keys.get(&id).map(|k| k.clone()))
    }

    async fn list_elastic_keys(&self, scope: TenantScope) -> Result<Vec<ElasticKey>, StoreError> {
        Ok(self
            .elastic_keys
            .iter()
            .filter(|k| k.tenant_scope == scope)
            .map(|k| k.clone())
            .collect())
    }

    async fn list_materials(&self, elastic_key_id: Uuid) -> Result<Vec<MaterialKey>, StoreError> {
        Ok(self
            .materials
            .iter()
            .filter(|m| m.elastic_key_id == elastic_key_id)
            .map(|m| m.clone())
            .collect())
    }

    async fn get_active_material(&self, elastic_key_id: Uuid) -> Result<Option<MaterialKey>, StoreError> {
        let mut actives: Vec<MaterialKey> = self
            .materials
            .iter()
            .filter(|m| m.elastic_key_id == elastic_key_id && m.is_active)
            .map(|m| m.clone())
            .collect();
        // Tie-break per `spec.md` §4.2: should never occur, but if it does,
        // the largest `created_at` wins. The caller (`keystore`) is
        // responsible for emitting `material.invariant_violation`.
        actives.sort_by_key(|m| m.created_at);
        Ok(actives.pop())
    }

    async fn get_material_by_kid(&self, material_kid: &str) -> Result<Option<MaterialKey>, StoreError> {
        Ok(self
            .materials
            .iter()
            .find(|m| m.material_kid == material_kid)
            .map(|m| m.clone()))
    }

    async fn insert_elastic_key(&self, tx: &mut Self::Tx, row: ElasticKey) -> Result<(), StoreError> {
        tx.check_cancelled()?;
        if self
            .elastic_keys
            .iter()
            .any(|k| k.tenant_scope == row.tenant_scope && k.kid == row.kid)
        {
            return Err(StoreError::Conflict(format!(
                "elastic key kid {} already exists in scope",
                row.kid
            )));
        }
        let id = row.id;
        self.elastic_keys.insert(id, row);
        let elastic_keys = self.elastic_keys.clone();
        tx.undo.push(Box::new(move || {
            elastic_keys.remove(&id);
        }));
        Ok(())
    }

    async fn delete_elastic_key(
        &self,
        tx: &mut Self::Tx,
        scope: TenantScope,
        id: Uuid,
    ) -> Result<(), StoreError> {
        tx.check_cancelled()?;
        let (_, removed) = self
            .elastic_keys
            .remove_if(&id, |_, k| k.tenant_scope == scope)
            .ok_or_else(|| StoreError::NotFound(format!("elastic key {id}")))?;
        let cascaded: Vec<MaterialKey> = self
            .materials
            .iter()
            .filter(|m| m.elastic_key_id == id)
            .map(|m| m.clone())
            .collect();
        for material in &cascaded {
            self.materials.remove(&material.id);
        }
        let elastic_keys = self.elastic_keys.clone();
        let materials = self.materials.clone();
        tx.undo.push(Box::new(move || {
            elastic_keys.insert(id, removed);
            for material in cascaded {
                materials.insert(material.id, material);
            }
        }));
        Ok(())
    }

    async fn insert_material(
        &self,
        tx: &mut Self::Tx,
        row: MaterialKey,
        bump_count: bool,
    ) -> Result<(), StoreError> {
        tx.check_cancelled()?;
        let elastic_key_id = row.elastic_key_id;
        let id = row.id;
        self.materials.insert(id, row);
        let materials = self.materials.clone();
        tx.undo.push(Box::new(move || {
            materials.remove(&id);
        }));

        if bump_count {
            let mut elastic_key = self
                .elastic_keys
                .get_mut(&elastic_key_id)
                .ok_or_else(|| StoreError::NotFound(format!("elastic key {elastic_key_id}")))?;
            elastic_key.current_material_count += 1;
            drop(elastic_key);
            let elastic_keys = self.elastic_keys.clone();
            tx.undo.push(Box::new(move || {
                if let Some(mut key) = elastic_keys.get_mut(&elastic_key_id) {
                    key.current_material_count = key.current_material_count.saturating_sub(1);
                }
            }));
        }
        Ok(())
    }

    async fn retire_material(
        &self,
        tx: &mut Self::Tx,
        material_id: Uuid,
        retired_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        tx.check_cancelled()?;
        let mut row = self
            .materials
            .get_mut(&material_id)
            .ok_or_else(|| StoreError::NotFound(format!("material {material_id}")))?;
        let previous = row.clone();
        row.is_active = false;
        row.retired_at = Some(retired_at);
        drop(row);
        let materials = self.materials.clone();
        tx.undo.push(Box::new(move || {
            materials.insert(material_id, previous);
        }));
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn get_session(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.get(&id).map(|s| s.clone()))
    }

    async fn list_sessions(&self, scope: TenantScope) -> Result<Vec<Session>, StoreError> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| s.tenant_scope == scope)
            .map(|s| s.clone())
            .collect())
    }

    async fn insert_session(&self, tx: &mut Self::Tx, row: Session) -> Result<(), StoreError> {
        tx.check_cancelled()?;
        let id = row.id;
        self.sessions.insert(id, row);
        let sessions = self.sessions.clone();
        tx.undo.push(Box::new(move || {
            sessions.remove(&id);
        }));
        Ok(())
    }

    async fn touch_session(
        &self,
        tx: &mut Self::Tx,
        id: Uuid,
        idle_expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        tx.check_cancelled()?;
        let mut row = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))?;
        let previous = row.idle_expires_at;
        row.idle_expires_at = idle_expires_at;
        drop(row);
        let sessions = self.sessions.clone();
        tx.undo.push(Box::new(move || {
            if let Some(mut s) = sessions.get_mut(&id) {
                s.idle_expires_at = previous;
            }
        }));
        Ok(())
    }

    async fn revoke_session(
        &self,
        tx: &mut Self::Tx,
        id: Uuid,
        revoked_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        tx.check_cancelled()?;
        let mut row = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))?;
        let previous_revoked_at = row.revoked_at;
        row.revoked = true;
        row.revoked_at = Some(revoked_at);
        drop(row);
        let sessions = self.sessions.clone();
        tx.undo.push(Box::new(move || {
            if let Some(mut s) = sessions.get_mut(&id) {
                s.revoked = false;
                s.revoked_at = previous_revoked_at;
            }
        }));
        Ok(())
    }

    async fn delete_expired(&self, tx: &mut Self::Tx, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        tx.check_cancelled()?;
        let condemned: Vec<Session> = self
            .sessions
            .iter()
            .filter(|s| {
                s.expires_at < cutoff
                    || (s.revoked && s.revoked_at.is_some_and(|at| at < cutoff))
            })
            .map(|s| s.clone())
            .collect();
        for session in &condemned {
            self.sessions.remove(&session.id);
        }
        let count = condemned.len() as u64;
        let sessions = self.sessions.clone();
        tx.undo.push(Box::new(move || {
            for session in condemned {
                sessions.insert(session.id, session);
            }
        }));
        Ok(count)
    }
}

#[async_trait]
impl AuditRepository for InMemoryStore {
    async fn insert_audit_entry(&self, entry: AuditLogEntry) -> Result<(), StoreError> {
        self.audit_log.insert(entry.id, entry);
        Ok(())
    }

    async fn list_audit_entries(&self, scope: TenantScope) -> Result<Vec<AuditLogEntry>, StoreError> {
        let mut entries: Vec<AuditLogEntry> = self
            .audit_log
            .iter()
            .filter(|e| e.tenant_scope == scope)
            .map(|e| e.clone())
            .collect();
        entries.sort_by_key(|e| std::cmp::Reverse(e.at));
        Ok(entries)
    }
}

#[async_trait]
impl TenantRepository for InMemoryStore {
    async fn get_tenant(&self, id: Uuid) -> Result<Option<Tenant>, StoreError> {
        Ok(self.tenants.get(&id).map(|t| t.clone()))
    }

    async fn insert_tenant(&self, tx: &mut Self::Tx, row: Tenant) -> Result<(), StoreError> {
        tx.check_cancelled()?;
        let id = row.id;
        self.tenants.insert(id, row);
        let tenants = self.tenants.clone();
        tx.undo.push(Box::new(move || {
            tenants.remove(&id);
        }));
        Ok(())
    }

    async fn get_realm(&self, id: Uuid) -> Result<Option<Realm>, StoreError> {
        Ok(self.realms.get(&id).map(|r| r.clone()))
    }

    async fn insert_realm(&self, tx: &mut Self::Tx, row: Realm) -> Result<(), StoreError> {
        tx.check_cancelled()?;
        let id = row.id;
        self.realms.insert(id, row);
        let realms = self.realms.clone();
        tx.undo.push(Box::new(move || {
            realms.remove(&id);
        }));
        Ok(())
    }

    async fn list_realms(&self, tenant_id: Uuid) -> Result<Vec<Realm>, StoreError> {
        Ok(self
            .realms
            .iter()
            .filter(|r| r.tenant_id == tenant_id)
            .map(|r| r.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::with_transaction;
    use uuid::Uuid;

    fn root(id: Uuid, active: bool) -> BarrierRootKey {
        BarrierRootKey {
            id,
            kek_wrapped_material: vec![1, 2, 3],
            created_at: Utc::now(),
            retired_at: None,
            is_active: active,
        }
    }

    #[tokio::test]
    async fn insert_and_read_root() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        with_transaction(&store, LockKey::Barrier, CancellationToken::new(), |tx| {
            let store = &store;
            let row = root(id, true);
            async move { store.insert_root(tx, row).await }
        })
        .await
        .unwrap();

        let active = store.get_active_root().await.unwrap().unwrap();
        assert_eq!(active.id, id);
    }

    #[tokio::test]
    async fn rollback_undoes_insert() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        let result: Result<(), StoreError> =
            with_transaction(&store, LockKey::Barrier, CancellationToken::new(), |tx| {
                let store = &store;
                let row = root(id, true);
                async move {
                    store.insert_root(tx, row).await?;
                    Err(StoreError::Conflict("forced rollback".into()))
                }
            })
            .await;

        assert!(result.is_err());
        assert!(store.get_root(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tenant_locks_serialize_same_scope_writes() {
        let store = InMemoryStore::new();
        let scope = TenantScope::new(Uuid::new_v4(), Uuid::new_v4());
        let elastic_key_id = Uuid::new_v4();
        let key = ElasticKey {
            id: elastic_key_id,
            tenant_scope: scope.clone(),
            kid: "sig-key".to_string(),
            algorithm: "EC/P256".to_string(),
            key_use: crate::model::KeyUse::Sig,
            max_materials: 2,
            current_material_count: 0,
            public_discovery: false,
            created_at: Utc::now(),
        };
        with_transaction(&store, LockKey::Tenant(scope), CancellationToken::new(), |tx| {
            let store = &store;
            async move { store.insert_elastic_key(tx, key).await }
        })
        .await
        .unwrap();

        assert!(store.elastic_keys.contains_key(&elastic_key_id));
    }
}
