//! The in-memory active content-key snapshot and the bounded cache of
//! unwrapped retired keys, grounded on
//! `auth-edge-service::crypto::key_manager::KeyManager`'s use of
//! `arc_swap::ArcSwap` for "atomically swapped immutable snapshot" reads.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// The unwrapped content key material currently in use for new
/// `EncryptContent` calls.
#[derive(Debug, Clone)]
pub struct ContentKeyMaterial {
    /// The `BarrierContentKey` row id this material belongs to.
    pub id: Uuid,
    /// Raw AES-256-GCM key bytes.
    pub key_bytes: [u8; 32],
}

/// The atomically-swapped active content key. Readers never block; a
/// rotation installs a new snapshot with a single `store` call.
pub struct ActiveContentKey {
    inner: ArcSwap<ContentKeyMaterial>,
}

impl ActiveContentKey {
    /// Start with `initial` installed as the active key.
    #[must_use]
    pub fn new(initial: ContentKeyMaterial) -> Self {
        Self {
            inner: ArcSwap::new(Arc::new(initial)),
        }
    }

    /// A cheap clone of the current snapshot.
    #[must_use]
    pub fn load(&self) -> Arc<ContentKeyMaterial> {
        self.inner.load_full()
    }

    /// Atomically install a new active key.
    pub fn store(&self, material: ContentKeyMaterial) {
        self.inner.store(Arc::new(material));
    }
}

const RETIRED_CACHE_CAPACITY: usize = 64;

/// A small LRU of unwrapped retired content keys, populated lazily on
/// first `DecryptContent` against a retired key id. Bounded per
/// `spec.md` §5: "eviction is bounded by LRU over retired keys only."
pub struct RetiredKeyCache {
    entries: Mutex<RetiredCacheInner>,
}

struct RetiredCacheInner {
    map: HashMap<Uuid, ContentKeyMaterial>,
    order: VecDeque<Uuid>,
}

impl Default for RetiredKeyCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RetiredKeyCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(RetiredCacheInner {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Look up a retired key's material, if cached.
    pub async fn get(&self, id: Uuid) -> Option<ContentKeyMaterial> {
        let mut guard = self.entries.lock().await;
        let found = guard.map.get(&id).cloned();
        if found.is_some() {
            guard.order.retain(|k| *k != id);
            guard.order.push_back(id);
        }
        found
    }

    /// Insert unwrapped material for a retired key, evicting the least
    /// recently used entry if at capacity.
    pub async fn insert(&self, material: ContentKeyMaterial) {
        let mut guard = self.entries.lock().await;
        let id = material.id;
        if !guard.map.contains_key(&id) && guard.map.len() >= RETIRED_CACHE_CAPACITY {
            if let Some(evict) = guard.order.pop_front() {
                guard.map.remove(&evict);
            }
        }
        guard.order.retain(|k| *k != id);
        guard.order.push_back(id);
        guard.map.insert(id, material);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_key_load_reflects_latest_store() {
        let id1 = Uuid::new_v4();
        let id2 = Uuid::new_v4();
        let active = ActiveContentKey::new(ContentKeyMaterial {
            id: id1,
            key_bytes: [1u8; 32],
        });
        assert_eq!(active.load().id, id1);
        active.store(ContentKeyMaterial {
            id: id2,
            key_bytes: [2u8; 32],
        });
        assert_eq!(active.load().id, id2);
    }

    #[tokio::test]
    async fn retired_cache_evicts_least_recently_used() {
        let cache = RetiredKeyCache::new();
        let mut ids = Vec::new();
        for _ in 0..RETIRED_CACHE_CAPACITY + 1 {
            let id = Uuid::new_v4();
            ids.push(id);
            cache
                .insert(ContentKeyMaterial {
                    id,
                    key_bytes: [0u8; 32],
                })
                .await;
        }
        assert!(cache.get(ids[0]).await.is_none());
        assert!(cache.get(*ids.last().unwrap()).await.is_some());
    }
}
