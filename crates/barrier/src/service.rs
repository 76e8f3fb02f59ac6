//! `BarrierService`: the three-tier envelope and its bootstrap/rotation
//! operations.

use std::sync::Arc;

use chrono::Utc;
use jwkgen::aead;
use rand::RngCore;
use store::model::{BarrierContentKey, BarrierIntermediateKey, BarrierRootKey};
use store::{with_transaction, BarrierRepository, LockKey, Store};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use crate::error::BarrierError;
use crate::metrics;
use crate::snapshot::{ActiveContentKey, ContentKeyMaterial, RetiredKeyCache};
use crate::unseal::UnsealKeyProvider;
use crate::{format, format::SealedEnvelope};

fn generate_key32() -> [u8; 32] {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

fn wrap(key: &[u8; 32], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, BarrierError> {
    let sealed = aead::seal(key, aad, plaintext, &mut rand::rngs::OsRng)?;
    let mut blob = Vec::with_capacity(aead::NONCE_LEN + sealed.ciphertext.len());
    blob.extend_from_slice(&sealed.nonce);
    blob.extend_from_slice(&sealed.ciphertext);
    Ok(blob)
}

fn unwrap(key: &[u8; 32], aad: &[u8], blob: &[u8]) -> Result<[u8; 32], BarrierError> {
    if blob.len() < aead::NONCE_LEN {
        return Err(BarrierError::Malformed("wrapped material too short".to_string()));
    }
    let (nonce, ciphertext) = blob.split_at(aead::NONCE_LEN);
    let plaintext = aead::open(key, aad, nonce, ciphertext)?;
    plaintext
        .try_into()
        .map_err(|_| BarrierError::Malformed("unwrapped material is not 32 bytes".to_string()))
}

/// The three-tier envelope service. Generic over the store backend so
/// tests run it against [`store::InMemoryStore`] and production wiring
/// could run it against any other `Store` implementation without this
/// crate changing.
pub struct BarrierService<S: Store + BarrierRepository> {
    store: S,
    kek: zeroize::Zeroizing<[u8; 32]>,
    active_content: ActiveContentKey,
    retired_cache: RetiredKeyCache,
}

impl<S: Store + BarrierRepository> BarrierService<S> {
    /// Bootstrap the barrier: unseal an existing chain, or generate one
    /// fresh if this is the first startup. Per `spec.md` §4.1, a KEK that
    /// cannot unwrap the active root is fatal (`UnsealMismatch`) and is
    /// never treated as "first startup".
    #[instrument(skip(unseal, store))]
    pub async fn bootstrap(
        unseal: Arc<dyn UnsealKeyProvider>,
        store: S,
        cancellation: CancellationToken,
    ) -> Result<Self, BarrierError> {
        let kek = unseal.get_kek().await?;

        let active_root = store.get_active_root().await?;
        let content_material = match active_root {
            None => Self::bootstrap_fresh(&store, &kek, cancellation).await?,
            Some(root) => Self::unseal_existing(&store, &kek, &root, cancellation).await?,
        };

        let outcome = "success";
        metrics::BARRIER_UNSEAL_TOTAL.with_label_values(&[outcome]).inc();

        Ok(Self {
            store,
            kek: zeroize::Zeroizing::new(kek),
            active_content: ActiveContentKey::new(content_material),
            retired_cache: RetiredKeyCache::new(),
        })
    }

    async fn bootstrap_fresh(
        store: &S,
        kek: &[u8; 32],
        cancellation: CancellationToken,
    ) -> Result<ContentKeyMaterial, BarrierError> {
        let root_material = generate_key32();
        let intermediate_material = generate_key32();
        let content_material = generate_key32();

        let root_id = Uuid::new_v4();
        let intermediate_id = Uuid::new_v4();
        let content_id = Uuid::new_v4();
        let now = Utc::now();

        let kek_wrapped = wrap(kek, b"root", &root_material)?;
        let root_wrapped = wrap(&root_material, b"intermediate", &intermediate_material)?;
        let intermediate_wrapped = wrap(&intermediate_material, b"content", &content_material)?;

        with_transaction(store, LockKey::Barrier, cancellation, |tx| {
            async move {
                store
                    .insert_root(tx, BarrierRootKey {
                        id: root_id,
                        kek_wrapped_material: kek_wrapped,
                        created_at: now,
                        retired_at: None,
                        is_active: true,
                    })
                    .await?;
                store
                    .insert_intermediate(tx, BarrierIntermediateKey {
                        id: intermediate_id,
                        parent_root_id: root_id,
                        root_wrapped_material: root_wrapped,
                        created_at: now,
                        retired_at: None,
                        is_active: true,
                    })
                    .await?;
                store
                    .insert_content(tx, BarrierContentKey {
                        id: content_id,
                        parent_intermediate_id: intermediate_id,
                        intermediate_wrapped_material: intermediate_wrapped,
                        created_at: now,
                        retired_at: None,
                        is_active: true,
                    })
                    .await?;
                Ok(())
            }
        })
        .await?;

        Ok(ContentKeyMaterial {
            id: content_id,
            key_bytes: content_material,
        })
    }

    async fn unseal_existing(
        store: &S,
        kek: &[u8; 32],
        root: &BarrierRootKey,
        _cancellation: CancellationToken,
    ) -> Result<ContentKeyMaterial, BarrierError> {
        let root_material =
            unwrap(kek, b"root", &root.kek_wrapped_material).map_err(|_| BarrierError::UnsealMismatch)?;

        let intermediate = store
            .get_active_intermediate()
            .await?
            .ok_or(BarrierError::BarrierUnavailable)?;
        let intermediate_material = unwrap(
            &root_material,
            b"intermediate",
            &intermediate.root_wrapped_material,
        )?;

        let content = store
            .get_active_content()
            .await?
            .ok_or(BarrierError::BarrierUnavailable)?;
        let content_material = unwrap(
            &intermediate_material,
            b"content",
            &content.intermediate_wrapped_material,
        )?;

        Ok(ContentKeyMaterial {
            id: content.id,
            key_bytes: content_material,
        })
    }

    /// Encrypt `plaintext` under the currently active content key.
    #[instrument(skip(self, plaintext))]
    pub async fn encrypt_content(&self, plaintext: &[u8]) -> Result<String, BarrierError> {
        let active = self.active_content.load();
        let sealed = aead::seal(&active.key_bytes, active.id.as_bytes(), plaintext, &mut rand::rngs::OsRng)?;
        let compact = format::serialize(&SealedEnvelope {
            content_key_id: active.id,
            nonce: sealed.nonce,
            ciphertext: sealed.ciphertext,
        });
        metrics::BARRIER_ENCRYPT_TOTAL.inc();
        Ok(compact)
    }

    /// Decrypt a compact envelope produced by [`Self::encrypt_content`].
    /// Resolves the content key by the id in the header, unwrapping it
    /// lazily (and caching it) if it is not the currently active key.
    #[instrument(skip(self, ciphertext))]
    pub async fn decrypt_content(&self, ciphertext: &str) -> Result<Vec<u8>, BarrierError> {
        let envelope = format::parse(ciphertext)?;

        let active = self.active_content.load();
        let material = if envelope.content_key_id == active.id {
            (*active).clone()
        } else if let Some(cached) = self.retired_cache.get(envelope.content_key_id).await {
            cached
        } else {
            let content_row = self
                .store
                .get_content(envelope.content_key_id)
                .await?
                .ok_or_else(|| BarrierError::KeyNotFound(envelope.content_key_id.to_string()))?;
            let intermediate_row = self
                .store
                .get_intermediate(content_row.parent_intermediate_id)
                .await?
                .ok_or_else(|| BarrierError::KeyNotFound(content_row.parent_intermediate_id.to_string()))?;
            let root_row = self
                .store
                .get_root(intermediate_row.parent_root_id)
                .await?
                .ok_or_else(|| BarrierError::KeyNotFound(intermediate_row.parent_root_id.to_string()))?;

            let root_material = unwrap(&self.kek, b"root", &root_row.kek_wrapped_material)
                .map_err(|_| BarrierError::UnsealMismatch)?;
            let intermediate_material = unwrap(
                &root_material,
                b"intermediate",
                &intermediate_row.root_wrapped_material,
            )?;
            let content_material = unwrap(
                &intermediate_material,
                b"content",
                &content_row.intermediate_wrapped_material,
            )?;
            let material = ContentKeyMaterial {
                id: content_row.id,
                key_bytes: content_material,
            };
            self.retired_cache.insert(material.clone()).await;
            material
        };

        let plaintext = aead::open(
            &material.key_bytes,
            material.id.as_bytes(),
            &envelope.nonce,
            &envelope.ciphertext,
        )?;
        metrics::BARRIER_DECRYPT_TOTAL.inc();
        Ok(plaintext)
    }

    /// Rotate the content key under the currently active intermediate.
    #[instrument(skip(self))]
    pub async fn rotate_content(&self, cancellation: CancellationToken) -> Result<(), BarrierError> {
        let intermediate = self
            .store
            .get_active_intermediate()
            .await?
            .ok_or(BarrierError::BarrierUnavailable)?;
        let root = self
            .store
            .get_root(intermediate.parent_root_id)
            .await?
            .ok_or(BarrierError::BarrierUnavailable)?;
        let root_material =
            unwrap(&self.kek, b"root", &root.kek_wrapped_material).map_err(|_| BarrierError::UnsealMismatch)?;
        let intermediate_material =
            unwrap(&root_material, b"intermediate", &intermediate.root_wrapped_material)?;

        let new_material = with_transaction(&self.store, LockKey::Barrier, cancellation, |tx| {
            let store = &self.store;
            async move { Self::rotate_content_locked(store, tx, intermediate.id, intermediate_material).await }
        })
        .await?;

        self.active_content.store(new_material);
        metrics::BARRIER_ROTATE_TOTAL.with_label_values(&["content"]).inc();
        Ok(())
    }

    /// Rotate the intermediate key under the currently active root, then
    /// rotate the content key under the new intermediate, all in one
    /// transaction.
    #[instrument(skip(self))]
    pub async fn rotate_intermediate(&self, cancellation: CancellationToken) -> Result<(), BarrierError> {
        let root = self
            .store
            .get_active_root()
            .await?
            .ok_or(BarrierError::BarrierUnavailable)?;
        let root_material =
            unwrap(&self.kek, b"root", &root.kek_wrapped_material).map_err(|_| BarrierError::UnsealMismatch)?;

        let new_content_material = with_transaction(&self.store, LockKey::Barrier, cancellation, |tx| {
            let store = &self.store;
            async move {
                let (new_intermediate_id, new_intermediate_material) =
                    Self::rotate_intermediate_locked(store, tx, root.id, root_material).await?;
                Self::rotate_content_locked(store, tx, new_intermediate_id, new_intermediate_material).await
            }
        })
        .await?;

        self.active_content.store(new_content_material);
        metrics::BARRIER_ROTATE_TOTAL.with_label_values(&["intermediate"]).inc();
        Ok(())
    }

    /// Rotate the root key under the current KEK, cascading through
    /// intermediate and content rotation, all in one transaction.
    #[instrument(skip(self))]
    pub async fn rotate_root(&self, cancellation: CancellationToken) -> Result<(), BarrierError> {
        let kek = *self.kek;
        let new_content_material = with_transaction(&self.store, LockKey::Barrier, cancellation, |tx| {
            let store = &self.store;
            async move {
                let (new_root_id, new_root_material) = Self::rotate_root_locked(store, tx, &kek).await?;
                let (new_intermediate_id, new_intermediate_material) =
                    Self::rotate_intermediate_locked(store, tx, new_root_id, new_root_material).await?;
                Self::rotate_content_locked(store, tx, new_intermediate_id, new_intermediate_material).await
            }
        })
        .await?;

        self.active_content.store(new_content_material);
        metrics::BARRIER_ROTATE_TOTAL.with_label_values(&["root"]).inc();
        Ok(())
    }

    async fn rotate_root_locked(
        store: &S,
        tx: &mut S::Tx,
        kek: &[u8; 32],
    ) -> Result<(Uuid, [u8; 32]), BarrierError> {
        let previous = store.get_active_root().await?;
        let new_material = generate_key32();
        let new_id = Uuid::new_v4();
        let wrapped = wrap(kek, b"root", &new_material)?;
        store
            .insert_root(tx, BarrierRootKey {
                id: new_id,
                kek_wrapped_material: wrapped,
                created_at: Utc::now(),
                retired_at: None,
                is_active: true,
            })
            .await?;
        if let Some(previous) = previous {
            store.retire_root(tx, previous.id, Utc::now()).await?;
        }
        Ok((new_id, new_material))
    }

    async fn rotate_intermediate_locked(
        store: &S,
        tx: &mut S::Tx,
        parent_root_id: Uuid,
        root_material: [u8; 32],
    ) -> Result<(Uuid, [u8; 32]), BarrierError> {
        let previous = store.get_active_intermediate().await?;
        let new_material = generate_key32();
        let new_id = Uuid::new_v4();
        let wrapped = wrap(&root_material, b"intermediate", &new_material)?;
        store
            .insert_intermediate(tx, BarrierIntermediateKey {
                id: new_id,
                parent_root_id,
                root_wrapped_material: wrapped,
                created_at: Utc::now(),
                retired_at: None,
                is_active: true,
            })
            .await?;
        if let Some(previous) = previous {
            store.retire_intermediate(tx, previous.id, Utc::now()).await?;
        }
        Ok((new_id, new_material))
    }

    /// Wrap a fresh content key under `intermediate_material`, recording
    /// `parent_intermediate_id` as the new row's parent. The caller must
    /// pass the id of the intermediate `intermediate_material` actually
    /// unwraps under — never inherited from the row being retired, since
    /// a rotation one level up means the new content key is wrapped under
    /// a different intermediate than its predecessor was.
    async fn rotate_content_locked(
        store: &S,
        tx: &mut S::Tx,
        parent_intermediate_id: Uuid,
        intermediate_material: [u8; 32],
    ) -> Result<ContentKeyMaterial, BarrierError> {
        let previous = store.get_active_content().await?;
        let new_material = generate_key32();
        let new_id = Uuid::new_v4();
        let wrapped = wrap(&intermediate_material, b"content", &new_material)?;
        store
            .insert_content(tx, BarrierContentKey {
                id: new_id,
                parent_intermediate_id,
                intermediate_wrapped_material: wrapped,
                created_at: Utc::now(),
                retired_at: None,
                is_active: true,
            })
            .await?;
        if let Some(previous) = previous {
            store.retire_content(tx, previous.id, Utc::now()).await?;
        }
        Ok(ContentKeyMaterial {
            id: new_id,
            key_bytes: new_material,
        })
    }
}
