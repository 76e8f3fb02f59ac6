//! [`keystore::usage::MaterialUsageChecker`] backed by the session table —
//! the concrete implementation the seam in `keystore::usage` was built for.
//! Wiring this in (instead of `AlwaysUnused`) lets `DeleteElasticKey` refuse
//! when a live session still references the key's material.

use async_trait::async_trait;
use chrono::Utc;
use keystore::usage::MaterialUsageChecker;
use keystore::{ElasticKeyManager, KeystoreError};
use platform_common::TenantScope;
use store::model::Session;
use store::{BarrierRepository, KeystoreRepository, SessionRepository, Store};
use std::sync::Arc;

use crate::jose;

/// Scans live (non-revoked, non-expired) sessions in scope, decrypting far
/// enough to check both the outer encryption material's kid and the inner
/// signing material's kid a session references.
pub struct SessionUsageChecker<S: Store + SessionRepository + KeystoreRepository + BarrierRepository> {
    store: S,
    keystore: Arc<ElasticKeyManager<S>>,
}

impl<S: Store + SessionRepository + KeystoreRepository + BarrierRepository> SessionUsageChecker<S> {
    /// Build a checker over `store`'s session table, resolving referenced
    /// material through `keystore`.
    #[must_use]
    pub fn new(store: S, keystore: Arc<ElasticKeyManager<S>>) -> Self {
        Self { store, keystore }
    }

    fn is_live(session: &Session, now: chrono::DateTime<Utc>) -> bool {
        !session.revoked && session.expires_at > now
    }

    async fn references_any(
        &self,
        scope: TenantScope,
        session: &Session,
        material_kids: &[String],
    ) -> Result<bool, KeystoreError> {
        let outer_kid = match jose::peek_jwe_kid(&session.sealed_claims) {
            Ok(kid) => kid,
            Err(_) => return Ok(false),
        };
        if material_kids.iter().any(|kid| kid == &outer_kid) {
            return Ok(true);
        }

        let (resolved_scope, _, enc_private) = self.keystore.unseal_material_by_kid(&outer_kid).await?;
        if resolved_scope != scope {
            return Ok(false);
        }
        let Ok(inner_jws) = jose::open_jwe(&enc_private, &session.sealed_claims) else {
            return Ok(false);
        };
        let Ok(inner_kid) = jose::peek_jws_kid(&inner_jws) else {
            return Ok(false);
        };
        Ok(material_kids.iter().any(|kid| kid == &inner_kid))
    }
}

#[async_trait]
impl<S: Store + SessionRepository + KeystoreRepository + BarrierRepository> MaterialUsageChecker
    for SessionUsageChecker<S>
{
    async fn any_in_use(&self, scope: TenantScope, material_kids: &[String]) -> Result<bool, KeystoreError> {
        if material_kids.is_empty() {
            return Ok(false);
        }
        let now = Utc::now();
        let sessions = self.store.list_sessions(scope).await?;
        for session in sessions.iter().filter(|s| Self::is_live(s, now)) {
            if self.references_any(scope, session, material_kids).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
