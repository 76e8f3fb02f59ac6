//! `SessionManager`: issuance, validation, touch, and revocation of browser
//! and service sessions, plus the interval-driven cleanup sweep.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use keystore::ElasticKeyManager;
use platform_common::TenantScope;
use store::model::{Session, SessionKind};
use store::{with_transaction, BarrierRepository, KeystoreRepository, LockKey, SessionRepository, Store};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use crate::claims::{Claims, ISSUER};
use crate::error::SessionError;
use crate::jose;
use crate::metrics;

/// The elastic key `kid` every tenant+realm pre-provisions for session JWS
/// signing, per `spec.md` §9's bootstrap-cycle resolution.
pub const SESSION_SIG_KID: &str = "session-sig";
/// The elastic key `kid` every tenant+realm pre-provisions for session JWE
/// encryption.
pub const SESSION_ENC_KID: &str = "session-enc";

/// Issues, validates, touches, and revokes sessions, and runs the periodic
/// cleanup sweep. Generic over the store backend, same shape as
/// [`ElasticKeyManager`] and `BarrierService`.
pub struct SessionManager<S: Store + SessionRepository + KeystoreRepository + BarrierRepository> {
    store: S,
    keystore: Arc<ElasticKeyManager<S>>,
    access_ttl: Duration,
    idle_ttl: Duration,
    grace: Duration,
}

impl<S: Store + SessionRepository + KeystoreRepository + BarrierRepository> SessionManager<S> {
    /// Build a manager over `store`, resolving session signing/encryption
    /// material through `keystore`. `access_ttl` bounds absolute expiry;
    /// `idle_ttl` is the sliding window `Touch` extends; `grace` is how long
    /// past expiry/revocation a row survives before cleanup deletes it.
    #[must_use]
    pub fn new(
        store: S,
        keystore: Arc<ElasticKeyManager<S>>,
        access_ttl: Duration,
        idle_ttl: Duration,
        grace: Duration,
    ) -> Self {
        Self {
            store,
            keystore,
            access_ttl,
            idle_ttl,
            grace,
        }
    }

    /// Issue a new session for `subject`, persisting a row and returning the
    /// compact JWE string handed back to the caller.
    #[instrument(skip(self, custom_claims))]
    pub async fn issue(
        &self,
        scope: TenantScope,
        kind: SessionKind,
        subject: &str,
        custom_claims: HashMap<String, serde_json::Value>,
        cancellation: CancellationToken,
    ) -> Result<String, SessionError> {
        let (sig_alg, sig_private, sig_kid) = self.keystore.unseal_active_material(scope, SESSION_SIG_KID).await?;
        let (enc_alg, enc_private, enc_kid) = self.keystore.unseal_active_material(scope, SESSION_ENC_KID).await?;

        let jti = Uuid::new_v4();
        let now = Utc::now();
        let claims = Claims::new(
            jti,
            scope,
            subject.to_string(),
            kind,
            self.access_ttl,
            custom_claims,
            now,
        );

        let inner_jws = jose::build_jws(sig_alg, &sig_kid, &sig_private, &claims)?;
        let outer_jwe = jose::build_jwe(enc_alg, &enc_kid, &enc_private, &inner_jws)?;

        let row = Session {
            id: jti,
            tenant_scope: scope,
            subject: subject.to_string(),
            kind,
            issued_at: now,
            expires_at: now + self.access_ttl,
            idle_expires_at: now + self.idle_ttl,
            revoked: false,
            revoked_at: None,
            sealed_claims: outer_jwe.clone(),
        };

        with_transaction(&self.store, LockKey::Tenant(scope), cancellation, |tx| {
            let store = &self.store;
            let row = row.clone();
            async move { store.insert_session(tx, row).await }
        })
        .await?;

        let kind_label = match kind {
            SessionKind::Browser => "browser",
            SessionKind::Service => "service",
        };
        metrics::SESSIONS_ISSUED_TOTAL.with_label_values(&[kind_label]).inc();

        Ok(outer_jwe)
    }

    /// Validate a compact session token, returning its claims on success.
    /// On success, best-effort extends `idle_expires_at`; a failure to
    /// persist that extension is logged but does not affect the outcome.
    #[instrument(skip(self, token))]
    pub async fn validate(&self, token: &str) -> Result<Claims, SessionError> {
        match self.validate_inner(token).await {
            Ok(claims) => {
                metrics::SESSIONS_VALIDATED_TOTAL.with_label_values(&["ok"]).inc();
                Ok(claims)
            }
            Err(e) => {
                let outcome = match &e {
                    SessionError::InvalidSession(_) | SessionError::Serialization(_) => "invalid",
                    SessionError::SessionRevoked => "revoked",
                    SessionError::SessionExpired => "expired",
                    SessionError::SessionIdle => "idle",
                    SessionError::KeyUnavailable(_) => "key_unavailable",
                    SessionError::Keystore(_) | SessionError::Storage(_) => "invalid",
                };
                metrics::SESSIONS_VALIDATED_TOTAL.with_label_values(&[outcome]).inc();
                Err(e)
            }
        }
    }

    async fn validate_inner(&self, token: &str) -> Result<Claims, SessionError> {
        let outer_kid = jose::peek_jwe_kid(token)?;
        let (scope, _enc_alg, enc_private) = self
            .keystore
            .unseal_material_by_kid(&outer_kid)
            .await
            .map_err(|e| SessionError::KeyUnavailable(e.to_string()))?;
        let inner_jws = jose::open_jwe(&enc_private, token)?;

        let inner_kid = jose::peek_jws_kid(&inner_jws)?;
        let (sig_scope, sig_alg, sig_private) = self
            .keystore
            .unseal_material_by_kid(&inner_kid)
            .await
            .map_err(|e| SessionError::KeyUnavailable(e.to_string()))?;
        if sig_scope != scope {
            return Err(SessionError::InvalidSession(
                "signing material scope does not match encryption material scope".to_string(),
            ));
        }

        let claims = jose::verify_jws(sig_alg, &sig_private, &inner_jws)?;
        if claims.scope() != scope {
            return Err(SessionError::InvalidSession("claims scope does not match key scope".to_string()));
        }

        let now = Utc::now();
        if claims.iss != ISSUER {
            return Err(SessionError::InvalidSession(format!("unexpected issuer {}", claims.iss)));
        }
        if claims.aud != scope.realm_id.to_string() {
            return Err(SessionError::InvalidSession("audience does not match realm".to_string()));
        }
        if now.timestamp() < claims.nbf {
            return Err(SessionError::InvalidSession("token not yet valid".to_string()));
        }
        if now.timestamp() >= claims.exp {
            return Err(SessionError::SessionExpired);
        }

        let session = self
            .store
            .get_session(claims.jti)
            .await?
            .ok_or_else(|| SessionError::InvalidSession(format!("no session row for {}", claims.jti)))?;
        if session.revoked {
            return Err(SessionError::SessionRevoked);
        }
        if now > session.idle_expires_at {
            return Err(SessionError::SessionIdle);
        }

        self.touch_best_effort(claims.jti, now).await;
        Ok(claims)
    }

    async fn touch_best_effort(&self, id: Uuid, now: DateTime<Utc>) {
        let Some(session) = self.store.get_session(id).await.ok().flatten() else {
            return;
        };
        let new_idle_expiry = std::cmp::min(session.expires_at, now + self.idle_ttl);
        let cancellation = CancellationToken::new();
        let result = with_transaction(&self.store, LockKey::Tenant(session.tenant_scope), cancellation, |tx| {
            let store = &self.store;
            async move { store.touch_session(tx, id, new_idle_expiry).await }
        })
        .await;
        if let Err(e) = result {
            tracing::warn!(error = %e, session_id = %id, "failed to extend session idle expiry");
        }
    }

    /// Revoke a session by id. Subsequent validations fail fast with
    /// `SessionRevoked`.
    #[instrument(skip(self))]
    pub async fn revoke(&self, scope: TenantScope, id: Uuid, cancellation: CancellationToken) -> Result<(), SessionError> {
        let now = Utc::now();
        with_transaction(&self.store, LockKey::Tenant(scope), cancellation, |tx| {
            let store = &self.store;
            async move { store.revoke_session(tx, id, now).await }
        })
        .await?;
        metrics::SESSIONS_REVOKED_TOTAL.inc();
        Ok(())
    }

    /// Run one cleanup pass: delete rows expired or revoked past the grace
    /// window. Returns the number of rows deleted.
    #[instrument(skip(self))]
    pub async fn cleanup_once(&self, cancellation: CancellationToken) -> Result<u64, SessionError> {
        let cutoff = Utc::now() - self.grace;
        let deleted = with_transaction(&self.store, LockKey::Global, cancellation, |tx| {
            let store = &self.store;
            async move { store.delete_expired(tx, cutoff).await }
        })
        .await?;
        Ok(deleted)
    }

    /// Run [`Self::cleanup_once`] on a `tokio::time::interval`, stopping when
    /// `cancellation` fires. Matches the `token-service` refresh-family
    /// TTL-sweep pattern: a plain interval loop, not a cron dependency.
    pub async fn run_cleanup_loop(&self, period: std::time::Duration, cancellation: CancellationToken) {
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.cleanup_once(cancellation.clone()).await {
                        Ok(deleted) if deleted > 0 => {
                            tracing::info!(deleted, "cleanup removed expired/revoked sessions");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "session cleanup pass failed"),
                    }
                }
                () = cancellation.cancelled() => break,
            }
        }
    }
}
