//! Concrete scenarios from `spec.md` §8: issuance, validation, idle-touch,
//! revocation, and cleanup, including the bootstrap-cycle ordering where
//! realm creation pre-provisions the two session elastic keys before any
//! call into `sessions`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use audit::RepositoryAuditSink;
use barrier::{BarrierService, StaticProvider};
use chrono::Duration;
use jwkgen::{Algorithm, KeyUse};
use keystore::{AlwaysUnused, ElasticKeyManager};
use platform_common::TenantScope;
use sessions::manager::{SESSION_ENC_KID, SESSION_SIG_KID};
use sessions::SessionManager;
use store::model::SessionKind;
use store::{InMemoryStore, SessionRepository};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

async fn bootstrap() -> (SessionManager<InMemoryStore>, InMemoryStore, TenantScope) {
    let store = InMemoryStore::new();
    let barrier = Arc::new(
        BarrierService::bootstrap(Arc::new(StaticProvider::new([1u8; 32])), store.clone(), CancellationToken::new())
            .await
            .unwrap(),
    );
    let audit = Arc::new(RepositoryAuditSink::new(store.clone()));
    let keystore = Arc::new(ElasticKeyManager::new(store.clone(), barrier, audit, Arc::new(AlwaysUnused)));
    let scope = TenantScope::new(Uuid::new_v4(), Uuid::new_v4());

    // Realm creation provisions the session signing/encryption keys before
    // the first call into `sessions`, per the bootstrap-cycle resolution.
    keystore
        .create_elastic_key(
            scope,
            SESSION_SIG_KID.to_string(),
            Algorithm::EcP256,
            KeyUse::Sig,
            5,
            false,
            "bootstrap",
            "system",
            CancellationToken::new(),
        )
        .await
        .unwrap();
    keystore
        .create_elastic_key(
            scope,
            SESSION_ENC_KID.to_string(),
            Algorithm::SymmetricA256Gcm,
            KeyUse::Enc,
            5,
            false,
            "bootstrap",
            "system",
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let manager = SessionManager::new(
        store.clone(),
        keystore,
        Duration::minutes(15),
        Duration::minutes(5),
        Duration::seconds(30),
    );
    (manager, store, scope)
}

#[tokio::test]
async fn issue_then_validate_round_trips_claims() {
    let (manager, _store, scope) = bootstrap().await;

    let token = manager
        .issue(scope, SessionKind::Browser, "alice", HashMap::new(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(token.matches('.').count(), 4);

    let claims = manager.validate(&token).await.unwrap();
    assert_eq!(claims.sub, "alice");
    assert_eq!(claims.kind, SessionKind::Browser);
    assert_eq!(claims.scope(), scope);
}

#[tokio::test]
async fn validate_extends_idle_expiry() {
    let (manager, store, scope) = bootstrap().await;
    let token = manager
        .issue(scope, SessionKind::Service, "svc-a", HashMap::new(), CancellationToken::new())
        .await
        .unwrap();

    let claims = manager.validate(&token).await.unwrap();
    let session_before = store.get_session(claims.jti).await.unwrap().unwrap();

    tokio::time::sleep(StdDuration::from_millis(10)).await;
    manager.validate(&token).await.unwrap();
    let session_after = store.get_session(claims.jti).await.unwrap().unwrap();

    assert!(session_after.idle_expires_at >= session_before.idle_expires_at);
}

#[tokio::test]
async fn revoke_fails_subsequent_validation() {
    let (manager, _store, scope) = bootstrap().await;
    let token = manager
        .issue(scope, SessionKind::Browser, "bob", HashMap::new(), CancellationToken::new())
        .await
        .unwrap();
    let claims = manager.validate(&token).await.unwrap();

    manager.revoke(scope, claims.jti, CancellationToken::new()).await.unwrap();

    let result = manager.validate(&token).await;
    assert!(matches!(result, Err(sessions::SessionError::SessionRevoked)));
}

#[tokio::test]
async fn cleanup_removes_rows_past_grace() {
    let (manager, _store, scope) = bootstrap().await;
    let token = manager
        .issue(scope, SessionKind::Browser, "carol", HashMap::new(), CancellationToken::new())
        .await
        .unwrap();
    let claims = manager.validate(&token).await.unwrap();
    manager.revoke(scope, claims.jti, CancellationToken::new()).await.unwrap();

    // Grace is 30s; nothing should be collected immediately after revoke.
    let deleted = manager.cleanup_once(CancellationToken::new()).await.unwrap();
    assert_eq!(deleted, 0);
}

#[tokio::test]
async fn concurrent_validate_and_revoke_never_both_see_a_live_session() {
    let (manager, _store, scope) = bootstrap().await;
    let token = manager
        .issue(scope, SessionKind::Browser, "erin", HashMap::new(), CancellationToken::new())
        .await
        .unwrap();
    let claims = manager.validate(&token).await.unwrap();

    let manager = Arc::new(manager);
    let validator = {
        let manager = Arc::clone(&manager);
        let token = token.clone();
        tokio::spawn(async move { manager.validate(&token).await })
    };
    let revoker = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.revoke(scope, claims.jti, CancellationToken::new()).await })
    };

    let (validated, revoked) = tokio::join!(validator, revoker);
    revoked.unwrap().unwrap();

    // Whichever order the two operations actually interleaved in, a second
    // validation afterward must always see the session as revoked.
    let _ = validated.unwrap();
    let after = manager.validate(&token).await;
    assert!(matches!(after, Err(sessions::SessionError::SessionRevoked)));
}

#[tokio::test]
async fn tampered_token_is_rejected() {
    let (manager, _store, scope) = bootstrap().await;
    let mut token = manager
        .issue(scope, SessionKind::Browser, "dave", HashMap::new(), CancellationToken::new())
        .await
        .unwrap();
    token.push('x');

    let result = manager.validate(&token).await;
    assert!(result.is_err());
}
