//! The inner JWS payload: the claim set a session's compact JWE decrypts
//! and verifies down to.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use platform_common::TenantScope;
use serde::{Deserialize, Serialize};
use store::model::SessionKind;
use uuid::Uuid;

/// Issuer string stamped into every claim set and checked on validation.
pub const ISSUER: &str = "jose-kms-control-plane";

/// The inner JWS payload, grounded on the registered-claim set a JWT carries
/// plus the tenant/realm/kind fields this control plane needs to resolve a
/// session row without a second round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Session id; also the persisted row's primary key.
    pub jti: Uuid,
    /// The authenticated principal.
    pub sub: String,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Not-before, seconds since the epoch. Equal to `iat` at issuance.
    pub nbf: i64,
    /// Absolute expiry, seconds since the epoch.
    pub exp: i64,
    /// Issuer; must equal [`ISSUER`] on validation.
    pub iss: String,
    /// Audience; the realm id as a string.
    pub aud: String,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Owning realm.
    pub realm_id: Uuid,
    /// Browser or service session.
    pub kind: SessionKind,
    /// Caller-supplied claims, flattened into the top-level JSON object.
    #[serde(flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}

impl Claims {
    /// Build a fresh claim set for a session issued now, expiring after
    /// `ttl`.
    #[must_use]
    pub fn new(
        jti: Uuid,
        scope: TenantScope,
        subject: String,
        kind: SessionKind,
        ttl: chrono::Duration,
        custom: HashMap<String, serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            jti,
            sub: subject,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: ISSUER.to_string(),
            aud: scope.realm_id.to_string(),
            tenant_id: scope.tenant_id,
            realm_id: scope.realm_id,
            kind,
            custom,
        }
    }

    /// The scope this claim set belongs to.
    #[must_use]
    pub fn scope(&self) -> TenantScope {
        TenantScope::new(self.tenant_id, self.realm_id)
    }
}
