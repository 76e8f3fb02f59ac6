//! Row types for every table the persistence contract exposes. Field names
//! follow `spec.md` §3 directly; nothing here is storage-engine-specific.

use chrono::{DateTime, Utc};
use platform_common::TenantScope;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant. Carries no `TenantScope` of its own — it is the scope root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    /// Primary key.
    pub id: Uuid,
    /// Display name; opaque to the core beyond presentation.
    pub name: String,
    /// Whether unauthenticated JWKS reads are permitted for this tenant.
    pub public_discovery: bool,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

/// A realm, belonging to exactly one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Realm {
    /// Primary key.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: Uuid,
    /// Display name.
    pub name: String,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

/// The root tier of the barrier. Stored encrypted under the unseal KEK,
/// not under any other barrier row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarrierRootKey {
    /// Primary key.
    pub id: Uuid,
    /// Ciphertext of the root key material, wrapped under the unseal KEK.
    pub kek_wrapped_material: Vec<u8>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Set when this row is retired; retained for decrypting older
    /// intermediates that still reference it.
    pub retired_at: Option<DateTime<Utc>>,
    /// Exactly one root row has this set at any time.
    pub is_active: bool,
}

/// The intermediate tier, wrapped by some root key (not necessarily active).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarrierIntermediateKey {
    /// Primary key.
    pub id: Uuid,
    /// The root key that wraps `root_wrapped_material`.
    pub parent_root_id: Uuid,
    /// Ciphertext of the intermediate key material.
    pub root_wrapped_material: Vec<u8>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Set when this row is retired.
    pub retired_at: Option<DateTime<Utc>>,
    /// Exactly one intermediate row has this set at any time.
    pub is_active: bool,
}

/// The content tier; the key material `EncryptContent`/`DecryptContent`
/// actually uses, wrapped by some intermediate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarrierContentKey {
    /// Primary key.
    pub id: Uuid,
    /// The intermediate key that wraps `intermediate_wrapped_material`.
    pub parent_intermediate_id: Uuid,
    /// Ciphertext of the content key material.
    pub intermediate_wrapped_material: Vec<u8>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Set when this row is retired.
    pub retired_at: Option<DateTime<Utc>>,
    /// Exactly one content row has this set at any time.
    pub is_active: bool,
}

/// The JOSE `use` an elastic key serves — the same enum `jwkgen` validates
/// algorithm compatibility against, so a row's `key_use` and its
/// `algorithm`'s natural use are always the same type.
pub use jwkgen::KeyUse;

/// A long-lived logical key whose material is rotated over time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticKey {
    /// Primary key.
    pub id: Uuid,
    /// Owning tenant+realm.
    pub tenant_scope: TenantScope,
    /// External identifier; unique within `tenant_scope`.
    pub kid: String,
    /// Wire-format algorithm string, e.g. `"RSA/2048"`.
    pub algorithm: String,
    /// `sig` or `enc`.
    pub key_use: KeyUse,
    /// Upper bound on concurrently stored materials, `>= 1`.
    pub max_materials: u32,
    /// Mirrors `materials(self).len()`; maintained atomically by the store.
    pub current_material_count: u32,
    /// Whether unauthenticated discovery exposes this key's active material.
    pub public_discovery: bool,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

/// One concrete JWK belonging to an elastic key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialKey {
    /// Primary key.
    pub id: Uuid,
    /// Owning elastic key.
    pub elastic_key_id: Uuid,
    /// Globally unique external identifier.
    pub material_kid: String,
    /// Output of `BarrierService::encrypt_content`; plaintext never persists.
    pub sealed_material: Vec<u8>,
    /// At most one material per elastic key has this set.
    pub is_active: bool,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Set when superseded by a rotation.
    pub retired_at: Option<DateTime<Utc>>,
}

/// Browser or service session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionKind {
    /// A browser-facing session.
    Browser,
    /// A service-to-service session.
    Service,
}

/// A persisted session row backing revocation and idle tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Primary key; also the JWS `jti` claim.
    pub id: Uuid,
    /// Owning tenant+realm.
    pub tenant_scope: TenantScope,
    /// The authenticated principal.
    pub subject: String,
    /// Browser or service.
    pub kind: SessionKind,
    /// Issuance time.
    pub issued_at: DateTime<Utc>,
    /// Absolute expiry; never extended.
    pub expires_at: DateTime<Utc>,
    /// Sliding idle-expiry, extended by `Touch`.
    pub idle_expires_at: DateTime<Utc>,
    /// Set by `Revoke`.
    pub revoked: bool,
    /// When `Revoke` ran; `None` while `revoked` is `false`. Cleanup's grace
    /// window for revoked rows is measured from this, not `expires_at`.
    pub revoked_at: Option<DateTime<Utc>>,
    /// The compact JWE string handed back to the caller at issuance.
    pub sealed_claims: String,
}

/// Outcome of an auditable operation, for `AuditLogEntry::outcome`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    /// The operation completed as requested.
    Success,
    /// The operation was refused or failed.
    Failure,
}

/// An append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Primary key.
    pub id: Uuid,
    /// Owning tenant+realm.
    pub tenant_scope: TenantScope,
    /// Dotted operation name, e.g. `"material.rotate"`.
    pub operation: String,
    /// Correlates this entry to the request that produced it.
    pub request_id: String,
    /// Who performed the operation.
    pub actor: String,
    /// The subject the operation concerns, if any.
    pub subject_id: Option<String>,
    /// Success or failure.
    pub outcome: AuditOutcome,
    /// When the entry was recorded.
    pub at: DateTime<Utc>,
}
