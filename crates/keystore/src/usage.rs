//! The seam `Delete`'s `InUse` check runs through. Kept separate from
//! [`crate::ElasticKeyManager`] because answering "is any material of this
//! key still referenced by a live session" requires parsing session
//! ciphertext headers — the `sessions` crate's concern, not this one's.
//! `sessions` depends on `keystore` (to resolve signing/encryption
//! materials), so this crate cannot depend back on `sessions` without a
//! cycle; a checker is injected instead.

use async_trait::async_trait;
use platform_common::TenantScope;

use crate::error::KeystoreError;

/// Answers whether any of `material_kids` is still referenced by a live
/// session, for [`crate::ElasticKeyManager::delete_elastic_key`]'s `InUse`
/// check.
#[async_trait]
pub trait MaterialUsageChecker: Send + Sync {
    /// `true` if at least one live session was issued or encrypted with one
    /// of `material_kids`.
    async fn any_in_use(
        &self,
        scope: TenantScope,
        material_kids: &[String],
    ) -> Result<bool, KeystoreError>;
}

/// The default checker when no `sessions`-backed implementation is wired:
/// reports nothing in use. Deletion is then gated only by the barrier and
/// repository invariants, which is correct for deployments that never
/// issue sessions against the deleted key's materials (e.g. pure `enc`-use
/// keys, or test setups).
pub struct AlwaysUnused;

#[async_trait]
impl MaterialUsageChecker for AlwaysUnused {
    async fn any_in_use(
        &self,
        _scope: TenantScope,
        _material_kids: &[String],
    ) -> Result<bool, KeystoreError> {
        Ok(false)
    }
}
