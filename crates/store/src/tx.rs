//! The transaction handle threaded explicitly through every repository
//! write method, per `spec.md` §9's resolution of the ambient-transaction
//! source pattern: "explicit context passing with a transaction handle
//! field ... passed as the first parameter to every repository method."

use platform_common::TenantScope;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;

/// The granularity at which a transaction acquires its writer lock.
/// Barrier rotation excludes all other barrier writers; elastic-key and
/// session writes exclude only same-scope writers, matching the advisory
/// writer lock keyed by `(table, tenant_scope)` from `spec.md` §5.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockKey {
    /// The barrier tables have no tenant scope; one lock serializes all
    /// root/intermediate/content rotation.
    Barrier,
    /// Elastic-key, material, and session writes within one tenant+realm.
    Tenant(TenantScope),
    /// Cross-tenant maintenance sweeps (session cleanup) that touch rows
    /// outside any single tenant's writer lock.
    Global,
}

/// Shared behavior every backend's transaction handle exposes, independent
/// of how that backend implements locking or rollback.
pub trait TxHandle: Send {
    /// The lock key this transaction was opened under.
    fn lock_key(&self) -> &LockKey;

    /// The cancellation context this transaction inherits from its caller.
    fn cancellation(&self) -> &CancellationToken;

    /// Returns `Err(StoreError::Cancelled)` if the inherited context has
    /// been cancelled. Repository write methods call this before mutating.
    fn check_cancelled(&self) -> Result<(), StoreError> {
        if self.cancellation().is_cancelled() {
            Err(StoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}
