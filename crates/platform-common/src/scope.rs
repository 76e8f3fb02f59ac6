//! Tenant scoping.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// `(tenant_id, realm_id)` — the pair every persisted entity except the
/// barrier root-key table carries, and every query is filtered by.
///
/// A realm belongs to exactly one tenant; the pair, not the realm id alone,
/// is the unit of isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantScope {
    /// Tenant identifier.
    pub tenant_id: Uuid,
    /// Realm identifier, unique within the tenant.
    pub realm_id: Uuid,
}

impl TenantScope {
    /// Construct a scope from its two components.
    #[must_use]
    pub const fn new(tenant_id: Uuid, realm_id: Uuid) -> Self {
        Self {
            tenant_id,
            realm_id,
        }
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.realm_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_with_same_ids_are_equal() {
        let t = Uuid::new_v4();
        let r = Uuid::new_v4();
        assert_eq!(TenantScope::new(t, r), TenantScope::new(t, r));
    }

    #[test]
    fn scopes_with_different_realms_are_distinct() {
        let t = Uuid::new_v4();
        assert_ne!(
            TenantScope::new(t, Uuid::new_v4()),
            TenantScope::new(t, Uuid::new_v4())
        );
    }
}
