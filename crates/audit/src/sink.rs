//! `AuditSink`: the interface boundary `spec.md` §6 describes audit
//! persistence at. Every auditable operation (`elastic_key.create`,
//! `material.rotate`, `material.invariant_violation`, ...) records through
//! this trait rather than writing `AuditLogEntry` rows directly, so the
//! recording policy (what gets audited, and where it goes) is swappable
//! independently of the operation that triggers it.

use async_trait::async_trait;
use chrono::Utc;
use platform_common::TenantScope;
use store::model::{AuditLogEntry, AuditOutcome};
use store::AuditRepository;
use tracing::instrument;
use uuid::Uuid;

use crate::error::AuditError;

/// Records one auditable event.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append an audit entry. `operation` is a dotted event name, e.g.
    /// `"material.rotate"`.
    async fn record(
        &self,
        scope: TenantScope,
        operation: &str,
        request_id: &str,
        actor: &str,
        subject_id: Option<&str>,
        outcome: AuditOutcome,
    ) -> Result<(), AuditError>;
}

/// Persists audit entries through the [`AuditRepository`] surface and
/// mirrors every entry to a `tracing` event at `info`, so audit records are
/// visible in both the structured log stream and the queryable log table.
pub struct RepositoryAuditSink<S: AuditRepository> {
    store: S,
}

impl<S: AuditRepository> RepositoryAuditSink<S> {
    /// Wrap a store implementing [`AuditRepository`].
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: AuditRepository> AuditSink for RepositoryAuditSink<S> {
    #[instrument(skip(self, subject_id))]
    async fn record(
        &self,
        scope: TenantScope,
        operation: &str,
        request_id: &str,
        actor: &str,
        subject_id: Option<&str>,
        outcome: AuditOutcome,
    ) -> Result<(), AuditError> {
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            tenant_scope: scope,
            operation: operation.to_string(),
            request_id: request_id.to_string(),
            actor: actor.to_string(),
            subject_id: subject_id.map(str::to_string),
            outcome,
            at: Utc::now(),
        };
        tracing::info!(
            operation = %entry.operation,
            tenant_scope = %scope,
            outcome = ?entry.outcome,
            "audit event recorded"
        );
        self.store.insert_audit_entry(entry).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::InMemoryStore;

    #[tokio::test]
    async fn records_an_entry_queryable_afterwards() {
        let scope = TenantScope::new(Uuid::new_v4(), Uuid::new_v4());
        let sink = RepositoryAuditSink::new(InMemoryStore::new());
        sink.record(scope, "elastic_key.create", "req-1", "system", None, AuditOutcome::Success)
            .await
            .unwrap();

        let entries = sink.store.list_audit_entries(scope).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, "elastic_key.create");
    }
}
