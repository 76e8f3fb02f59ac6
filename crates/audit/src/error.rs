//! Errors raised while recording an audit entry.

use platform_common::ErrorKind;
use thiserror::Error;

/// Errors from [`crate::AuditSink::record`].
#[derive(Error, Debug)]
pub enum AuditError {
    /// The repository surface returned an error while appending the entry.
    #[error("storage error: {0}")]
    Storage(#[from] store::StoreError),
}

impl AuditError {
    /// Classify this error per the shared taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage(e) => e.kind(),
        }
    }
}
