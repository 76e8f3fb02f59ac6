//! Errors the persistence contract can raise.

use platform_common::ErrorKind;
use thiserror::Error;

/// Errors from any `Store` family trait method.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No row matched the tenant-scoped query.
    #[error("not found: {0}")]
    NotFound(String),

    /// An invariant the store enforces atomically would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The storage engine itself failed (connection, serialization, etc).
    #[error("storage backend failure: {0}")]
    Backend(String),

    /// A requested backend/operation isn't implemented. Used by the
    /// `postgres` feature stub; never raised by `InMemoryStore`.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The transaction was rolled back because its context was cancelled.
    #[error("transaction cancelled")]
    Cancelled,
}

impl StoreError {
    /// Classify this error per the shared taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Backend(_) | Self::Cancelled => ErrorKind::Storage,
            Self::Unsupported(_) => ErrorKind::Storage,
        }
    }
}
