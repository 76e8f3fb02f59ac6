//! Stubbed PostgreSQL backend. Database driver selection is explicitly out
//! of scope for the core (`spec.md` §1); this module exists only so the
//! `Store` trait boundary has a second, non-memory implementation visible
//! in the workspace, matching the teacher's `KmsProvider::Aws` /
//! `KmsProvider::Mock` split where the real backend is a deployment choice
//! the core itself doesn't implement.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::traits::Store;
use crate::tx::{LockKey, TxHandle};

/// Connection configuration for the (unimplemented) PostgreSQL backend.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// `postgres://` connection string.
    pub connection_string: String,
}

/// A `Store` implementation backed by PostgreSQL. Every method returns
/// [`StoreError::Unsupported`]; wiring a real connection pool and schema is
/// deliberately left to a migration runner outside this core, per
/// `spec.md` §6.
pub struct PostgresStore {
    #[allow(dead_code)]
    config: PostgresConfig,
}

impl PostgresStore {
    /// Construct a handle. Does not open a connection; every operation
    /// fails until this backend is implemented.
    #[must_use]
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }
}

/// Transaction handle for [`PostgresStore`]. Never constructed.
pub struct PostgresTx {
    lock_key: LockKey,
    cancellation: CancellationToken,
}

impl TxHandle for PostgresTx {
    fn lock_key(&self) -> &LockKey {
        &self.lock_key
    }

    fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

#[async_trait]
impl Store for PostgresStore {
    type Tx = PostgresTx;

    async fn begin(
        &self,
        _lock_key: LockKey,
        _cancellation: CancellationToken,
    ) -> Result<Self::Tx, StoreError> {
        Err(StoreError::Unsupported(
            "postgres backend is not implemented; database driver selection is out of scope"
                .to_string(),
        ))
    }

    async fn commit(&self, _tx: Self::Tx) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("postgres backend is not implemented".to_string()))
    }

    async fn rollback(&self, _tx: Self::Tx) {}
}
