//! The persistence contract every other crate depends on: per-table
//! repository traits, the transaction lifecycle, and an in-memory
//! implementation. A `postgres` feature module exists only to make the
//! trait boundary visible; it is not implemented, since database driver
//! selection is explicitly out of scope for the core.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod model;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod traits;
pub mod tx;

pub use error::StoreError;
pub use memory::{InMemoryStore, MemoryTx};
pub use traits::{
    with_transaction, AuditRepository, BarrierRepository, KeystoreRepository, SessionRepository,
    Store, TenantRepository,
};
pub use tx::{LockKey, TxHandle};
