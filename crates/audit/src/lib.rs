//! Policy-gated recording of auditable key and session operations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod sink;

pub use error::AuditError;
pub use sink::{AuditSink, RepositoryAuditSink};
