//! Elastic key and material key lifecycle, plus the JWKS projection.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod manager;
pub mod usage;

pub use error::KeystoreError;
pub use manager::ElasticKeyManager;
pub use usage::{AlwaysUnused, MaterialUsageChecker};
