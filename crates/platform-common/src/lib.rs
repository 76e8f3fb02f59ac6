//! Cross-cutting concerns shared by every crate in the control plane.
//!
//! Provides the error-kind taxonomy every component error enum maps onto, a
//! `tracing` bootstrap helper, and the `TenantScope` identifier every
//! persisted row (bar the barrier tables) is partitioned by.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod scope;
pub mod tracing_config;

pub use error::ErrorKind;
pub use scope::TenantScope;
pub use tracing_config::{init_tracing, TracingConfig};
