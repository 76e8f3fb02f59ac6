//! kms-api library.
//!
//! Thin `axum` binary wiring the barrier, keystore, and session subsystems
//! together behind an HTTP surface. Split into a library so integration
//! tests can build a router directly, the way `token-service`'s own
//! `tests/` exercise `token_service::lib` rather than spawning the binary.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use state::{AppState, Shared};
