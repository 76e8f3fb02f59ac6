//! Pure key generation, JWK projection, signing, and AEAD sealing for the
//! closed JOSE algorithm set. This crate has no notion of tenants, storage,
//! or the barrier; it only deals with bytes and algorithms.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aead;
pub mod algorithm;
pub mod error;
pub mod generate;
pub mod jwk;
pub mod material;
pub mod sign;

pub use aead::{open, open_with_material, seal, seal_with_material, Sealed};
pub use algorithm::{Algorithm, KeyUse};
pub use error::JwkGenError;
pub use generate::{generate, GeneratedKey};
pub use jwk::{public_jwk, Jwk, JwkSet};
pub use material::PrivateMaterial;
pub use sign::{sign, verify};
