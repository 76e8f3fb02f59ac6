//! Errors raised by key generation, signing, and AEAD sealing.

use platform_common::ErrorKind;
use thiserror::Error;

/// Errors the pure generator/primitive layer can raise.
#[derive(Error, Debug)]
pub enum JwkGenError {
    /// The requested algorithm string does not name a supported algorithm.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The requested `use` is not compatible with the algorithm's family.
    #[error("use {requested:?} is incompatible with algorithm {algorithm}")]
    IncompatibleUse {
        /// The `use` that was requested.
        requested: String,
        /// The algorithm it was requested for.
        algorithm: String,
    },

    /// A cryptographic primitive (keygen, sign, verify, AEAD) failed.
    #[error("cryptographic primitive failed: {0}")]
    Primitive(String),
}

impl JwkGenError {
    /// Classify this error per the shared taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedAlgorithm(_) | Self::IncompatibleUse { .. } => ErrorKind::Validation,
            Self::Primitive(_) => ErrorKind::CryptoFailure,
        }
    }
}
