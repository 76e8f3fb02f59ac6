//! Errors raised by the barrier service.

use platform_common::ErrorKind;
use thiserror::Error;

/// Errors from bootstrap, encrypt/decrypt, or rotation.
#[derive(Error, Debug)]
pub enum BarrierError {
    /// The unseal KEK could not unwrap the active root at startup. Fatal —
    /// the service must not start, and must never auto-rotate to recover.
    #[error("unseal KEK does not match the active root key")]
    UnsealMismatch,

    /// No active chain exists at request time (should not occur once
    /// bootstrap has completed).
    #[error("barrier has no active key chain")]
    BarrierUnavailable,

    /// Ciphertext references a content-key id the repository no longer
    /// holds.
    #[error("content key {0} not found")]
    KeyNotFound(String),

    /// A cryptographic primitive (AEAD seal/open, key generation) failed.
    #[error("cryptographic failure: {0}")]
    Crypto(String),

    /// The repository surface returned an error.
    #[error("storage error: {0}")]
    Storage(#[from] store::StoreError),

    /// The ciphertext is structurally invalid (bad compact serialization).
    #[error("malformed ciphertext: {0}")]
    Malformed(String),
}

impl BarrierError {
    /// Classify this error per the shared taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsealMismatch => ErrorKind::UnsealMismatch,
            Self::BarrierUnavailable => ErrorKind::BarrierUnavailable,
            Self::KeyNotFound(_) | Self::Malformed(_) => ErrorKind::NotFound,
            Self::Crypto(_) => ErrorKind::CryptoFailure,
            Self::Storage(e) => e.kind(),
        }
    }
}

impl From<jwkgen::JwkGenError> for BarrierError {
    fn from(e: jwkgen::JwkGenError) -> Self {
        Self::Crypto(e.to_string())
    }
}
