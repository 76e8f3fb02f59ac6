//! Errors raised by [`crate::SessionManager`].

use platform_common::ErrorKind;
use thiserror::Error;

/// Errors from session issuance, validation, touch, and revocation.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The token is structurally, cryptographically, or semantically
    /// invalid: bad compact framing, signature failure, `iss`/`aud`
    /// mismatch, or a claims payload that doesn't parse.
    #[error("invalid session: {0}")]
    InvalidSession(String),

    /// The session has been explicitly revoked.
    #[error("session revoked")]
    SessionRevoked,

    /// The session has passed its absolute expiry.
    #[error("session expired")]
    SessionExpired,

    /// The session has passed its sliding idle-timeout expiry.
    #[error("session idle timeout")]
    SessionIdle,

    /// The signing or encryption material a token's header names no longer
    /// exists. Fatal for that token; the session can never be validated
    /// again.
    #[error("session key unavailable: {0}")]
    KeyUnavailable(String),

    /// The elastic keystore layer failed.
    #[error("keystore error: {0}")]
    Keystore(#[from] keystore::KeystoreError),

    /// The repository surface returned an error.
    #[error("storage error: {0}")]
    Storage(#[from] store::StoreError),

    /// Claims failed to serialize or deserialize.
    #[error("claims serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SessionError {
    /// Classify this error per the shared taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSession(_) => ErrorKind::InvalidSession,
            Self::SessionRevoked => ErrorKind::SessionRevoked,
            Self::SessionExpired => ErrorKind::SessionExpired,
            Self::SessionIdle => ErrorKind::SessionIdle,
            Self::KeyUnavailable(_) => ErrorKind::KeyUnavailable,
            Self::Keystore(e) => e.kind(),
            Self::Storage(e) => e.kind(),
            Self::Serialization(_) => ErrorKind::InvalidSession,
        }
    }
}

impl From<jwkgen::JwkGenError> for SessionError {
    fn from(e: jwkgen::JwkGenError) -> Self {
        Self::InvalidSession(e.to_string())
    }
}

impl From<barrier::BarrierError> for SessionError {
    fn from(e: barrier::BarrierError) -> Self {
        Self::Keystore(keystore::KeystoreError::Barrier(e))
    }
}
