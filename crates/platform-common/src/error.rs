//! The error-kind taxonomy shared across component boundaries.
//!
//! Every crate-local error enum (`BarrierError`, `KeystoreError`,
//! `SessionError`, `StoreError`, ...) implements `Into<ErrorKind>` so that the
//! single `kms-api` binary can map kinds to HTTP status without knowing the
//! internals of any one component. This mirrors the teacher's
//! `TokenError::is_retryable` / `From<TokenError> for Status` split, just with
//! the retryable bit folded into the kind itself where it matters.

use serde::{Deserialize, Serialize};

/// Distinct error kinds, not type names, per the propagation policy in
/// `spec.md` §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Input fails syntactic/semantic validation. Maps to 400, not retriable.
    Validation,
    /// Tenant/realm context missing from the request. Maps to 401.
    Unauthorized,
    /// No row matches the tenant-scoped query. Maps to 404.
    NotFound,
    /// An invariant would be violated. Maps to 409.
    Conflict,
    /// The unseal KEK could not unwrap the active root. Fatal at startup,
    /// never surfaced at request time.
    UnsealMismatch,
    /// No active barrier chain at request time. Maps to 503.
    BarrierUnavailable,
    /// A cryptographic primitive failed. Maps to 500, not retried internally.
    CryptoFailure,
    /// The repository surface returned an error. Maps to 500.
    Storage,
    /// Session is structurally or cryptographically invalid.
    InvalidSession,
    /// Session has been explicitly revoked.
    SessionRevoked,
    /// Session has passed its absolute expiry.
    SessionExpired,
    /// Session has passed its idle-timeout expiry.
    SessionIdle,
    /// The session key referenced by a token no longer exists.
    KeyUnavailable,
}

impl ErrorKind {
    /// Whether the caller (or the platform) might reasonably retry.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Storage | Self::BarrierUnavailable)
    }

    /// The HTTP status this kind maps onto, per `spec.md` §7.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Unauthorized => 401,
            Self::InvalidSession
            | Self::SessionRevoked
            | Self::SessionExpired
            | Self::SessionIdle
            | Self::KeyUnavailable => 401,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::BarrierUnavailable => 503,
            Self::CryptoFailure | Self::Storage | Self::UnsealMismatch => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_409() {
        assert_eq!(ErrorKind::Conflict.http_status(), 409);
    }

    #[test]
    fn storage_is_retryable_but_validation_is_not() {
        assert!(ErrorKind::Storage.is_retryable());
        assert!(!ErrorKind::Validation.is_retryable());
    }

    #[test]
    fn session_kinds_map_to_401() {
        for kind in [
            ErrorKind::InvalidSession,
            ErrorKind::SessionRevoked,
            ErrorKind::SessionExpired,
            ErrorKind::SessionIdle,
        ] {
            assert_eq!(kind.http_status(), 401);
        }
    }
}
