//! Errors raised by [`crate::ElasticKeyManager`].

use platform_common::ErrorKind;
use thiserror::Error;

/// Errors from elastic key and material lifecycle operations.
#[derive(Error, Debug)]
pub enum KeystoreError {
    /// The request fails syntactic/semantic validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No elastic key or material matches the tenant-scoped query.
    #[error("{0} not found")]
    NotFound(String),

    /// `current_material_count == max_materials`; no room for another.
    #[error("elastic key {0} has reached its material cap")]
    MaxMaterialsReached(String),

    /// Deletion was refused because an active session references this key.
    #[error("elastic key {0} is in use")]
    InUse(String),

    /// `RetireMaterial` was refused because no other material is active.
    #[error("elastic key {0} has no other active material to retire into")]
    NoActiveMaterial(String),

    /// The barrier failed to seal or unseal material.
    #[error("barrier error: {0}")]
    Barrier(#[from] barrier::BarrierError),

    /// The repository surface returned an error.
    #[error("storage error: {0}")]
    Storage(#[from] store::StoreError),
}

impl KeystoreError {
    /// Classify this error per the shared taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::MaxMaterialsReached(_) | Self::InUse(_) | Self::NoActiveMaterial(_) => {
                ErrorKind::Conflict
            }
            Self::Barrier(e) => e.kind(),
            Self::Storage(e) => e.kind(),
        }
    }
}

impl From<jwkgen::JwkGenError> for KeystoreError {
    fn from(e: jwkgen::JwkGenError) -> Self {
        Self::Barrier(e.into())
    }
}
