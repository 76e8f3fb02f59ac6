//! Private key material, kept only in memory (or sealed by the barrier) and
//! never serialized into a JWKS.

use crate::algorithm::Algorithm;
use crate::error::JwkGenError;
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use p256::ecdsa::SigningKey as P256SigningKey;
use p384::ecdsa::SigningKey as P384SigningKey;
use p521::ecdsa::SigningKey as P521SigningKey;
use pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::RsaPrivateKey;
use zeroize::ZeroizeOnDrop;

/// Private material for one generated key, tagged by the algorithm it was
/// generated for. `ZeroizeOnDrop` scrubs the raw bytes on drop; the barrier
/// is responsible for the ciphertext at rest, this type is only responsible
/// for the plaintext in memory.
#[derive(ZeroizeOnDrop)]
pub enum PrivateMaterial {
    /// PKCS#8 DER-encoded RSA private key.
    Rsa(Vec<u8>),
    /// Raw 32-byte P-256 scalar.
    EcP256([u8; 32]),
    /// Raw 48-byte P-384 scalar.
    EcP384([u8; 48]),
    /// Raw 66-byte P-521 scalar (top bytes zero-padded).
    EcP521([u8; 66]),
    /// Raw 32-byte Ed25519 seed.
    Ed25519([u8; 32]),
    /// Raw AES-GCM key, 16 or 32 bytes depending on algorithm.
    Symmetric(Vec<u8>),
}

impl PrivateMaterial {
    /// Serialize to a flat byte string for sealing by the barrier.
    /// The algorithm tag is stored alongside by the caller (`ElasticKey`/
    /// `MaterialKey` rows carry it); this only needs to round-trip the bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Rsa(der) => der.clone(),
            Self::EcP256(b) => b.to_vec(),
            Self::EcP384(b) => b.to_vec(),
            Self::EcP521(b) => b.to_vec(),
            Self::Ed25519(b) => b.to_vec(),
            Self::Symmetric(b) => b.clone(),
        }
    }

    /// Reconstruct from the bytes `to_bytes` produced, given the algorithm
    /// tag the caller stored alongside.
    pub fn from_bytes(alg: Algorithm, bytes: &[u8]) -> Result<Self, JwkGenError> {
        match alg {
            Algorithm::Rsa2048 | Algorithm::Rsa3072 | Algorithm::Rsa4096 => {
                Ok(Self::Rsa(bytes.to_vec()))
            }
            Algorithm::EcP256 => {
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| JwkGenError::Primitive("bad P-256 scalar length".into()))?;
                Ok(Self::EcP256(arr))
            }
            Algorithm::EcP384 => {
                let arr: [u8; 48] = bytes
                    .try_into()
                    .map_err(|_| JwkGenError::Primitive("bad P-384 scalar length".into()))?;
                Ok(Self::EcP384(arr))
            }
            Algorithm::EcP521 => {
                let arr: [u8; 66] = bytes
                    .try_into()
                    .map_err(|_| JwkGenError::Primitive("bad P-521 scalar length".into()))?;
                Ok(Self::EcP521(arr))
            }
            Algorithm::OkpEd25519 => {
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| JwkGenError::Primitive("bad Ed25519 seed length".into()))?;
                Ok(Self::Ed25519(arr))
            }
            Algorithm::SymmetricA128Gcm | Algorithm::SymmetricA256Gcm => {
                Ok(Self::Symmetric(bytes.to_vec()))
            }
        }
    }

    pub(crate) fn rsa_private_key(&self) -> Result<RsaPrivateKey, JwkGenError> {
        match self {
            Self::Rsa(der) => RsaPrivateKey::from_pkcs8_der(der)
                .map_err(|e| JwkGenError::Primitive(format!("RSA decode: {e}"))),
            _ => Err(JwkGenError::Primitive("not an RSA key".into())),
        }
    }

    pub(crate) fn p256_signing_key(&self) -> Result<P256SigningKey, JwkGenError> {
        match self {
            Self::EcP256(bytes) => P256SigningKey::from_bytes(bytes.into())
                .map_err(|e| JwkGenError::Primitive(format!("P-256 decode: {e}"))),
            _ => Err(JwkGenError::Primitive("not a P-256 key".into())),
        }
    }

    pub(crate) fn p384_signing_key(&self) -> Result<P384SigningKey, JwkGenError> {
        match self {
            Self::EcP384(bytes) => P384SigningKey::from_bytes(bytes.into())
                .map_err(|e| JwkGenError::Primitive(format!("P-384 decode: {e}"))),
            _ => Err(JwkGenError::Primitive("not a P-384 key".into())),
        }
    }

    pub(crate) fn p521_signing_key(&self) -> Result<P521SigningKey, JwkGenError> {
        match self {
            Self::EcP521(bytes) => P521SigningKey::from_bytes(bytes.into())
                .map_err(|e| JwkGenError::Primitive(format!("P-521 decode: {e}"))),
            _ => Err(JwkGenError::Primitive("not a P-521 key".into())),
        }
    }

    pub(crate) fn ed25519_signing_key(&self) -> Result<Ed25519SigningKey, JwkGenError> {
        match self {
            Self::Ed25519(bytes) => Ok(Ed25519SigningKey::from_bytes(bytes)),
            _ => Err(JwkGenError::Primitive("not an Ed25519 key".into())),
        }
    }

    pub(crate) fn symmetric_key(&self) -> Result<&[u8], JwkGenError> {
        match self {
            Self::Symmetric(bytes) => Ok(bytes),
            _ => Err(JwkGenError::Primitive("not a symmetric key".into())),
        }
    }
}

pub(crate) fn rsa_to_pkcs8_der(key: &RsaPrivateKey) -> Result<Vec<u8>, JwkGenError> {
    key.to_pkcs8_der()
        .map(|doc| doc.as_bytes().to_vec())
        .map_err(|e| JwkGenError::Primitive(format!("RSA encode: {e}")))
}
