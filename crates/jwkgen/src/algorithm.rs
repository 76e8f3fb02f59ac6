//! The closed algorithm set `spec.md` §4.2 validates `CreateElasticKey`
//! against: RSA/{2048,3072,4096}, EC/{P256,P384,P521}, OKP/Ed25519, and a
//! symmetric variant for `enc`.

use crate::error::JwkGenError;
use serde::{Deserialize, Serialize};

/// Whether a material is used for signing/verification or for encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyUse {
    /// Signature (JWS).
    Sig,
    /// Encryption (JWE).
    Enc,
}

impl KeyUse {
    /// The JWK `use` string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sig => "sig",
            Self::Enc => "enc",
        }
    }
}

/// One algorithm from the supported set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// RSA, 2048-bit modulus, signed RS256.
    Rsa2048,
    /// RSA, 3072-bit modulus, signed RS256.
    Rsa3072,
    /// RSA, 4096-bit modulus, signed RS256.
    Rsa4096,
    /// NIST P-256, signed ES256.
    EcP256,
    /// NIST P-384, signed ES384.
    EcP384,
    /// NIST P-521, signed ES512.
    EcP521,
    /// Ed25519 (OKP), signed EdDSA.
    OkpEd25519,
    /// 128-bit AES-GCM content-encryption key.
    SymmetricA128Gcm,
    /// 256-bit AES-GCM content-encryption key.
    SymmetricA256Gcm,
}

impl Algorithm {
    /// All algorithms this generator supports, for validation and tests.
    #[must_use]
    pub const fn supported() -> &'static [Self] {
        &[
            Self::Rsa2048,
            Self::Rsa3072,
            Self::Rsa4096,
            Self::EcP256,
            Self::EcP384,
            Self::EcP521,
            Self::OkpEd25519,
            Self::SymmetricA128Gcm,
            Self::SymmetricA256Gcm,
        ]
    }

    /// Parse the wire/API representation, e.g. `"RSA/2048"`, `"EC/P384"`,
    /// `"OKP/Ed25519"`, `"oct/A256GCM"`.
    pub fn parse(s: &str) -> Result<Self, JwkGenError> {
        match s {
            "RSA/2048" => Ok(Self::Rsa2048),
            "RSA/3072" => Ok(Self::Rsa3072),
            "RSA/4096" => Ok(Self::Rsa4096),
            "EC/P256" => Ok(Self::EcP256),
            "EC/P384" => Ok(Self::EcP384),
            "EC/P521" => Ok(Self::EcP521),
            "OKP/Ed25519" => Ok(Self::OkpEd25519),
            "oct/A128GCM" => Ok(Self::SymmetricA128Gcm),
            "oct/A256GCM" => Ok(Self::SymmetricA256Gcm),
            other => Err(JwkGenError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// The wire/API representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rsa2048 => "RSA/2048",
            Self::Rsa3072 => "RSA/3072",
            Self::Rsa4096 => "RSA/4096",
            Self::EcP256 => "EC/P256",
            Self::EcP384 => "EC/P384",
            Self::EcP521 => "EC/P521",
            Self::OkpEd25519 => "OKP/Ed25519",
            Self::SymmetricA128Gcm => "oct/A128GCM",
            Self::SymmetricA256Gcm => "oct/A256GCM",
        }
    }

    /// The `kty` this algorithm projects to in a JWK.
    #[must_use]
    pub const fn kty(self) -> &'static str {
        match self {
            Self::Rsa2048 | Self::Rsa3072 | Self::Rsa4096 => "RSA",
            Self::EcP256 | Self::EcP384 | Self::EcP521 => "EC",
            Self::OkpEd25519 => "OKP",
            Self::SymmetricA128Gcm | Self::SymmetricA256Gcm => "oct",
        }
    }

    /// The only `use` this algorithm family may be validated against.
    /// Asymmetric algorithms are signature-only; symmetric algorithms are
    /// encryption-only, per `spec.md` §4.2.
    #[must_use]
    pub const fn natural_use(self) -> KeyUse {
        match self {
            Self::SymmetricA128Gcm | Self::SymmetricA256Gcm => KeyUse::Enc,
            _ => KeyUse::Sig,
        }
    }

    /// Validate that `requested` is compatible with this algorithm.
    pub fn validate_use(self, requested: KeyUse) -> Result<(), JwkGenError> {
        if self.natural_use() == requested {
            Ok(())
        } else {
            Err(JwkGenError::IncompatibleUse {
                requested: requested.as_str().to_string(),
                algorithm: self.as_str().to_string(),
            })
        }
    }

    /// The JWS `alg` header value this signing key produces, or `None` for
    /// symmetric encryption-only algorithms.
    #[must_use]
    pub const fn jws_alg(self) -> Option<&'static str> {
        match self {
            Self::Rsa2048 | Self::Rsa3072 | Self::Rsa4096 => Some("RS256"),
            Self::EcP256 => Some("ES256"),
            Self::EcP384 => Some("ES384"),
            Self::EcP521 => Some("ES512"),
            Self::OkpEd25519 => Some("EdDSA"),
            Self::SymmetricA128Gcm | Self::SymmetricA256Gcm => None,
        }
    }

    /// The JWE `enc` header value this symmetric key encrypts under, or
    /// `None` for asymmetric (signature-only) algorithms.
    #[must_use]
    pub const fn enc_alg(self) -> Option<&'static str> {
        match self {
            Self::SymmetricA128Gcm => Some("A128GCM"),
            Self::SymmetricA256Gcm => Some("A256GCM"),
            _ => None,
        }
    }

    /// The EC curve name for `EC`-kty algorithms, or `None`.
    #[must_use]
    pub const fn crv(self) -> Option<&'static str> {
        match self {
            Self::EcP256 => Some("P-256"),
            Self::EcP384 => Some("P-384"),
            Self::EcP521 => Some("P-521"),
            Self::OkpEd25519 => Some("Ed25519"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wire_string() {
        for alg in Algorithm::supported() {
            assert_eq!(Algorithm::parse(alg.as_str()).unwrap(), *alg);
        }
    }

    #[test]
    fn rejects_unknown_algorithm() {
        assert!(Algorithm::parse("RSA/1024").is_err());
        assert!(Algorithm::parse("INVALID").is_err());
    }

    #[test]
    fn asymmetric_algorithms_are_sig_only() {
        assert!(Algorithm::Rsa2048.validate_use(KeyUse::Sig).is_ok());
        assert!(Algorithm::Rsa2048.validate_use(KeyUse::Enc).is_err());
        assert!(Algorithm::EcP256.validate_use(KeyUse::Enc).is_err());
        assert!(Algorithm::OkpEd25519.validate_use(KeyUse::Enc).is_err());
    }

    #[test]
    fn symmetric_algorithms_are_enc_only() {
        assert!(Algorithm::SymmetricA256Gcm.validate_use(KeyUse::Enc).is_ok());
        assert!(Algorithm::SymmetricA256Gcm.validate_use(KeyUse::Sig).is_err());
    }
}
