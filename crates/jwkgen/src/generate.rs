//! Key generation. Each call produces one fresh keypair (or symmetric key)
//! plus the `material_kid` that will identify it for the lifetime of the
//! `MaterialKey` row the caller wraps it in.

use crate::algorithm::Algorithm;
use crate::error::JwkGenError;
use crate::jwk::{public_jwk, Jwk};
use crate::material::{rsa_to_pkcs8_der, PrivateMaterial};
use ed25519_dalek::SigningKey as Ed25519SigningKey;
use p256::ecdsa::SigningKey as P256SigningKey;
use p384::ecdsa::SigningKey as P384SigningKey;
use p521::ecdsa::SigningKey as P521SigningKey;
use rand_core::{CryptoRngCore, RngCore};
use rsa::RsaPrivateKey;
use uuid::Uuid;

/// A freshly generated key: its kid, private material, and (for asymmetric,
/// `sig`-use algorithms) its public JWK projection.
pub struct GeneratedKey {
    /// Unique kid assigned to this material.
    pub material_kid: String,
    /// The private material, to be handed straight to the barrier for
    /// sealing; never persisted in the clear.
    pub private: PrivateMaterial,
    /// The public JWK, present only for `sig`-use asymmetric algorithms.
    pub public: Option<Jwk>,
}

fn rsa_bits(alg: Algorithm) -> usize {
    match alg {
        Algorithm::Rsa2048 => 2048,
        Algorithm::Rsa3072 => 3072,
        Algorithm::Rsa4096 => 4096,
        _ => unreachable!("rsa_bits called for non-RSA algorithm"),
    }
}

fn symmetric_key_len(alg: Algorithm) -> usize {
    match alg {
        Algorithm::SymmetricA128Gcm => 16,
        Algorithm::SymmetricA256Gcm => 32,
        _ => unreachable!("symmetric_key_len called for non-symmetric algorithm"),
    }
}

/// Generate a fresh key for `alg` using `rng`.
pub fn generate(alg: Algorithm, rng: &mut impl CryptoRngCore) -> Result<GeneratedKey, JwkGenError> {
    let material_kid = Uuid::new_v4().to_string();

    let private = match alg {
        Algorithm::Rsa2048 | Algorithm::Rsa3072 | Algorithm::Rsa4096 => {
            let key = RsaPrivateKey::new(rng, rsa_bits(alg))
                .map_err(|e| JwkGenError::Primitive(format!("RSA keygen: {e}")))?;
            PrivateMaterial::Rsa(rsa_to_pkcs8_der(&key)?)
        }
        Algorithm::EcP256 => {
            let signing_key = P256SigningKey::random(rng);
            PrivateMaterial::EcP256(signing_key.to_bytes().into())
        }
        Algorithm::EcP384 => {
            let signing_key = P384SigningKey::random(rng);
            PrivateMaterial::EcP384(signing_key.to_bytes().into())
        }
        Algorithm::EcP521 => {
            let signing_key = P521SigningKey::random(rng);
            PrivateMaterial::EcP521(signing_key.to_bytes().into())
        }
        Algorithm::OkpEd25519 => {
            let signing_key = Ed25519SigningKey::generate(rng);
            PrivateMaterial::Ed25519(signing_key.to_bytes())
        }
        Algorithm::SymmetricA128Gcm | Algorithm::SymmetricA256Gcm => {
            let mut bytes = vec![0u8; symmetric_key_len(alg)];
            rng.fill_bytes(&mut bytes);
            PrivateMaterial::Symmetric(bytes)
        }
    };

    let public = match alg.natural_use() {
        crate::algorithm::KeyUse::Sig => Some(public_jwk(alg, &material_kid, &private)?),
        crate::algorithm::KeyUse::Enc => None,
    };

    Ok(GeneratedKey {
        material_kid,
        private,
        public,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn generates_every_supported_algorithm() {
        for alg in Algorithm::supported() {
            let generated = generate(*alg, &mut OsRng).unwrap();
            assert!(!generated.material_kid.is_empty());
            match alg.natural_use() {
                crate::algorithm::KeyUse::Sig => assert!(generated.public.is_some()),
                crate::algorithm::KeyUse::Enc => assert!(generated.public.is_none()),
            }
        }
    }

    #[test]
    fn kids_are_unique_across_calls() {
        let a = generate(Algorithm::EcP256, &mut OsRng).unwrap();
        let b = generate(Algorithm::EcP256, &mut OsRng).unwrap();
        assert_ne!(a.material_kid, b.material_kid);
    }

    #[test]
    fn symmetric_key_lengths_match_algorithm() {
        let a128 = generate(Algorithm::SymmetricA128Gcm, &mut OsRng).unwrap();
        let a256 = generate(Algorithm::SymmetricA256Gcm, &mut OsRng).unwrap();
        assert_eq!(a128.private.to_bytes().len(), 16);
        assert_eq!(a256.private.to_bytes().len(), 32);
    }
}
