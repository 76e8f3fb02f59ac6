//! Signing and verification dispatch across the supported signature
//! algorithms. Each family uses its own RustCrypto `signature::Signer`/
//! `Verifier` implementation directly; there is no intermediate
//! `EncodingKey`-style abstraction.

use crate::algorithm::Algorithm;
use crate::error::JwkGenError;
use crate::material::PrivateMaterial;
use ed25519_dalek::Signer as Ed25519Signer;
use p256::ecdsa::{
    signature::Signer as P256Signer, signature::Verifier as P256Verifier, Signature as P256Signature,
};
use p384::ecdsa::{
    signature::Signer as P384Signer, signature::Verifier as P384Verifier, Signature as P384Signature,
};
use p521::ecdsa::{
    signature::Signer as P521Signer, signature::Verifier as P521Verifier, Signature as P521Signature,
};
use rsa::pkcs1v15::{SigningKey as RsaSigningKey, VerifyingKey as RsaVerifyingKey};
use rsa::signature::{RandomizedSigner, Verifier as RsaVerifier};
use sha2::Sha256;

/// Sign `data` with `private`, dispatching on `alg`. Fails with
/// [`JwkGenError::IncompatibleUse`] if `alg` is a symmetric algorithm, since
/// those have no signing operation.
pub fn sign(alg: Algorithm, private: &PrivateMaterial, data: &[u8]) -> Result<Vec<u8>, JwkGenError> {
    match alg {
        Algorithm::Rsa2048 | Algorithm::Rsa3072 | Algorithm::Rsa4096 => {
            let key = private.rsa_private_key()?;
            let signing_key = RsaSigningKey::<Sha256>::new(key);
            let signature = signing_key.sign_with_rng(&mut rand::thread_rng(), data);
            Ok(signature.to_vec())
        }
        Algorithm::EcP256 => {
            let signing_key = private.p256_signing_key()?;
            let signature: P256Signature = signing_key.sign(data);
            Ok(signature.to_vec())
        }
        Algorithm::EcP384 => {
            let signing_key = private.p384_signing_key()?;
            let signature: P384Signature = signing_key.sign(data);
            Ok(signature.to_vec())
        }
        Algorithm::EcP521 => {
            let signing_key = private.p521_signing_key()?;
            let signature: P521Signature = signing_key.sign(data);
            Ok(signature.to_vec())
        }
        Algorithm::OkpEd25519 => {
            let signing_key = private.ed25519_signing_key()?;
            let signature = signing_key.sign(data);
            Ok(signature.to_bytes().to_vec())
        }
        Algorithm::SymmetricA128Gcm | Algorithm::SymmetricA256Gcm => {
            Err(JwkGenError::IncompatibleUse {
                requested: "sig".to_string(),
                algorithm: alg.as_str().to_string(),
            })
        }
    }
}

/// Verify `signature` over `data` using the public material derived from
/// `private`. The session/keystore layers only ever hold the private
/// material (barrier-sealed), so verification re-derives the public key from
/// it rather than accepting a bare public key argument.
pub fn verify(
    alg: Algorithm,
    private: &PrivateMaterial,
    data: &[u8],
    signature: &[u8],
) -> Result<bool, JwkGenError> {
    match alg {
        Algorithm::Rsa2048 | Algorithm::Rsa3072 | Algorithm::Rsa4096 => {
            let key = private.rsa_private_key()?;
            let verifying_key = RsaVerifyingKey::<Sha256>::new(key.to_public_key());
            let sig = rsa::pkcs1v15::Signature::try_from(signature)
                .map_err(|e| JwkGenError::Primitive(format!("RSA signature decode: {e}")))?;
            Ok(verifying_key.verify(data, &sig).is_ok())
        }
        Algorithm::EcP256 => {
            let signing_key = private.p256_signing_key()?;
            let verifying_key = signing_key.verifying_key();
            let sig = P256Signature::from_slice(signature)
                .map_err(|e| JwkGenError::Primitive(format!("P-256 signature decode: {e}")))?;
            Ok(verifying_key.verify(data, &sig).is_ok())
        }
        Algorithm::EcP384 => {
            let signing_key = private.p384_signing_key()?;
            let verifying_key = signing_key.verifying_key();
            let sig = P384Signature::from_slice(signature)
                .map_err(|e| JwkGenError::Primitive(format!("P-384 signature decode: {e}")))?;
            Ok(verifying_key.verify(data, &sig).is_ok())
        }
        Algorithm::EcP521 => {
            let signing_key = private.p521_signing_key()?;
            let verifying_key = signing_key.verifying_key();
            let sig = P521Signature::from_slice(signature)
                .map_err(|e| JwkGenError::Primitive(format!("P-521 signature decode: {e}")))?;
            Ok(verifying_key.verify(data, &sig).is_ok())
        }
        Algorithm::OkpEd25519 => {
            let signing_key = private.ed25519_signing_key()?;
            let verifying_key = signing_key.verifying_key();
            let sig_bytes: [u8; 64] = signature
                .try_into()
                .map_err(|_| JwkGenError::Primitive("bad Ed25519 signature length".into()))?;
            let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes);
            Ok(verifying_key.verify_strict(data, &sig).is_ok())
        }
        Algorithm::SymmetricA128Gcm | Algorithm::SymmetricA256Gcm => {
            Err(JwkGenError::IncompatibleUse {
                requested: "sig".to_string(),
                algorithm: alg.as_str().to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::generate;
    use rand::rngs::OsRng;

    #[test]
    fn rsa_round_trips() {
        let generated = generate(Algorithm::Rsa2048, &mut OsRng).unwrap();
        let sig = sign(Algorithm::Rsa2048, &generated.private, b"hello").unwrap();
        assert!(verify(Algorithm::Rsa2048, &generated.private, b"hello", &sig).unwrap());
        assert!(!verify(Algorithm::Rsa2048, &generated.private, b"tampered", &sig).unwrap());
    }

    #[test]
    fn ec_p256_round_trips() {
        let generated = generate(Algorithm::EcP256, &mut OsRng).unwrap();
        let sig = sign(Algorithm::EcP256, &generated.private, b"hello").unwrap();
        assert!(verify(Algorithm::EcP256, &generated.private, b"hello", &sig).unwrap());
    }

    #[test]
    fn ec_p384_round_trips() {
        let generated = generate(Algorithm::EcP384, &mut OsRng).unwrap();
        let sig = sign(Algorithm::EcP384, &generated.private, b"hello").unwrap();
        assert!(verify(Algorithm::EcP384, &generated.private, b"hello", &sig).unwrap());
    }

    #[test]
    fn ec_p521_round_trips() {
        let generated = generate(Algorithm::EcP521, &mut OsRng).unwrap();
        let sig = sign(Algorithm::EcP521, &generated.private, b"hello").unwrap();
        assert!(verify(Algorithm::EcP521, &generated.private, b"hello", &sig).unwrap());
    }

    #[test]
    fn ed25519_round_trips() {
        let generated = generate(Algorithm::OkpEd25519, &mut OsRng).unwrap();
        let sig = sign(Algorithm::OkpEd25519, &generated.private, b"hello").unwrap();
        assert!(verify(Algorithm::OkpEd25519, &generated.private, b"hello", &sig).unwrap());
    }

    #[test]
    fn symmetric_cannot_sign() {
        let generated = generate(Algorithm::SymmetricA256Gcm, &mut OsRng).unwrap();
        assert!(sign(Algorithm::SymmetricA256Gcm, &generated.private, b"hello").is_err());
    }
}
