//! AES-GCM seal/open helpers. Used both for symmetric `enc`-use elastic key
//! material and by the barrier for its own envelope wrapping.

use crate::error::JwkGenError;
use crate::material::PrivateMaterial;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, Nonce};
use rand_core::{CryptoRngCore, RngCore};

/// Length of an AES-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// A sealed value: the nonce used plus the ciphertext (with appended tag).
#[derive(Debug, Clone)]
pub struct Sealed {
    /// The 96-bit nonce generated for this seal operation.
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with the GCM authentication tag appended.
    pub ciphertext: Vec<u8>,
}

/// Seal `plaintext` under `key` (16 bytes for A128GCM, 32 for A256GCM),
/// authenticating `aad` alongside it. The nonce is drawn fresh from `rng`
/// for every call; callers must never reuse a (key, nonce) pair.
pub fn seal(
    key: &[u8],
    aad: &[u8],
    plaintext: &[u8],
    rng: &mut impl CryptoRngCore,
) -> Result<Sealed, JwkGenError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let payload = Payload { msg: plaintext, aad };

    let ciphertext = match key.len() {
        16 => {
            let cipher = Aes128Gcm::new_from_slice(key)
                .map_err(|e| JwkGenError::Primitive(format!("AES-128-GCM key: {e}")))?;
            cipher
                .encrypt(nonce, payload)
                .map_err(|e| JwkGenError::Primitive(format!("AES-128-GCM seal: {e}")))?
        }
        32 => {
            let cipher = Aes256Gcm::new_from_slice(key)
                .map_err(|e| JwkGenError::Primitive(format!("AES-256-GCM key: {e}")))?;
            cipher
                .encrypt(nonce, payload)
                .map_err(|e| JwkGenError::Primitive(format!("AES-256-GCM seal: {e}")))?
        }
        other => {
            return Err(JwkGenError::Primitive(format!(
                "unsupported AES-GCM key length: {other}"
            )))
        }
    };

    Ok(Sealed {
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Open a value sealed by [`seal`]. `aad` must match what was passed at seal
/// time exactly, or this fails.
pub fn open(key: &[u8], aad: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, JwkGenError> {
    let nonce = Nonce::from_slice(nonce);
    let payload = Payload { msg: ciphertext, aad };

    match key.len() {
        16 => {
            let cipher = Aes128Gcm::new_from_slice(key)
                .map_err(|e| JwkGenError::Primitive(format!("AES-128-GCM key: {e}")))?;
            cipher
                .decrypt(nonce, payload)
                .map_err(|_| JwkGenError::Primitive("AES-128-GCM open failed".into()))
        }
        32 => {
            let cipher = Aes256Gcm::new_from_slice(key)
                .map_err(|e| JwkGenError::Primitive(format!("AES-256-GCM key: {e}")))?;
            cipher
                .decrypt(nonce, payload)
                .map_err(|_| JwkGenError::Primitive("AES-256-GCM open failed".into()))
        }
        other => Err(JwkGenError::Primitive(format!(
            "unsupported AES-GCM key length: {other}"
        ))),
    }
}

/// Seal `plaintext` directly under a generated symmetric [`PrivateMaterial`],
/// for callers (session issuance) that hold an elastic key's material rather
/// than a bare key slice.
pub fn seal_with_material(
    private: &PrivateMaterial,
    aad: &[u8],
    plaintext: &[u8],
    rng: &mut impl CryptoRngCore,
) -> Result<Sealed, JwkGenError> {
    seal(private.symmetric_key()?, aad, plaintext, rng)
}

/// Inverse of [`seal_with_material`].
pub fn open_with_material(
    private: &PrivateMaterial,
    aad: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, JwkGenError> {
    open(private.symmetric_key()?, aad, nonce, ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn seals_and_opens_with_a256gcm() {
        let key = [7u8; 32];
        let sealed = seal(&key, b"aad", b"plaintext", &mut OsRng).unwrap();
        let opened = open(&key, b"aad", &sealed.nonce, &sealed.ciphertext).unwrap();
        assert_eq!(opened, b"plaintext");
    }

    #[test]
    fn seals_and_opens_with_a128gcm() {
        let key = [3u8; 16];
        let sealed = seal(&key, b"aad", b"plaintext", &mut OsRng).unwrap();
        let opened = open(&key, b"aad", &sealed.nonce, &sealed.ciphertext).unwrap();
        assert_eq!(opened, b"plaintext");
    }

    #[test]
    fn rejects_wrong_aad() {
        let key = [7u8; 32];
        let sealed = seal(&key, b"aad-one", b"plaintext", &mut OsRng).unwrap();
        assert!(open(&key, b"aad-two", &sealed.nonce, &sealed.ciphertext).is_err());
    }

    #[test]
    fn rejects_tampered_ciphertext() {
        let key = [7u8; 32];
        let mut sealed = seal(&key, b"aad", b"plaintext", &mut OsRng).unwrap();
        let last = sealed.ciphertext.len() - 1;
        sealed.ciphertext[last] ^= 0xff;
        assert!(open(&key, b"aad", &sealed.nonce, &sealed.ciphertext).is_err());
    }

    #[test]
    fn seals_and_opens_through_a_generated_material() {
        use crate::algorithm::Algorithm;
        use crate::generate::generate;

        let generated = generate(Algorithm::SymmetricA256Gcm, &mut OsRng).unwrap();
        let sealed = seal_with_material(&generated.private, b"aad", b"plaintext", &mut OsRng).unwrap();
        let opened =
            open_with_material(&generated.private, b"aad", &sealed.nonce, &sealed.ciphertext).unwrap();
        assert_eq!(opened, b"plaintext");
    }
}
