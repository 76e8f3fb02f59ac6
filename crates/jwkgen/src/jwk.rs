//! Public JWK projection per RFC 7517. Only the public components ever land
//! here; `PrivateMaterial` never does.

use crate::algorithm::Algorithm;
use crate::error::JwkGenError;
use crate::material::PrivateMaterial;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rsa::traits::PublicKeyParts;
use serde::{Deserialize, Serialize};

/// A single JSON Web Key, public components only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type: `RSA`, `EC`, or `OKP`.
    pub kty: String,
    /// The elastic key's material kid, unique within a tenant scope.
    pub kid: String,
    /// `sig` or `enc`.
    #[serde(rename = "use")]
    pub key_use: String,
    /// JWS/JWE algorithm identifier.
    pub alg: String,
    /// RSA modulus, base64url.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA public exponent, base64url.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    /// EC/OKP x coordinate (or Ed25519 public point), base64url.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// EC y coordinate, base64url.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// EC/OKP curve name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
}

/// A JWK set per RFC 7517 §5.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JwkSet {
    /// The keys, in the order the caller supplied them.
    pub keys: Vec<Jwk>,
}

fn b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Derive the public JWK for a generated private material. `material_kid`
/// becomes the JWK's `kid`; the caller (an asymmetric, `sig`-use material)
/// is the only path that reaches the public JWKS, per `spec.md` §4.2.
pub fn public_jwk(
    alg: Algorithm,
    material_kid: &str,
    private: &PrivateMaterial,
) -> Result<Jwk, JwkGenError> {
    let key_use = alg.natural_use().as_str().to_string();
    let jws_alg = alg.jws_alg().unwrap_or("none").to_string();

    match alg {
        Algorithm::Rsa2048 | Algorithm::Rsa3072 | Algorithm::Rsa4096 => {
            let key = private.rsa_private_key()?;
            let public = key.to_public_key();
            Ok(Jwk {
                kty: alg.kty().to_string(),
                kid: material_kid.to_string(),
                key_use,
                alg: jws_alg,
                n: Some(b64(&public.n().to_bytes_be())),
                e: Some(b64(&public.e().to_bytes_be())),
                x: None,
                y: None,
                crv: None,
            })
        }
        Algorithm::EcP256 => {
            let signing = private.p256_signing_key()?;
            let point = signing.verifying_key().to_encoded_point(false);
            Ok(Jwk {
                kty: alg.kty().to_string(),
                kid: material_kid.to_string(),
                key_use,
                alg: jws_alg,
                n: None,
                e: None,
                x: Some(b64(point.x().expect("uncompressed point has x"))),
                y: Some(b64(point.y().expect("uncompressed point has y"))),
                crv: alg.crv().map(str::to_string),
            })
        }
        Algorithm::EcP384 => {
            let signing = private.p384_signing_key()?;
            let point = signing.verifying_key().to_encoded_point(false);
            Ok(Jwk {
                kty: alg.kty().to_string(),
                kid: material_kid.to_string(),
                key_use,
                alg: jws_alg,
                n: None,
                e: None,
                x: Some(b64(point.x().expect("uncompressed point has x"))),
                y: Some(b64(point.y().expect("uncompressed point has y"))),
                crv: alg.crv().map(str::to_string),
            })
        }
        Algorithm::EcP521 => {
            let signing = private.p521_signing_key()?;
            let point = signing.verifying_key().to_encoded_point(false);
            Ok(Jwk {
                kty: alg.kty().to_string(),
                kid: material_kid.to_string(),
                key_use,
                alg: jws_alg,
                n: None,
                e: None,
                x: Some(b64(point.x().expect("uncompressed point has x"))),
                y: Some(b64(point.y().expect("uncompressed point has y"))),
                crv: alg.crv().map(str::to_string),
            })
        }
        Algorithm::OkpEd25519 => {
            let signing = private.ed25519_signing_key()?;
            let verifying = signing.verifying_key();
            Ok(Jwk {
                kty: alg.kty().to_string(),
                kid: material_kid.to_string(),
                key_use,
                alg: jws_alg,
                n: None,
                e: None,
                x: Some(b64(verifying.as_bytes())),
                y: None,
                crv: alg.crv().map(str::to_string),
            })
        }
        Algorithm::SymmetricA128Gcm | Algorithm::SymmetricA256Gcm => {
            // Symmetric material is `enc`-use only and never exposed through
            // JWKS (spec.md §4.2, §6); this projection exists only so the
            // type is total, and carries no key bytes.
            Ok(Jwk {
                kty: alg.kty().to_string(),
                kid: material_kid.to_string(),
                key_use,
                alg: alg.enc_alg().expect("symmetric variant").to_string(),
                n: None,
                e: None,
                x: None,
                y: None,
                crv: None,
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
    fn rsa_jwk_has_n_and_e() {
        let generated = generate(Algorithm::Rsa2048, &mut OsRng).unwrap();
        let jwk = public_jwk(Algorithm::Rsa2048, &generated.material_kid, &generated.private).unwrap();
        assert!(jwk.n.is_some());
        assert!(jwk.e.is_some());
        assert!(jwk.x.is_none());
    }

    #[test]
    fn ec_jwk_has_x_and_y() {
        let generated = generate(Algorithm::EcP256, &mut OsRng).unwrap();
        let jwk = public_jwk(Algorithm::EcP256, &generated.material_kid, &generated.private).unwrap();
        assert!(jwk.x.is_some());
        assert!(jwk.y.is_some());
        assert_eq!(jwk.crv.as_deref(), Some("P-256"));
    }

    #[test]
    fn ed25519_jwk_has_x_only() {
        let generated = generate(Algorithm::OkpEd25519, &mut OsRng).unwrap();
        let jwk =
            public_jwk(Algorithm::OkpEd25519, &generated.material_kid, &generated.private).unwrap();
        assert!(jwk.x.is_some());
        assert!(jwk.y.is_none());
    }
}
