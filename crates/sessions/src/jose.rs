//! Compact JOSE framing for sessions: an inner JWS carrying [`Claims`],
//! wrapped in an outer JWE-lite (`alg=dir`) the same way `barrier::format`
//! frames its own envelopes, but keyed by a `String` `kid` rather than a
//! `Uuid` content-key id, since a session's signing/encryption material is
//! named by `MaterialKey::material_kid`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jwkgen::{Algorithm, PrivateMaterial};
use serde::{Deserialize, Serialize};

use crate::claims::Claims;
use crate::error::SessionError;

#[derive(Debug, Serialize, Deserialize)]
struct JwsHeader {
    alg: String,
    kid: String,
    typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct JweHeader {
    alg: String,
    enc: String,
    kid: String,
}

fn b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn b64_decode(s: &str, what: &str) -> Result<Vec<u8>, SessionError> {
    URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|e| SessionError::InvalidSession(format!("{what}: {e}")))
}

/// Build the inner compact JWS: `header.payload.signature`.
pub fn build_jws(
    alg: Algorithm,
    material_kid: &str,
    private: &PrivateMaterial,
    claims: &Claims,
) -> Result<String, SessionError> {
    let header = JwsHeader {
        alg: alg.jws_alg().unwrap_or("none").to_string(),
        kid: material_kid.to_string(),
        typ: "JWT".to_string(),
    };
    let header_b64 = b64(&serde_json::to_vec(&header)?);
    let payload_b64 = b64(&serde_json::to_vec(claims)?);
    let signing_input = format!("{header_b64}.{payload_b64}");
    let signature = jwkgen::sign(alg, private, signing_input.as_bytes())?;
    let signature_b64 = b64(&signature);
    Ok(format!("{signing_input}.{signature_b64}"))
}

/// Peek a compact JWS's `kid` without verifying the signature, so the
/// caller can resolve which material to verify with.
pub fn peek_jws_kid(compact: &str) -> Result<String, SessionError> {
    let header_b64 = compact
        .split('.')
        .next()
        .ok_or_else(|| SessionError::InvalidSession("empty JWS".to_string()))?;
    let header_json = b64_decode(header_b64, "JWS header")?;
    let header: JwsHeader = serde_json::from_slice(&header_json)?;
    Ok(header.kid)
}

/// Verify a compact JWS and decode its claims.
pub fn verify_jws(alg: Algorithm, private: &PrivateMaterial, compact: &str) -> Result<Claims, SessionError> {
    let parts: Vec<&str> = compact.split('.').collect();
    let [header_b64, payload_b64, signature_b64] = parts[..] else {
        return Err(SessionError::InvalidSession(format!(
            "expected 3 JWS segments, found {}",
            parts.len()
        )));
    };
    let signing_input = format!("{header_b64}.{payload_b64}");
    let signature = b64_decode(signature_b64, "JWS signature")?;
    if !jwkgen::verify(alg, private, signing_input.as_bytes(), &signature)? {
        return Err(SessionError::InvalidSession("signature verification failed".to_string()));
    }
    let payload_json = b64_decode(payload_b64, "JWS payload")?;
    Ok(serde_json::from_slice(&payload_json)?)
}

/// Build the outer compact JWE-lite: `header..iv.body.tag`, `alg=dir`. The
/// AAD is the base64url header segment, mirroring `barrier::format`.
pub fn build_jwe(
    enc_alg: Algorithm,
    material_kid: &str,
    private: &PrivateMaterial,
    inner_jws: &str,
) -> Result<String, SessionError> {
    let header = JweHeader {
        alg: "dir".to_string(),
        enc: enc_alg.enc_alg().unwrap_or("A256GCM").to_string(),
        kid: material_kid.to_string(),
    };
    let header_b64 = b64(&serde_json::to_vec(&header)?);
    let sealed = jwkgen::aead::seal_with_material(
        private,
        header_b64.as_bytes(),
        inner_jws.as_bytes(),
        &mut rand::rngs::OsRng,
    )?;
    let iv_b64 = b64(&sealed.nonce);
    let tag_len = 16;
    let (body, tag) = sealed
        .ciphertext
        .split_at(sealed.ciphertext.len().saturating_sub(tag_len));
    Ok(format!("{header_b64}..{iv_b64}.{}.{}", b64(body), b64(tag)))
}

/// Peek a compact JWE's `kid` without opening it.
pub fn peek_jwe_kid(compact: &str) -> Result<String, SessionError> {
    let header_b64 = compact
        .split('.')
        .next()
        .ok_or_else(|| SessionError::InvalidSession("empty JWE".to_string()))?;
    let header_json = b64_decode(header_b64, "JWE header")?;
    let header: JweHeader = serde_json::from_slice(&header_json)?;
    Ok(header.kid)
}

/// Open a compact JWE-lite and return the inner compact JWS string.
pub fn open_jwe(private: &PrivateMaterial, compact: &str) -> Result<String, SessionError> {
    let parts: Vec<&str> = compact.split('.').collect();
    if parts.len() != 5 {
        return Err(SessionError::InvalidSession(format!(
            "expected 5 JWE segments, found {}",
            parts.len()
        )));
    }
    let [header_b64, encrypted_key_b64, iv_b64, body_b64, tag_b64] = parts[..] else {
        unreachable!("length checked above")
    };
    if !encrypted_key_b64.is_empty() {
        return Err(SessionError::InvalidSession(
            "non-empty encrypted-key segment for alg=dir".to_string(),
        ));
    }
    let header_json = b64_decode(header_b64, "JWE header")?;
    let header: JweHeader = serde_json::from_slice(&header_json)?;
    if header.alg != "dir" {
        return Err(SessionError::InvalidSession(format!("unsupported JWE alg: {}", header.alg)));
    }

    let nonce = b64_decode(iv_b64, "JWE iv")?;
    let mut body = b64_decode(body_b64, "JWE ciphertext")?;
    let tag = b64_decode(tag_b64, "JWE tag")?;
    body.extend_from_slice(&tag);

    let plaintext = jwkgen::aead::open_with_material(private, header_b64.as_bytes(), &nonce, &body)?;
    String::from_utf8(plaintext).map_err(|e| SessionError::InvalidSession(format!("inner JWS not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use platform_common::TenantScope;
    use std::collections::HashMap;
    use store::model::SessionKind;
    use uuid::Uuid;

    #[test]
    fn jws_round_trips_and_rejects_tampering() {
        let generated = jwkgen::generate(Algorithm::EcP256, &mut rand::rngs::OsRng).unwrap();
        let scope = TenantScope::new(Uuid::new_v4(), Uuid::new_v4());
        let claims = Claims::new(
            Uuid::new_v4(),
            scope,
            "alice".to_string(),
            SessionKind::Browser,
            Duration::minutes(15),
            HashMap::new(),
            Utc::now(),
        );

        let compact = build_jws(Algorithm::EcP256, &generated.material_kid, &generated.private, &claims).unwrap();
        assert_eq!(peek_jws_kid(&compact).unwrap(), generated.material_kid);

        let verified = verify_jws(Algorithm::EcP256, &generated.private, &compact).unwrap();
        assert_eq!(verified.sub, "alice");

        let mut tampered = compact.clone();
        tampered.push('x');
        assert!(verify_jws(Algorithm::EcP256, &generated.private, &tampered).is_err());
    }

    #[test]
    fn jwe_round_trips_and_rejects_tampering() {
        let generated = jwkgen::generate(Algorithm::SymmetricA256Gcm, &mut rand::rngs::OsRng).unwrap();
        let compact = build_jwe(
            Algorithm::SymmetricA256Gcm,
            &generated.material_kid,
            &generated.private,
            "inner-jws",
        )
        .unwrap();
        assert_eq!(peek_jwe_kid(&compact).unwrap(), generated.material_kid);

        let opened = open_jwe(&generated.private, &compact).unwrap();
        assert_eq!(opened, "inner-jws");

        let mut tampered = compact.clone();
        tampered.push('x');
        assert!(open_jwe(&generated.private, &tampered).is_err());
    }
}
