//! Compact serialization for `EncryptContent`'s output: a direct-encryption
//! JWE (`alg=dir`) whose protected header carries the content-key id, per
//! `spec.md` §4.1: "header carries the content-key id ... `DecryptContent`
//! reads the header, resolves the (possibly retired) content key by id."

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BarrierError;

#[derive(Debug, Serialize, Deserialize)]
struct ContentHeader {
    alg: String,
    enc: String,
    kid: String,
}

/// One sealed payload: everything `DecryptContent` needs besides the key
/// material itself.
pub struct SealedEnvelope {
    /// The content key id the header names.
    pub content_key_id: Uuid,
    /// The AES-GCM nonce used at seal time.
    pub nonce: [u8; jwkgen::aead::NONCE_LEN],
    /// Ciphertext with the GCM tag appended — `aes-gcm`'s native output.
    pub ciphertext: Vec<u8>,
}

/// Render a sealed envelope as 5-part compact JWE serialization:
/// `header..iv.ciphertext.tag`, with an empty encrypted-key segment since
/// `alg=dir` needs none.
#[must_use]
pub fn serialize(envelope: &SealedEnvelope) -> String {
    let header = ContentHeader {
        alg: "dir".to_string(),
        enc: "A256GCM".to_string(),
        kid: envelope.content_key_id.to_string(),
    };
    let header_json = serde_json::to_vec(&header).expect("header always serializes");
    let header_b64 = URL_SAFE_NO_PAD.encode(header_json);
    let iv_b64 = URL_SAFE_NO_PAD.encode(envelope.nonce);

    let tag_len = 16;
    let (body, tag) = envelope
        .ciphertext
        .split_at(envelope.ciphertext.len().saturating_sub(tag_len));
    let body_b64 = URL_SAFE_NO_PAD.encode(body);
    let tag_b64 = URL_SAFE_NO_PAD.encode(tag);

    format!("{header_b64}..{iv_b64}.{body_b64}.{tag_b64}")
}

/// Parse a compact envelope back into its header's content-key id, nonce,
/// and the full (body+tag) ciphertext `aes-gcm::open` expects.
pub fn parse(compact: &str) -> Result<SealedEnvelope, BarrierError> {
    let parts: Vec<&str> = compact.split('.').collect();
    if parts.len() != 5 {
        return Err(BarrierError::Malformed(format!(
            "expected 5 compact segments, found {}",
            parts.len()
        )));
    }
    let [header_b64, encrypted_key_b64, iv_b64, body_b64, tag_b64] = parts[..] else {
        unreachable!("length checked above")
    };
    if !encrypted_key_b64.is_empty() {
        return Err(BarrierError::Malformed(
            "non-empty encrypted-key segment for alg=dir".to_string(),
        ));
    }

    let header_json = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|e| BarrierError::Malformed(format!("header: {e}")))?;
    let header: ContentHeader = serde_json::from_slice(&header_json)
        .map_err(|e| BarrierError::Malformed(format!("header json: {e}")))?;
    if header.alg != "dir" || header.enc != "A256GCM" {
        return Err(BarrierError::Malformed(format!(
            "unsupported alg/enc: {}/{}",
            header.alg, header.enc
        )));
    }
    let content_key_id = Uuid::parse_str(&header.kid)
        .map_err(|e| BarrierError::Malformed(format!("kid: {e}")))?;

    let iv_bytes = URL_SAFE_NO_PAD
        .decode(iv_b64)
        .map_err(|e| BarrierError::Malformed(format!("iv: {e}")))?;
    let nonce: [u8; jwkgen::aead::NONCE_LEN] = iv_bytes
        .try_into()
        .map_err(|_| BarrierError::Malformed("bad nonce length".to_string()))?;

    let mut body = URL_SAFE_NO_PAD
        .decode(body_b64)
        .map_err(|e| BarrierError::Malformed(format!("ciphertext: {e}")))?;
    let tag = URL_SAFE_NO_PAD
        .decode(tag_b64)
        .map_err(|e| BarrierError::Malformed(format!("tag: {e}")))?;
    body.extend_from_slice(&tag);

    Ok(SealedEnvelope {
        content_key_id,
        nonce,
        ciphertext: body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_compact_form() {
        let envelope = SealedEnvelope {
            content_key_id: Uuid::new_v4(),
            nonce: [7u8; jwkgen::aead::NONCE_LEN],
            ciphertext: vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18],
        };
        let compact = serialize(&envelope);
        assert_eq!(compact.matches('.').count(), 4);
        let parsed = parse(&compact).unwrap();
        assert_eq!(parsed.content_key_id, envelope.content_key_id);
        assert_eq!(parsed.nonce, envelope.nonce);
        assert_eq!(parsed.ciphertext, envelope.ciphertext);
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert!(parse("a.b.c").is_err());
    }
}
