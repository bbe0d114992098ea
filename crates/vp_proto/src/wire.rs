//! Relay record shape and the group message triplet codec.
//!
//! # Group triplet (bit-exact for interop)
//!   "<ivHex>:<authTagHex>:<ciphertextHex>"
//! All three fields standard lowercase hex; IV is 12 bytes, tag 16
//! (AES-256-GCM). A record that does not parse is a typed error the
//! caller treats as skip-this-one, never as a batch abort.

use serde::{Deserialize, Serialize};

use vp_crypto::ratchet::{GCM_IV_LEN, GCM_TAG_LEN};

use crate::{envelope::Envelope, error::ProtoError};

/// What the relay stores per inbox entry. All semantics live in
/// `message`; the optional fields are side channels the protocol needs
/// (claimed sender for ratchet track selection, detached signature for
/// plaintext control notices, relay-assigned id for dedup).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportRecord {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl TransportRecord {
    /// A 1:1 envelope record: ciphertext in `message`, signature detached.
    pub fn from_envelope(envelope: &Envelope) -> Self {
        Self {
            message: envelope.ciphertext.clone(),
            signature: Some(envelope.signature.clone()),
            sender_id: None,
            id: None,
        }
    }

    pub fn to_envelope(&self) -> Result<Envelope, ProtoError> {
        let signature = self
            .signature
            .clone()
            .ok_or_else(|| ProtoError::MalformedRecord("record has no signature".into()))?;
        Ok(Envelope {
            ciphertext: self.message.clone(),
            signature,
        })
    }
}

/// Encode AEAD parts as the wire triplet.
pub fn encode_triplet(iv: &[u8], tag: &[u8], ciphertext: &[u8]) -> String {
    format!(
        "{}:{}:{}",
        hex::encode(iv),
        hex::encode(tag),
        hex::encode(ciphertext)
    )
}

/// Decode a wire triplet into (iv, tag, ciphertext), validating field
/// count and fixed lengths.
pub fn decode_triplet(s: &str) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>), ProtoError> {
    let mut parts = s.split(':');
    let (iv_hex, tag_hex, ct_hex) = match (parts.next(), parts.next(), parts.next(), parts.next())
    {
        (Some(iv), Some(tag), Some(ct), None) => (iv, tag, ct),
        _ => {
            return Err(ProtoError::MalformedRecord(
                "expected ivHex:tagHex:ciphertextHex".into(),
            ))
        }
    };

    let iv = hex::decode(iv_hex).map_err(vp_crypto::CryptoError::HexDecode)?;
    let tag = hex::decode(tag_hex).map_err(vp_crypto::CryptoError::HexDecode)?;
    let ct = hex::decode(ct_hex).map_err(vp_crypto::CryptoError::HexDecode)?;

    if iv.len() != GCM_IV_LEN {
        return Err(ProtoError::MalformedRecord(format!(
            "iv must be {GCM_IV_LEN} bytes, got {}",
            iv.len()
        )));
    }
    if tag.len() != GCM_TAG_LEN {
        return Err(ProtoError::MalformedRecord(format!(
            "auth tag must be {GCM_TAG_LEN} bytes, got {}",
            tag.len()
        )));
    }
    Ok((iv, tag, ct))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triplet_roundtrip_lowercase_hex() {
        let iv = [0xABu8; GCM_IV_LEN];
        let tag = [0x0Fu8; GCM_TAG_LEN];
        let ct = vec![1u8, 2, 3, 4];
        let wire = encode_triplet(&iv, &tag, &ct);
        assert!(wire.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == ':'));
        let (iv2, tag2, ct2) = decode_triplet(&wire).unwrap();
        assert_eq!(iv2, iv);
        assert_eq!(tag2, tag);
        assert_eq!(ct2, ct);
    }

    #[test]
    fn missing_segment_is_malformed() {
        let err = decode_triplet("aabb:ccdd").unwrap_err();
        assert!(matches!(err, ProtoError::MalformedRecord(_)));
    }

    #[test]
    fn extra_segment_is_malformed() {
        assert!(decode_triplet("aa:bb:cc:dd").is_err());
    }

    #[test]
    fn wrong_iv_length_is_malformed() {
        let tag = hex::encode([0u8; GCM_TAG_LEN]);
        let wire = format!("aabb:{tag}:00");
        assert!(decode_triplet(&wire).is_err());
    }

    #[test]
    fn non_hex_is_malformed() {
        let iv = hex::encode([0u8; GCM_IV_LEN]);
        let tag = hex::encode([0u8; GCM_TAG_LEN]);
        let wire = format!("{iv}:{tag}:zz");
        assert!(decode_triplet(&wire).is_err());
    }

    #[test]
    fn record_sender_id_uses_camel_case() {
        let rec = TransportRecord {
            message: "m".into(),
            signature: None,
            sender_id: Some("alice".into()),
            id: None,
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"senderId\":\"alice\""));
        assert!(!json.contains("signature"));
    }
}
