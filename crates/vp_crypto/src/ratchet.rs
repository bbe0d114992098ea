//! Sender-keys chain ratchet.
//!
//! Each group member owns exactly one sending chain; every other member
//! tracks the last-known chain key for that sender. One ratchet step:
//!
//!   message_key    = HMAC-SHA256(chain_key, "msg")
//!   next_chain_key = HMAC-SHA256(chain_key, "chain")
//!
//! Two independent domain-separated derivations: compromising a message
//! key reveals nothing about the next chain key, and the chain is
//! one-way — no derivation ever runs backwards.
//!
//! CALLER CONTRACT: persist `next_chain_key` as the new state BEFORE
//! the message key is used for a send. If persistence fails, the send
//! failed; retrying with the same chain key would reuse a message key.
//!
//! Group message encryption is AES-256-GCM with a random 12-byte IV and
//! a detached 16-byte tag, matching the relay wire triplet
//! `ivHex:tagHex:ciphertextHex` (see vp_proto::wire).

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng as AeadOsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::CryptoError;

type HmacSha256 = Hmac<Sha256>;

pub const GCM_IV_LEN: usize = 12;
pub const GCM_TAG_LEN: usize = 16;

// ── Chain key ─────────────────────────────────────────────────────────────────

/// 32-byte secret scalar in a one-way derivation chain. Base64 on the
/// wire and in persisted state; zeroized on drop.
#[derive(Clone, PartialEq, Eq, ZeroizeOnDrop)]
pub struct ChainKey([u8; 32]);

impl ChainKey {
    /// Fresh unrelated entropy — used at group creation and whenever a
    /// member departs (rotation must never derive from the old chain).
    pub fn random() -> Self {
        let mut key = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_b64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    pub fn from_b64(s: &str) -> Result<Self, CryptoError> {
        let bytes = URL_SAFE_NO_PAD.decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("chain key must be 32 bytes".into()))?;
        Ok(Self(arr))
    }
}

impl std::fmt::Debug for ChainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ChainKey(..)")
    }
}

impl Serialize for ChainKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_b64())
    }
}

impl<'de> Deserialize<'de> for ChainKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ChainKey::from_b64(&s).map_err(serde::de::Error::custom)
    }
}

/// One-time-use key derived from a chain key; encrypts exactly one
/// group message and is never persisted.
pub struct MessageKey([u8; 32]);

impl Drop for MessageKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

// ── Ratchet step ──────────────────────────────────────────────────────────────

/// Advance the chain: `chain_key → (message_key, next_chain_key)`.
/// Deterministic; the input key is not consumed so the caller decides
/// when the old state is replaced (after persisting the new one).
pub fn advance(chain_key: &ChainKey) -> Result<(MessageKey, ChainKey), CryptoError> {
    let mut mac_mk = <HmacSha256 as Mac>::new_from_slice(&chain_key.0)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    mac_mk.update(b"msg");
    let mk: [u8; 32] = mac_mk.finalize().into_bytes().into();

    let mut mac_ck = <HmacSha256 as Mac>::new_from_slice(&chain_key.0)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    mac_ck.update(b"chain");
    let next: [u8; 32] = mac_ck.finalize().into_bytes().into();

    Ok((MessageKey(mk), ChainKey(next)))
}

// ── Group message AEAD ────────────────────────────────────────────────────────

/// Encrypt one group message. Returns (iv, tag, ciphertext) for the
/// wire triplet.
pub fn encrypt_group(
    mk: &MessageKey,
    plaintext: &[u8],
) -> Result<([u8; GCM_IV_LEN], [u8; GCM_TAG_LEN], Vec<u8>), CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(&mk.0).map_err(|_| CryptoError::AeadEncrypt)?;
    let nonce = Aes256Gcm::generate_nonce(&mut AeadOsRng);

    let mut ct = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::AeadEncrypt)?;
    if ct.len() < GCM_TAG_LEN {
        return Err(CryptoError::AeadEncrypt);
    }
    let tag_start = ct.len() - GCM_TAG_LEN;
    let tag: [u8; GCM_TAG_LEN] = ct[tag_start..]
        .try_into()
        .map_err(|_| CryptoError::AeadEncrypt)?;
    ct.truncate(tag_start);

    let iv: [u8; GCM_IV_LEN] = nonce.into();
    Ok((iv, tag, ct))
}

/// Decrypt one group message from its wire triplet parts.
pub fn decrypt_group(
    mk: &MessageKey,
    iv: &[u8],
    tag: &[u8],
    ciphertext: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if iv.len() != GCM_IV_LEN || tag.len() != GCM_TAG_LEN {
        return Err(CryptoError::AeadDecrypt);
    }
    let cipher = Aes256Gcm::new_from_slice(&mk.0).map_err(|_| CryptoError::AeadDecrypt)?;

    let mut data = Vec::with_capacity(ciphertext.len() + GCM_TAG_LEN);
    data.extend_from_slice(ciphertext);
    data.extend_from_slice(tag);

    let pt = cipher
        .decrypt(Nonce::from_slice(iv), data.as_slice())
        .map_err(|_| CryptoError::AeadDecrypt)?;
    Ok(Zeroizing::new(pt))
}
