//! Blinded inbox identifiers.
//!
//! The relay stores and serves records by opaque inbox id. Deriving the
//! id as a one-way hash of the recipient name hides the identifier from
//! the relay (not the content — that is the envelope's job). No secret
//! material is involved; the mapping is deterministic so any sender can
//! address any name. Nothing here ever stores or logs the reverse
//! mapping.
//!
//! Group inboxes mix in the creator's signing public key, so two
//! creators picking the same group name get distinct inboxes and the id
//! is unpredictable without the creator's key.

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;
use crate::identity::PublicKeyBytes;

/// Relay-visible inbox identifier: 64-char lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InboxId(String);

impl InboxId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Adopt an inbox id received from a peer (e.g. inside a group
    /// bootstrap payload). Must be 64-char lowercase hex.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let ok = s.len() == 64
            && s.bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !ok {
            return Err(CryptoError::InvalidKey(
                "inbox id must be 64 lowercase hex chars".into(),
            ));
        }
        Ok(Self(s.to_string()))
    }
}

impl std::fmt::Display for InboxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Blind a personal recipient name. Pure; defined for all strings.
pub fn blind(name: &str) -> InboxId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"vp-blind-v1\x00");
    hasher.update(name.to_lowercase().as_bytes());
    InboxId(hex::encode(hasher.finalize().as_bytes()))
}

/// Blind a group inbox from `(group name, creator signing key)`.
pub fn blind_group(group_name: &str, creator_signing_key: &PublicKeyBytes) -> InboxId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"vp-blind-group-v1\x00");
    hasher.update(group_name.to_lowercase().as_bytes());
    hasher.update(b"\x00");
    hasher.update(&creator_signing_key.0);
    InboxId(hex::encode(hasher.finalize().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    #[test]
    fn blind_is_deterministic_and_case_insensitive() {
        assert_eq!(blind("alice"), blind("alice"));
        assert_eq!(blind("Alice"), blind("alice"));
        assert_eq!(blind("alice").as_str().len(), 64);
    }

    #[test]
    fn distinct_names_blind_differently() {
        assert_ne!(blind("alice"), blind("bob"));
        assert_ne!(blind("alice"), blind("alice "));
    }

    #[test]
    fn group_inbox_depends_on_creator_key() {
        let a = Identity::generate();
        let b = Identity::generate();
        assert_ne!(
            blind_group("team", &a.signing_public),
            blind_group("team", &b.signing_public)
        );
        assert_eq!(
            blind_group("Team", &a.signing_public),
            blind_group("team", &a.signing_public)
        );
    }

    #[test]
    fn inbox_id_reveals_nothing_about_the_name() {
        // No reverse mapping exists anywhere: the id is the hash and
        // nothing else, so neither Display nor Debug can leak the name
        // (the hex alphabet cannot even spell it).
        let id = blind("alice");
        assert!(!format!("{id}").contains("alice"));
        assert!(!format!("{id:?}").contains("alice"));
        assert_eq!(format!("{id}"), id.as_str());
        assert!(id.as_str().bytes().all(|b| b.is_ascii_hexdigit()));

        let group = blind_group("alice", &Identity::generate().signing_public);
        assert!(!format!("{group:?}").contains("alice"));
    }

    #[test]
    fn from_hex_accepts_own_output_only() {
        let id = blind("alice");
        assert_eq!(InboxId::from_hex(id.as_str()).unwrap(), id);
        assert!(InboxId::from_hex("short").is_err());
        assert!(InboxId::from_hex(&id.as_str().to_uppercase()).is_err());
        assert!(InboxId::from_hex(&"g".repeat(64)).is_err());
    }

    #[test]
    fn personal_and_group_domains_are_separated() {
        let a = Identity::generate();
        assert_ne!(blind("team"), blind_group("team", &a.signing_public));
    }
}
