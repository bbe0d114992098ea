//! Encrypted message envelope — what the relay sees for 1:1 traffic.
//!
//! The relay is a DUMB STORE: it sees only an opaque ciphertext and an
//! opaque signature, filed under a blinded inbox id. It cannot see the
//! message type, plaintext, or true recipient name.
//!
//! Construction is encrypt-then-sign:
//!   ciphertext = sealed box of the payload JSON (vp_crypto::seal)
//!   signature  = Ed25519 over exactly the ciphertext bytes
//!
//! Any bit-flip in the ciphertext invalidates the signature check.
//! Signature verification is a SEPARATE step from decryption: the
//! verifying key comes from the Directory for the *claimed* sender,
//! never from the envelope itself.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

use vp_crypto::{identity, seal, Identity, PublicKeyBytes};

use crate::{error::ProtoError, payload::InnerPayload};

/// On-wire 1:1 envelope. Both fields base64url (no padding).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub ciphertext: String,
    pub signature: String,
}

/// Seal `payload` for the holder of `recipient_encryption_key` and sign
/// the resulting ciphertext with our identity key.
pub fn seal_envelope(
    payload: &InnerPayload,
    recipient_encryption_key: &PublicKeyBytes,
    sender: &Identity,
) -> Result<Envelope, ProtoError> {
    let plaintext = payload.to_json()?;
    let recipient_pub = recipient_encryption_key.to_x25519()?;
    let ciphertext = seal::seal(&recipient_pub, &plaintext)?;
    let signature = sender.sign(&ciphertext);
    Ok(Envelope {
        ciphertext: URL_SAFE_NO_PAD.encode(&ciphertext),
        signature: URL_SAFE_NO_PAD.encode(&signature),
    })
}

/// Decrypt an envelope addressed to us. Does NOT authenticate the
/// sender — callers must follow up with [`verify_sender`] against a
/// Directory-fetched key before trusting any claimed identity.
pub fn open_envelope(envelope: &Envelope, recipient: &Identity) -> Result<InnerPayload, ProtoError> {
    let ciphertext = URL_SAFE_NO_PAD
        .decode(&envelope.ciphertext)
        .map_err(vp_crypto::CryptoError::Base64Decode)?;
    let plaintext = seal::open(&recipient.decryption_secret(), &ciphertext)?;
    Ok(InnerPayload::from_json(&plaintext)?)
}

/// Check that the envelope's signature over its ciphertext verifies
/// under `signing_key`. A failure means the claimed sender did not
/// produce this envelope (or it was tampered with in transit).
pub fn verify_sender(envelope: &Envelope, signing_key: &PublicKeyBytes) -> Result<(), ProtoError> {
    let ciphertext = URL_SAFE_NO_PAD
        .decode(&envelope.ciphertext)
        .map_err(vp_crypto::CryptoError::Base64Decode)?;
    let signature = URL_SAFE_NO_PAD
        .decode(&envelope.signature)
        .map_err(vp_crypto::CryptoError::Base64Decode)?;
    identity::verify(signing_key, &ciphertext, &signature)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(sender: &str) -> InnerPayload {
        InnerPayload::Text {
            text: "hello".into(),
            sender_id: sender.into(),
            created_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn seal_open_verify_roundtrip() {
        let alice = Identity::generate();
        let bob = Identity::generate();

        let env = seal_envelope(&text("alice"), &bob.encryption_public, &alice).unwrap();
        let opened = open_envelope(&env, &bob).unwrap();
        assert_eq!(opened, text("alice"));
        verify_sender(&env, &alice.signing_public).unwrap();
    }

    #[test]
    fn open_with_wrong_key_fails() {
        let alice = Identity::generate();
        let bob = Identity::generate();
        let mallory = Identity::generate();

        let env = seal_envelope(&text("alice"), &bob.encryption_public, &alice).unwrap();
        assert!(open_envelope(&env, &mallory).is_err());
    }

    #[test]
    fn single_byte_tamper_breaks_signature() {
        let alice = Identity::generate();
        let bob = Identity::generate();

        let env = seal_envelope(&text("alice"), &bob.encryption_public, &alice).unwrap();
        let mut ct = URL_SAFE_NO_PAD.decode(&env.ciphertext).unwrap();
        let mid = ct.len() / 2;
        ct[mid] ^= 0x01;
        let tampered = Envelope {
            ciphertext: URL_SAFE_NO_PAD.encode(&ct),
            signature: env.signature.clone(),
        };
        assert!(verify_sender(&tampered, &alice.signing_public).is_err());
    }

    #[test]
    fn signature_from_other_key_rejected() {
        let alice = Identity::generate();
        let bob = Identity::generate();
        let mallory = Identity::generate();

        let env = seal_envelope(&text("alice"), &bob.encryption_public, &alice).unwrap();
        assert!(verify_sender(&env, &mallory.signing_public).is_err());
    }
}
