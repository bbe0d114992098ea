//! Hybrid sealed box: ephemeral X25519 key agreement + AEAD.
//!
//! Wire format:
//!   [ ephemeral X25519 public (32 bytes) | aead::encrypt output ]
//!
//! The AEAD key is HKDF-SHA256 of the ephemeral DH shared secret, with
//! both public keys bound into the info string so a ciphertext cannot
//! be re-targeted at a different recipient. Only the holder of the
//! recipient's matching X25519 secret can recover the plaintext.
//!
//! Sealing says nothing about WHO sealed: sender authentication is a
//! separate signature over the ciphertext bytes (see vp_proto::envelope).

use rand::rngs::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey as X25519Public, StaticSecret};
use zeroize::Zeroizing;

use crate::{aead, error::CryptoError, kdf};

const SEAL_SALT: &[u8] = b"vp-seal-v1";
const SEAL_AAD: &[u8] = b"vp-seal";

fn seal_key(
    shared: &[u8; 32],
    ephemeral_pub: &X25519Public,
    recipient_pub: &X25519Public,
) -> Result<[u8; 32], CryptoError> {
    let mut info = Vec::with_capacity(64);
    info.extend_from_slice(ephemeral_pub.as_bytes());
    info.extend_from_slice(recipient_pub.as_bytes());
    let mut key = [0u8; 32];
    kdf::hkdf_expand(shared, Some(SEAL_SALT), &info, &mut key)?;
    Ok(key)
}

/// Encrypt `plaintext` so that only the holder of the X25519 secret
/// matching `recipient_pub` can open it.
pub fn seal(recipient_pub: &X25519Public, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let ephemeral = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_pub = X25519Public::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(recipient_pub);

    let key = seal_key(shared.as_bytes(), &ephemeral_pub, recipient_pub)?;
    let ct = aead::encrypt(&key, plaintext, SEAL_AAD)?;

    let mut out = Vec::with_capacity(32 + ct.len());
    out.extend_from_slice(ephemeral_pub.as_bytes());
    out.extend_from_slice(&ct);
    Ok(out)
}

/// Open a sealed box with our X25519 decryption secret.
pub fn open(
    recipient_secret: &StaticSecret,
    data: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if data.len() < 32 {
        return Err(CryptoError::SealedBoxOpen);
    }
    let (eph_bytes, ct) = data.split_at(32);
    let eph_arr: [u8; 32] = eph_bytes
        .try_into()
        .map_err(|_| CryptoError::SealedBoxOpen)?;
    let ephemeral_pub = X25519Public::from(eph_arr);
    let recipient_pub = X25519Public::from(recipient_secret);

    let shared = recipient_secret.diffie_hellman(&ephemeral_pub);
    let key = seal_key(shared.as_bytes(), &ephemeral_pub, &recipient_pub)?;

    aead::decrypt(&key, ct, SEAL_AAD).map_err(|_| CryptoError::SealedBoxOpen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    #[test]
    fn seal_open_roundtrip() {
        let recipient = Identity::generate();
        let pub_key = recipient.encryption_public.to_x25519().unwrap();
        let sealed = seal(&pub_key, b"for your eyes only").unwrap();
        let opened = open(&recipient.decryption_secret(), &sealed).unwrap();
        assert_eq!(&opened[..], b"for your eyes only");
    }

    #[test]
    fn wrong_recipient_cannot_open() {
        let recipient = Identity::generate();
        let eavesdropper = Identity::generate();
        let pub_key = recipient.encryption_public.to_x25519().unwrap();
        let sealed = seal(&pub_key, b"secret").unwrap();
        assert!(open(&eavesdropper.decryption_secret(), &sealed).is_err());
    }

    #[test]
    fn short_input_rejected() {
        let recipient = Identity::generate();
        assert!(open(&recipient.decryption_secret(), &[0u8; 16]).is_err());
    }
}
