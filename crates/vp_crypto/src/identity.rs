//! Identity key management
//!
//! Each pseudonymous identity holds two long-term keypairs:
//!   - Ed25519 signing key  — authenticates envelopes and leave notices
//!   - X25519 decryption key — opens sealed boxes addressed to us
//!
//! The identity's *address* is derived from the signing public key
//! (BLAKE3, truncated to 20 bytes, lowercase hex). Receivers compare a
//! directory-fetched address against the key that actually verified a
//! signature — a valid signature alone only proves "signed by *some*
//! key", never "signed by the claimed username".
//!
//! Groups additionally use a `GroupSigningKey`: a group-local Ed25519
//! keypair distinct from the main identity key, so compromise of group
//! key material never reaches the identity itself.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use zeroize::ZeroizeOnDrop;

use crate::error::CryptoError;

// ── Newtype wrappers ──────────────────────────────────────────────────────────

/// 32-byte public key, base64url-encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKeyBytes(pub Vec<u8>);

impl PublicKeyBytes {
    pub fn to_b64(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }

    pub fn from_b64(s: &str) -> Result<Self, CryptoError> {
        let bytes = URL_SAFE_NO_PAD.decode(s)?;
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKey(format!(
                "Public key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    /// Address derived from this key: BLAKE3, truncated to 20 bytes
    /// (160 bits), lowercase hex. One-way; collision-resistant.
    pub fn address(&self) -> String {
        let hash = blake3::hash(&self.0);
        hex::encode(&hash.as_bytes()[..20])
    }

    fn as_array(&self) -> Result<[u8; 32], CryptoError> {
        self.0
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("public key not 32 bytes".into()))
    }

    pub fn to_x25519(&self) -> Result<X25519Public, CryptoError> {
        Ok(X25519Public::from(self.as_array()?))
    }
}

// ── Identity ──────────────────────────────────────────────────────────────────

/// Long-term local identity. Exclusively owned by the local process;
/// secret halves are never transmitted. Drop clears memory.
#[derive(ZeroizeOnDrop)]
pub struct Identity {
    signing_secret: [u8; 32],
    decryption_secret: [u8; 32],
    #[zeroize(skip)]
    pub signing_public: PublicKeyBytes,
    #[zeroize(skip)]
    pub encryption_public: PublicKeyBytes,
}

impl Identity {
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let decryption_key = StaticSecret::random_from_rng(OsRng);
        let signing_public =
            PublicKeyBytes(signing_key.verifying_key().to_bytes().to_vec());
        let encryption_public =
            PublicKeyBytes(X25519Public::from(&decryption_key).as_bytes().to_vec());
        Self {
            signing_secret: signing_key.to_bytes(),
            decryption_secret: decryption_key.to_bytes(),
            signing_public,
            encryption_public,
        }
    }

    pub fn from_secret_bytes(
        signing: &[u8],
        decryption: &[u8],
    ) -> Result<Self, CryptoError> {
        let signing: [u8; 32] = signing
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("signing key must be 32 bytes".into()))?;
        let decryption: [u8; 32] = decryption
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("decryption key must be 32 bytes".into()))?;
        let signing_key = SigningKey::from_bytes(&signing);
        let decryption_key = StaticSecret::from(decryption);
        Ok(Self {
            signing_secret: signing,
            decryption_secret: decryption,
            signing_public: PublicKeyBytes(signing_key.verifying_key().to_bytes().to_vec()),
            encryption_public: PublicKeyBytes(
                X25519Public::from(&decryption_key).as_bytes().to_vec(),
            ),
        })
    }

    /// Our relay-independent address (derived from the signing key).
    pub fn address(&self) -> String {
        self.signing_public.address()
    }

    /// Sign arbitrary bytes; returns the 64-byte raw Ed25519 signature.
    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        SigningKey::from_bytes(&self.signing_secret)
            .sign(msg)
            .to_bytes()
            .to_vec()
    }

    /// The X25519 secret used to open sealed boxes addressed to us.
    pub fn decryption_secret(&self) -> StaticSecret {
        StaticSecret::from(self.decryption_secret)
    }
}

/// Verify a signature made by any Ed25519 public key.
pub fn verify(public: &PublicKeyBytes, msg: &[u8], sig_bytes: &[u8]) -> Result<(), CryptoError> {
    let vk = VerifyingKey::from_bytes(&public.as_array()?)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
    let sig = Signature::from_bytes(
        sig_bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("Bad sig len".into()))?,
    );
    vk.verify(msg, &sig)
        .map_err(|_| CryptoError::SignatureVerification)
}

// ── Group-local signing key ───────────────────────────────────────────────────

/// Ed25519 keypair scoped to a single group membership. Serialised
/// (base64 secret) inside `GroupState`, which is itself encrypted at
/// rest by the store.
#[derive(Clone, ZeroizeOnDrop)]
pub struct GroupSigningKey {
    secret: [u8; 32],
}

impl GroupSigningKey {
    pub fn generate() -> Self {
        Self {
            secret: SigningKey::generate(&mut OsRng).to_bytes(),
        }
    }

    pub fn public(&self) -> PublicKeyBytes {
        PublicKeyBytes(
            SigningKey::from_bytes(&self.secret)
                .verifying_key()
                .to_bytes()
                .to_vec(),
        )
    }

    pub fn sign(&self, msg: &[u8]) -> Vec<u8> {
        SigningKey::from_bytes(&self.secret)
            .sign(msg)
            .to_bytes()
            .to_vec()
    }
}

impl std::fmt::Debug for GroupSigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupSigningKey").finish_non_exhaustive()
    }
}

impl Serialize for GroupSigningKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&URL_SAFE_NO_PAD.encode(self.secret))
    }
}

impl<'de> Deserialize<'de> for GroupSigningKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(&s)
            .map_err(serde::de::Error::custom)?;
        let secret: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))?;
        Ok(Self { secret })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let id = Identity::generate();
        let sig = id.sign(b"payload");
        verify(&id.signing_public, b"payload", &sig).unwrap();
    }

    #[test]
    fn verify_rejects_other_key() {
        let a = Identity::generate();
        let b = Identity::generate();
        let sig = a.sign(b"payload");
        assert!(verify(&b.signing_public, b"payload", &sig).is_err());
    }

    #[test]
    fn address_is_deterministic_and_key_bound() {
        let id = Identity::generate();
        assert_eq!(id.address(), id.signing_public.address());
        assert_eq!(id.address().len(), 40);
        let other = Identity::generate();
        assert_ne!(id.address(), other.address());
    }

    #[test]
    fn group_signing_key_survives_serde() {
        let gk = GroupSigningKey::generate();
        let json = serde_json::to_string(&gk).unwrap();
        let back: GroupSigningKey = serde_json::from_str(&json).unwrap();
        let sig = back.sign(b"notice");
        verify(&gk.public(), b"notice", &sig).unwrap();
    }
}
