//! vp_crypto — Veilpost cryptographic primitives
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize all secret material on drop.
//! - Public APIs return opaque newtypes to prevent accidental misuse.
//!
//! # Module layout
//! - `identity` — long-term Ed25519 signing + X25519 decryption keypairs,
//!               key-derived addresses, group-local signing keys
//! - `seal`     — hybrid sealed box (ephemeral X25519 + HKDF + AEAD)
//! - `ratchet`  — sender-keys chain ratchet + group message AEAD
//! - `aead`     — XChaCha20-Poly1305 encrypt/decrypt helpers
//! - `kdf`      — HKDF-SHA256 expansion
//! - `blind`    — blinded inbox identifiers (one-way BLAKE3 of names)
//! - `error`    — unified error type

pub mod aead;
pub mod blind;
pub mod error;
pub mod identity;
pub mod kdf;
pub mod ratchet;
pub mod seal;

pub use blind::InboxId;
pub use error::CryptoError;
pub use identity::{GroupSigningKey, Identity, PublicKeyBytes};
pub use ratchet::{ChainKey, MessageKey};
