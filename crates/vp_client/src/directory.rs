//! Username → public key resolution.
//!
//! The directory is the protocol's only source of verifying keys: an
//! envelope's claimed sender means nothing until its signature checks
//! out against the key the directory returns for that name. The entry
//! also carries the key-derived address so callers can cross-check
//! that the keys on file actually belong to the name's address.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use vp_crypto::{Identity, PublicKeyBytes};

use crate::error::ProtocolError;

/// Published key material for one username.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub username: String,
    /// Ed25519 — verifies envelope signatures.
    pub signing_key: PublicKeyBytes,
    /// X25519 — seals envelopes to this user.
    pub encryption_key: PublicKeyBytes,
    /// Derived from `signing_key`; see `PublicKeyBytes::address`.
    pub address: String,
}

impl DirectoryEntry {
    pub fn from_identity(username: &str, identity: &Identity) -> Self {
        Self {
            username: username.to_string(),
            signing_key: identity.signing_public.clone(),
            encryption_key: identity.encryption_public.clone(),
            address: identity.address(),
        }
    }
}

/// Resolution capability injected into the messenger. A production
/// impl fronts a key server; tests use [`MemDirectory`].
#[allow(async_fn_in_trait)]
pub trait Directory {
    async fn resolve(&self, username: &str) -> Result<DirectoryEntry, ProtocolError>;
}

/// In-process directory double.
#[derive(Clone, Default)]
pub struct MemDirectory {
    inner: Arc<RwLock<HashMap<String, DirectoryEntry>>>,
}

impl MemDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, entry: DirectoryEntry) {
        self.inner
            .write()
            .await
            .insert(entry.username.clone(), entry);
    }
}

impl Directory for MemDirectory {
    async fn resolve(&self, username: &str) -> Result<DirectoryEntry, ProtocolError> {
        self.inner
            .read()
            .await
            .get(username)
            .cloned()
            .ok_or_else(|| ProtocolError::Discovery(username.to_string()))
    }
}
