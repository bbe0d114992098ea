//! Relay transport abstraction.
//!
//! The relay is append-and-drain storage keyed by blinded inbox id. It
//! never sees plaintext, usernames, or which inbox belongs to whom.
//! `fetch` drains: records are handed to the caller exactly once, so
//! skip decisions (malformed, forged, unknown sender) are final.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use vp_crypto::InboxId;
use vp_proto::TransportRecord;

use crate::error::ProtocolError;

#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, inbox: &InboxId, record: TransportRecord) -> Result<(), ProtocolError>;

    /// Drain the inbox. Empty vec when there is nothing pending.
    async fn fetch(&self, inbox: &InboxId) -> Result<Vec<TransportRecord>, ProtocolError>;
}

/// In-process relay double. Shared between test messengers via clone.
#[derive(Clone, Default)]
pub struct MemRelay {
    inner: Arc<Mutex<HashMap<String, Vec<TransportRecord>>>>,
}

impl MemRelay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for MemRelay {
    async fn send(&self, inbox: &InboxId, record: TransportRecord) -> Result<(), ProtocolError> {
        self.inner
            .lock()
            .await
            .entry(inbox.as_str().to_string())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn fetch(&self, inbox: &InboxId) -> Result<Vec<TransportRecord>, ProtocolError> {
        Ok(self
            .inner
            .lock()
            .await
            .remove(inbox.as_str())
            .unwrap_or_default())
    }
}
