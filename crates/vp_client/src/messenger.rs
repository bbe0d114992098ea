//! 1:1 messaging over blinded inboxes.
//!
//! `Messenger` ties together the three injected capabilities: a
//! [`Directory`] for key resolution, a [`Transport`] for the dumb
//! relay, and a [`GroupStore`] for per-group ratchet state. All group
//! operations live in the `groups` module.
//!
//! Inbox processing is skip-and-continue: one malformed, undecryptable,
//! or forged record is logged and dropped; it never aborts the batch.
//! An envelope that decrypts but whose signature fails against the
//! directory key for the claimed sender is discarded as forged —
//! decryptability proves only that we were the addressee.

use chrono::Utc;

use vp_crypto::{blind, Identity};
use vp_proto::{envelope, InnerPayload, TransportRecord};
use vp_store::GroupStore;

use crate::directory::Directory;
use crate::error::ProtocolError;
use crate::transport::Transport;

/// A received, authenticated 1:1 or group text.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingText {
    pub sender: String,
    pub text: String,
    /// Sender-claimed creation time, epoch milliseconds.
    pub created_at: i64,
}

pub struct Messenger<D, T, S> {
    pub(crate) username: String,
    pub(crate) identity: Identity,
    pub(crate) directory: D,
    pub(crate) transport: T,
    pub(crate) store: S,
}

impl<D: Directory, T: Transport, S: GroupStore> Messenger<D, T, S> {
    pub fn new(username: &str, identity: Identity, directory: D, transport: T, store: S) -> Self {
        Self {
            username: username.to_string(),
            identity,
            directory,
            transport,
            store,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Our relay-independent address.
    pub fn address(&self) -> String {
        self.identity.address()
    }

    /// Seal a text to `recipient` and file it under their blinded inbox.
    pub async fn send_text(&self, recipient: &str, text: &str) -> Result<(), ProtocolError> {
        let payload = InnerPayload::Text {
            text: text.to_string(),
            sender_id: self.username.clone(),
            created_at: Utc::now().timestamp_millis(),
        };
        self.send_sealed(recipient, &payload).await
    }

    /// Seal any payload to a single recipient's personal inbox.
    pub(crate) async fn send_sealed(
        &self,
        recipient: &str,
        payload: &InnerPayload,
    ) -> Result<(), ProtocolError> {
        let entry = self.directory.resolve(recipient).await?;
        let envelope = envelope::seal_envelope(payload, &entry.encryption_key, &self.identity)?;
        self.transport
            .send(&blind::blind(recipient), TransportRecord::from_envelope(&envelope))
            .await
    }

    /// Drain our personal inbox. Text payloads are returned once their
    /// sender is authenticated; group control payloads (setup, key
    /// update) are applied to the store as a side effect.
    pub async fn fetch_messages(&self) -> Result<Vec<IncomingText>, ProtocolError> {
        let records = self.transport.fetch(&blind::blind(&self.username)).await?;
        let mut texts = Vec::new();

        for record in records {
            let env = match record.to_envelope() {
                Ok(env) => env,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed inbox record");
                    continue;
                }
            };
            let payload = match envelope::open_envelope(&env, &self.identity) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping undecryptable envelope");
                    continue;
                }
            };

            match payload {
                InnerPayload::Text {
                    text,
                    sender_id,
                    created_at,
                } => {
                    let entry = match self.directory.resolve(&sender_id).await {
                        Ok(entry) => entry,
                        Err(e) => {
                            tracing::warn!(claimed = %sender_id, error = %e,
                                "skipping message from unresolvable sender");
                            continue;
                        }
                    };
                    if envelope::verify_sender(&env, &entry.signing_key).is_err() {
                        tracing::warn!(claimed = %sender_id,
                            "discarding forged message: signature does not match directory key");
                        continue;
                    }
                    texts.push(IncomingText {
                        sender: sender_id,
                        text,
                        created_at,
                    });
                }
                InnerPayload::GroupSetup {
                    group_id,
                    group_inbox_id,
                    creator,
                    chain_key,
                    signing_pub_key,
                } => {
                    match self
                        .accept_group_setup(
                            &group_id,
                            &group_inbox_id,
                            &creator,
                            &chain_key,
                            &signing_pub_key,
                        )
                        .await
                    {
                        Ok(()) => {}
                        Err(ProtocolError::Store(source)) => {
                            return Err(ProtocolError::InboxBatchFailed { texts, source })
                        }
                        Err(e) => {
                            tracing::warn!(group = %group_id, error = %e,
                                "skipping invalid group setup");
                        }
                    }
                }
                InnerPayload::GroupKeyUpdate {
                    group_id,
                    chain_key,
                    signing_pub_key,
                } => {
                    match self
                        .accept_key_update(&env, &group_id, &chain_key, &signing_pub_key)
                        .await
                    {
                        Ok(()) => {}
                        Err(ProtocolError::Store(source)) => {
                            return Err(ProtocolError::InboxBatchFailed { texts, source })
                        }
                        Err(e) => {
                            tracing::warn!(group = %group_id, error = %e,
                                "skipping unattributable key update");
                        }
                    }
                }
                InnerPayload::GroupLeave { group_id, .. } => {
                    // Leave notices belong on the group inbox, in plaintext.
                    tracing::warn!(group = %group_id,
                        "skipping leave notice misdelivered to personal inbox");
                }
            }
        }

        Ok(texts)
    }
}
