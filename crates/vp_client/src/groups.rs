//! Group messaging and membership.
//!
//! One sender-keys chain per member. Our own chain key is advanced and
//! PERSISTED before the derived message key touches a payload — a send
//! retried after a store failure must never reuse a message key.
//!
//! Departure protocol: the leaver broadcasts a signed plaintext
//! GROUP_LEAVE to the group inbox and deletes local state. Every
//! remaining member, on observing the notice, purges the leaver,
//! replaces its own chain and signing keys with fresh entropy, and
//! seals a GROUP_KEY_UPDATE to each remaining member's personal inbox.
//! The departed member never sees post-departure key material.

use std::collections::BTreeSet;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use futures::future::join_all;

use vp_crypto::{blind, identity, ratchet, ChainKey, InboxId, PublicKeyBytes};
use vp_proto::{wire, GroupState, InnerPayload, TransportRecord};
use vp_store::GroupStore;

use crate::directory::Directory;
use crate::error::ProtocolError;
use crate::messenger::{IncomingText, Messenger};
use crate::transport::Transport;

/// Outcome of fanning a sealed payload out to a member list. Partial
/// failure is reported, not raised: delivered members have the data.
#[derive(Debug, Default)]
pub struct DistributionReport {
    pub delivered: Vec<String>,
    /// (member, reason) per failed send.
    pub failed: Vec<(String, String)>,
}

impl DistributionReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// What draining a group inbox produced.
#[derive(Debug)]
pub enum GroupEvent {
    Message(IncomingText),
    /// A member left; our keys were rotated and redistributed.
    MemberLeft {
        member: String,
        rotation: DistributionReport,
    },
}

impl<D: Directory, T: Transport, S: GroupStore> Messenger<D, T, S> {
    /// Create a group and seal its bootstrap to every invitee. Local
    /// state is persisted before any network send.
    pub async fn create_group(
        &self,
        group_name: &str,
        invitees: &[String],
    ) -> Result<DistributionReport, ProtocolError> {
        let inbox = blind::blind_group(group_name, &self.identity.signing_public);
        let state = GroupState::new_created(
            group_name.to_string(),
            inbox.clone(),
            self.username.clone(),
            invitees.iter().cloned().collect::<BTreeSet<_>>(),
        );
        self.store.put(&state).await?;

        let setup = InnerPayload::GroupSetup {
            group_id: state.group_id.clone(),
            group_inbox_id: inbox.as_str().to_string(),
            creator: self.username.clone(),
            chain_key: state.my_chain_key.to_b64(),
            signing_pub_key: state.my_signing_key.public().to_b64(),
        };
        let report = self.distribute(invitees.to_vec(), &setup).await;
        tracing::info!(group = %state.group_id, delivered = report.delivered.len(),
            failed = report.failed.len(), "group created");
        Ok(report)
    }

    /// Advance our chain, persist, then encrypt and post to the group
    /// inbox as the hex triplet.
    pub async fn send_group_message(
        &self,
        group_id: &str,
        text: &str,
    ) -> Result<(), ProtocolError> {
        let mut state = self.require_group(group_id).await?;

        let (mk, next) = ratchet::advance(&state.my_chain_key)?;
        state.my_chain_key = next;
        // Persist first: if this fails, the message key is never used
        // and a retry re-derives the same step safely.
        self.store.put(&state).await?;

        let payload = InnerPayload::Text {
            text: text.to_string(),
            sender_id: self.username.clone(),
            created_at: Utc::now().timestamp_millis(),
        };
        let (iv, tag, ct) = ratchet::encrypt_group(&mk, &payload.to_json()?)?;
        let record = TransportRecord {
            message: wire::encode_triplet(&iv, &tag, &ct),
            signature: None,
            sender_id: Some(self.username.clone()),
            id: None,
        };
        self.transport.send(&state.group_inbox_id, record).await
    }

    /// Drain the group inbox. Messages from tracked members are
    /// decrypted and their chains advanced; authenticated leave notices
    /// trigger removal, rotation, and key redistribution. Everything
    /// else is logged and skipped.
    pub async fn fetch_group_messages(
        &self,
        group_id: &str,
    ) -> Result<Vec<GroupEvent>, ProtocolError> {
        let mut state = self.require_group(group_id).await?;
        let records = self.transport.fetch(&state.group_inbox_id).await?;
        let mut events = Vec::new();

        for record in records {
            // Control notices are plaintext JSON; everything else is a triplet.
            if let Ok(InnerPayload::GroupLeave {
                group_id: claimed_group,
                sender_id,
            }) = InnerPayload::from_json(record.message.as_bytes())
            {
                if claimed_group != group_id {
                    tracing::warn!(group = %group_id, claimed = %claimed_group,
                        "skipping leave notice for a different group");
                    continue;
                }
                if sender_id == self.username {
                    continue;
                }
                match self.apply_leave(&mut state, &record, &sender_id).await {
                    Ok(rotation) => {
                        events.push(GroupEvent::MemberLeft {
                            member: sender_id,
                            rotation,
                        });
                    }
                    Err(ProtocolError::Store(source)) => {
                        return Err(ProtocolError::GroupBatchFailed { events, source })
                    }
                    Err(e) => {
                        tracing::warn!(group = %group_id, claimed = %sender_id, error = %e,
                            "skipping unauthenticated leave notice");
                    }
                }
                continue;
            }

            let Some(sender) = record.sender_id.clone() else {
                tracing::warn!(group = %group_id, "skipping group record without sender id");
                continue;
            };
            if sender == self.username {
                continue; // our own send echoed back
            }
            let Some(chain) = state.member_keys.get(&sender) else {
                tracing::warn!(group = %group_id, sender = %sender,
                    "skipping message from sender with no tracked chain");
                continue;
            };

            let (iv, tag, ct) = match wire::decode_triplet(&record.message) {
                Ok(parts) => parts,
                Err(e) => {
                    tracing::warn!(group = %group_id, error = %e,
                        "skipping malformed group record");
                    continue;
                }
            };
            let (mk, next) = ratchet::advance(chain)?;
            let plaintext = match ratchet::decrypt_group(&mk, &iv, &tag, &ct) {
                Ok(pt) => pt,
                Err(e) => {
                    // Chain left untouched; a desynced sender stays desynced
                    // rather than corrupting our view of their track.
                    tracing::warn!(group = %group_id, sender = %sender, error = %e,
                        "skipping undecryptable group message");
                    continue;
                }
            };
            let payload = match InnerPayload::from_json(&plaintext) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(group = %group_id, sender = %sender, error = %e,
                        "skipping group message with invalid payload");
                    continue;
                }
            };
            let InnerPayload::Text {
                text,
                sender_id,
                created_at,
            } = payload
            else {
                tracing::warn!(group = %group_id, sender = %sender,
                    "skipping non-text payload in group message");
                continue;
            };
            if sender_id != sender {
                tracing::warn!(group = %group_id, outer = %sender, inner = %sender_id,
                    "skipping group message with mismatched sender ids");
                continue;
            }

            // Persist the advanced track before surfacing the message:
            // a replay of this record can never decrypt again.
            state.member_keys.insert(sender.clone(), next);
            let event = GroupEvent::Message(IncomingText {
                sender,
                text,
                created_at,
            });
            if let Err(source) = self.store.put(&state).await {
                // The relay has already handed this batch over; the
                // decrypted texts cannot be re-fetched, so they travel
                // with the error instead of being dropped.
                events.push(event);
                return Err(ProtocolError::GroupBatchFailed { events, source });
            }
            events.push(event);
        }

        Ok(events)
    }

    /// Broadcast a signed departure notice, then delete local state.
    /// After this returns we can neither read nor send in the group.
    pub async fn leave_group(&self, group_id: &str) -> Result<(), ProtocolError> {
        let state = self.require_group(group_id).await?;

        let payload = InnerPayload::GroupLeave {
            group_id: group_id.to_string(),
            sender_id: self.username.clone(),
        };
        let message = serde_json::to_string(&payload)?;
        let signature = URL_SAFE_NO_PAD.encode(state.my_signing_key.sign(message.as_bytes()));
        let record = TransportRecord {
            message,
            signature: Some(signature),
            sender_id: Some(self.username.clone()),
            id: None,
        };
        self.transport.send(&state.group_inbox_id, record).await?;
        self.store.delete(group_id).await?;
        tracing::info!(group = %group_id, "left group");
        Ok(())
    }

    // ── Control payload handlers ──────────────────────────────────────────

    /// Adopt state from a received GROUP_SETUP. Duplicate setups for a
    /// group we already track are ignored — replay must not reset our
    /// view of the creator's chain.
    pub(crate) async fn accept_group_setup(
        &self,
        group_id: &str,
        group_inbox_id: &str,
        creator: &str,
        chain_key: &str,
        signing_pub_key: &str,
    ) -> Result<(), ProtocolError> {
        if self.store.get(group_id).await?.is_some() {
            tracing::warn!(group = %group_id, "ignoring duplicate group setup");
            return Ok(());
        }
        let inbox = InboxId::from_hex(group_inbox_id)?;
        let creator_chain = ChainKey::from_b64(chain_key)?;
        let creator_signing = PublicKeyBytes::from_b64(signing_pub_key)?;
        let state = GroupState::from_setup(
            group_id.to_string(),
            inbox,
            creator.to_string(),
            creator_chain,
            &creator_signing,
        );
        self.store.put(&state).await?;

        // Announce our own track so existing members can read our
        // messages and authenticate our future leave notice.
        let announce = InnerPayload::GroupKeyUpdate {
            group_id: group_id.to_string(),
            chain_key: state.my_chain_key.to_b64(),
            signing_pub_key: state.my_signing_key.public().to_b64(),
        };
        let members: Vec<String> = state.members.iter().cloned().collect();
        let report = self.distribute(members, &announce).await;
        if !report.is_complete() {
            tracing::warn!(group = %group_id, failed = report.failed.len(),
                "key announcement reached only part of the group");
        }
        tracing::info!(group = %group_id, creator = %creator, "joined group from setup");
        Ok(())
    }

    /// Apply a GROUP_KEY_UPDATE. The payload carries no sender id, so
    /// the sender is whichever current member's directory signing key
    /// verifies the envelope signature; no match means the update is
    /// unattributable and must be dropped.
    pub(crate) async fn accept_key_update(
        &self,
        env: &vp_proto::Envelope,
        group_id: &str,
        chain_key: &str,
        signing_pub_key: &str,
    ) -> Result<(), ProtocolError> {
        let mut state = self.require_group(group_id).await?;

        let mut sender = None;
        for member in &state.members {
            let Ok(entry) = self.directory.resolve(member).await else {
                continue;
            };
            if vp_proto::envelope::verify_sender(env, &entry.signing_key).is_ok() {
                sender = Some(member.clone());
                break;
            }
        }
        let sender =
            sender.ok_or_else(|| ProtocolError::SignatureMismatch("<no member matched>".into()))?;

        state.set_member_key(&sender, ChainKey::from_b64(chain_key)?, signing_pub_key.to_string());
        self.store.put(&state).await?;
        tracing::info!(group = %group_id, member = %sender, "applied key update");
        Ok(())
    }

    // ── Internals ─────────────────────────────────────────────────────────

    async fn require_group(&self, group_id: &str) -> Result<GroupState, ProtocolError> {
        self.store
            .get(group_id)
            .await?
            .ok_or_else(|| ProtocolError::UnknownGroup(group_id.to_string()))
    }

    /// Authenticate a leave notice against the leaver's group-local
    /// signing key, then remove, rotate, persist, and redistribute.
    async fn apply_leave(
        &self,
        state: &mut GroupState,
        record: &TransportRecord,
        sender: &str,
    ) -> Result<DistributionReport, ProtocolError> {
        let key_b64 = state
            .signing_keys
            .get(sender)
            .ok_or_else(|| ProtocolError::SignatureMismatch(sender.to_string()))?;
        let key = PublicKeyBytes::from_b64(key_b64)?;
        let sig_b64 = record.signature.as_deref().ok_or_else(|| {
            vp_proto::ProtoError::MalformedRecord("leave notice without signature".into())
        })?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(vp_crypto::CryptoError::Base64Decode)?;
        identity::verify(&key, record.message.as_bytes(), &sig)
            .map_err(|_| ProtocolError::SignatureMismatch(sender.to_string()))?;

        state.remove_member(sender);
        state.rotate_own_keys();
        self.store.put(state).await?;

        let update = InnerPayload::GroupKeyUpdate {
            group_id: state.group_id.clone(),
            chain_key: state.my_chain_key.to_b64(),
            signing_pub_key: state.my_signing_key.public().to_b64(),
        };
        let members: Vec<String> = state.members.iter().cloned().collect();
        let report = self.distribute(members, &update).await;
        tracing::info!(group = %state.group_id, departed = %sender,
            delivered = report.delivered.len(), failed = report.failed.len(),
            "rotated keys after departure");
        Ok(report)
    }

    /// Concurrent fan-out of one sealed payload to many members. One
    /// failed send never blocks the others.
    async fn distribute(&self, members: Vec<String>, payload: &InnerPayload) -> DistributionReport {
        let sends = members.into_iter().map(|member| async move {
            let result = self.send_sealed(&member, payload).await;
            (member, result)
        });

        let mut report = DistributionReport::default();
        for (member, result) in join_all(sends).await {
            match result {
                Ok(()) => report.delivered.push(member),
                Err(e) => {
                    tracing::warn!(member = %member, error = %e, "distribution send failed");
                    report.failed.push((member, e.to_string()));
                }
            }
        }
        report
    }
}
