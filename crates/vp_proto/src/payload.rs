//! Plaintext payload types (inside the encrypted envelope).
//!
//! A closed tagged union with a required `type` discriminant, decoded
//! exhaustively — unknown discriminants are a decode error, never a
//! silent fall-through. Exactly one variant per envelope.

use serde::{Deserialize, Serialize};

/// Deserialised plaintext carried inside an envelope or a group
/// message. Field names are fixed wire vocabulary (camelCase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InnerPayload {
    /// A human-visible message. `created_at` is epoch milliseconds.
    /// The claimed `sender_id` authenticates NOTHING by itself — the
    /// receiver must verify the envelope signature against the key the
    /// Directory returns for that name.
    #[serde(rename = "TEXT", rename_all = "camelCase")]
    Text {
        text: String,
        sender_id: String,
        created_at: i64,
    },

    /// Group bootstrap, sealed to each invitee's personal inbox.
    /// Carries no sender id; accepted without the usual sender
    /// authentication step (a documented protocol asymmetry — the
    /// creator is whoever `creator` claims, trusted on decryptability).
    #[serde(rename = "GROUP_SETUP", rename_all = "camelCase")]
    GroupSetup {
        group_id: String,
        group_inbox_id: String,
        creator: String,
        /// Creator's current chain key, base64.
        chain_key: String,
        /// Creator's group-local signing public key, base64.
        signing_pub_key: String,
    },

    /// Post-rotation key distribution, sealed to each remaining member.
    #[serde(rename = "GROUP_KEY_UPDATE", rename_all = "camelCase")]
    GroupKeyUpdate {
        group_id: String,
        chain_key: String,
        signing_pub_key: String,
    },

    /// Departure notice, broadcast to the group inbox as signed
    /// plaintext (it carries no secret).
    #[serde(rename = "GROUP_LEAVE", rename_all = "camelCase")]
    GroupLeave {
        group_id: String,
        sender_id: String,
    },
}

impl InnerPayload {
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
