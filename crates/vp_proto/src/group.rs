//! Persisted per-group protocol state.
//!
//! One `GroupState` per group, keyed by group id in the store. Mutated
//! on every sent/received group message (ratchet advance) and on every
//! membership change (rotation, removal); deleted on local leave.
//!
//! Invariants:
//! - `member_keys` never holds a key for a member who has left.
//! - `my_chain_key` is replaced wholesale (fresh entropy, never derived
//!   from the old key) immediately after any member departs.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use vp_crypto::{ChainKey, GroupSigningKey, InboxId, PublicKeyBytes};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupState {
    pub group_id: String,
    pub group_inbox_id: InboxId,
    /// Username of the creator (the party whose key the inbox id binds).
    pub creator: String,
    /// Our own sending chain. Replaced, never derived, on rotation.
    pub my_chain_key: ChainKey,
    /// Group-local signing keypair (secret half; distinct from the main
    /// identity key so group compromise stays scoped to the group).
    pub my_signing_key: GroupSigningKey,
    /// Known co-members, by username. Does not include self.
    pub members: BTreeSet<String>,
    /// Last-known chain key per co-member's sending track.
    pub member_keys: BTreeMap<String, ChainKey>,
    /// Group-local signing public key per co-member, base64.
    pub signing_keys: BTreeMap<String, String>,
}

impl GroupState {
    /// State for a freshly created group: invitees known, no chain keys
    /// for them yet (each will announce via its own first rotation or
    /// was bootstrapped out-of-band).
    pub fn new_created(
        group_id: String,
        group_inbox_id: InboxId,
        creator: String,
        members: BTreeSet<String>,
    ) -> Self {
        Self {
            group_id,
            group_inbox_id,
            creator,
            my_chain_key: ChainKey::random(),
            my_signing_key: GroupSigningKey::generate(),
            members,
            member_keys: BTreeMap::new(),
            signing_keys: BTreeMap::new(),
        }
    }

    /// State built from a received GROUP_SETUP: we only learn about the
    /// creator; other members surface as their traffic arrives with
    /// keys we have been given.
    pub fn from_setup(
        group_id: String,
        group_inbox_id: InboxId,
        creator: String,
        creator_chain_key: ChainKey,
        creator_signing_key: &PublicKeyBytes,
    ) -> Self {
        let mut members = BTreeSet::new();
        members.insert(creator.clone());
        let mut member_keys = BTreeMap::new();
        member_keys.insert(creator.clone(), creator_chain_key);
        let mut signing_keys = BTreeMap::new();
        signing_keys.insert(creator.clone(), creator_signing_key.to_b64());
        Self {
            group_id,
            group_inbox_id,
            creator,
            my_chain_key: ChainKey::random(),
            my_signing_key: GroupSigningKey::generate(),
            members,
            member_keys,
            signing_keys,
        }
    }

    /// Record (or replace) a co-member's sending track.
    pub fn set_member_key(&mut self, member: &str, chain_key: ChainKey, signing_key_b64: String) {
        self.members.insert(member.to_string());
        self.member_keys.insert(member.to_string(), chain_key);
        self.signing_keys.insert(member.to_string(), signing_key_b64);
    }

    /// Drop a departed member from every map. Callers must follow this
    /// with a full rotation of `my_chain_key` / `my_signing_key`.
    pub fn remove_member(&mut self, member: &str) {
        self.members.remove(member);
        self.member_keys.remove(member);
        self.signing_keys.remove(member);
    }

    /// Replace our own key material with fresh, unrelated entropy.
    pub fn rotate_own_keys(&mut self) {
        self.my_chain_key = ChainKey::random();
        self.my_signing_key = GroupSigningKey::generate();
    }
}
