use thiserror::Error;

use crate::groups::GroupEvent;
use crate::messenger::IncomingText;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The directory has no entry for a username.
    #[error("Unknown recipient: {0}")]
    Discovery(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// An envelope's signature does not verify under the key the
    /// directory returns for the claimed sender.
    #[error("Signature mismatch for claimed sender {0}")]
    SignatureMismatch(String),

    /// No local state for a group id (never joined, or already left).
    #[error("Unknown group: {0}")]
    UnknownGroup(String),

    #[error(transparent)]
    Proto(#[from] vp_proto::ProtoError),

    #[error(transparent)]
    Crypto(#[from] vp_crypto::CryptoError),

    #[error(transparent)]
    Store(#[from] vp_store::StoreError),

    /// A store failure stopped personal-inbox processing mid-batch.
    /// The relay hands records over exactly once, so the texts already
    /// authenticated are carried out here instead of being lost.
    #[error("Store failure interrupted inbox processing: {source}")]
    InboxBatchFailed {
        texts: Vec<IncomingText>,
        source: vp_store::StoreError,
    },

    /// Same, for group-inbox processing: events already decrypted are
    /// unrecoverable from the relay and travel with the error.
    #[error("Store failure interrupted group inbox processing: {source}")]
    GroupBatchFailed {
        events: Vec<GroupEvent>,
        source: vp_store::StoreError,
    },

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),
}
