use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("Malformed wire record: {0}")]
    MalformedRecord(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] vp_crypto::CryptoError),

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),
}
