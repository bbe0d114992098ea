use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Crypto error: {0}")]
    Crypto(#[from] vp_crypto::CryptoError),

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    /// The backend rejected the operation (out of space, closed pool,
    /// unreachable volume). Carried by custom store implementations.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
