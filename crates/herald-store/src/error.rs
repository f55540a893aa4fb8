use thiserror::Error;

/// Errors that can occur during reminder metadata operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An outcome was recorded for a tuple that was never claimed.
    #[error("no claim for recipient {recipient} campaign {campaign} offset {offset}")]
    ClaimNotFound {
        recipient: String,
        campaign: String,
        offset: u32,
    },

    /// The stored attachment payload could not be encoded.
    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
