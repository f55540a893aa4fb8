use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeraldError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Campaign roster error: {0}")]
    Roster(String),

    #[error("Metadata store error: {0}")]
    Store(String),

    #[error("Audit log error: {0}")]
    Audit(String),

    #[error("Transport error ({transport}): {reason}")]
    Transport { transport: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HeraldError {
    /// Short error code string for structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            HeraldError::Config(_) => "CONFIG_ERROR",
            HeraldError::Roster(_) => "ROSTER_ERROR",
            HeraldError::Store(_) => "STORE_ERROR",
            HeraldError::Audit(_) => "AUDIT_ERROR",
            HeraldError::Transport { .. } => "TRANSPORT_ERROR",
            HeraldError::Serialization(_) => "SERIALIZATION_ERROR",
            HeraldError::Io(_) => "IO_ERROR",
            HeraldError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, HeraldError>;
