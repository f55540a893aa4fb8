use thiserror::Error;

/// Errors that can occur during audit log operations.
#[derive(Debug, Error)]
pub enum AuditError {
    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A notes edit referenced a record that does not exist.
    #[error("send history record {id} not found")]
    RecordNotFound { id: i64 },
}

pub type Result<T> = std::result::Result<T, AuditError>;
