//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Mutation encoding/decoding error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored rows do not describe a valid ledger.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking task running a database call failed.
    #[error("blocking task failed: {0}")]
    Join(String),
}

impl From<blockdrop_core::CoreError> for StoreError {
    fn from(e: blockdrop_core::CoreError) -> Self {
        match e {
            blockdrop_core::CoreError::Serialization(msg) => StoreError::Serialization(msg),
            other => StoreError::InvalidData(other.to_string()),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
