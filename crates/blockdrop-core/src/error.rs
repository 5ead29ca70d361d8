//! Error types for BlockDrop core.

use thiserror::Error;

use crate::types::FileId;

/// Errors that can occur while parsing or replaying core types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("invalid content address: {0}")]
    InvalidAddress(String),

    #[error("invalid integrity hash: {0}")]
    InvalidIntegrityHash(String),

    #[error("unknown audit action: {0}")]
    UnknownAction(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("mutation does not apply to file {file_id}: {reason}")]
    Inconsistent { file_id: FileId, reason: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
