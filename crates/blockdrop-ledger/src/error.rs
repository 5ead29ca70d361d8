//! Error types for the access ledger.

use blockdrop_core::{FileId, Identity};
use blockdrop_store::StoreError;
use thiserror::Error;

/// Errors that can occur during ledger operations.
///
/// Everything except `Store` is an access-control decision and must abort the
/// caller's workflow.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No file with this id (`id == 0` or beyond the file count).
    #[error("file not found: {0}")]
    NotFound(FileId),

    /// The caller does not own the file.
    #[error("caller {caller} is not the owner of file {file_id}")]
    NotOwner { file_id: FileId, caller: Identity },

    /// The recipient is the null identity or the owner.
    #[error("invalid recipient {recipient} for file {file_id}")]
    InvalidRecipient { file_id: FileId, recipient: Identity },

    /// No active permission to revoke.
    #[error("access not granted to {recipient} on file {file_id}")]
    NotGranted { file_id: FileId, recipient: Identity },

    /// The caller has no active permission.
    #[error("access denied to file {file_id} for {caller}")]
    AccessDenied { file_id: FileId, caller: Identity },

    /// The caller's permission has expired.
    #[error("access to file {file_id} expired at {expired_at}")]
    AccessExpired { file_id: FileId, expired_at: i64 },

    /// The file was deactivated.
    #[error("file {0} is inactive")]
    FileInactive(FileId),

    /// Persistence failure. The mutation was not applied.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
