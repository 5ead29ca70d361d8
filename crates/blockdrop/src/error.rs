//! Error types for the Vault.

use std::time::Duration;

use blockdrop_cache::ContentStoreError;
use blockdrop_crypto::CryptoError;
use blockdrop_ledger::LedgerError;
use blockdrop_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Vault workflows.
///
/// Each variant keeps the component's own error intact, so callers can still
/// tell `AccessExpired` from `NotFound` from `AuthenticationFailed`.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Access-control decision or ledger persistence failure.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Encryption, decryption or key handling failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The content store failed or had no such blob.
    #[error("content store error: {0}")]
    Content(#[from] ContentStoreError),

    /// Ledger storage could not be opened.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The content fetch did not finish in time.
    #[error("content fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The payload exceeds the upload limit.
    #[error("payload of {size} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },
}

/// Result type for Vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
