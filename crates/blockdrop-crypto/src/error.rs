//! Error types for envelope encryption.

use thiserror::Error;

/// Errors that can occur during encryption, decryption or key handling.
///
/// `AuthenticationFailed` and `DecodeFailed` are kept apart so callers can
/// tell a wrong or stale key from a malformed blob.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The platform RNG or cipher primitives are inaccessible.
    #[error("crypto unavailable: {0}")]
    CryptoUnavailable(String),

    /// Primitive-level encryption failure.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Input is too short or not valid base64.
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    /// The authentication tag did not verify.
    #[error("authentication failed: wrong key or tampered data")]
    AuthenticationFailed,

    /// A key is not 64 lowercase hex characters.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
