//! AES-256-GCM envelopes.
//!
//! An envelope is `nonce (12 bytes) || ciphertext || tag (16 bytes)`, carried
//! as base64 at the wire boundary.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, Result};
use crate::key::ContentKey;

/// Nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Shortest valid envelope: a nonce and a tag over empty plaintext.
pub const MIN_ENVELOPE_LEN: usize = NONCE_LEN + TAG_LEN;

/// An authenticated-encrypted payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    nonce: [u8; NONCE_LEN],
    /// Ciphertext with the tag appended.
    sealed: Vec<u8>,
}

impl Envelope {
    /// Encrypt `plaintext` under `key` with a freshly drawn nonce.
    pub fn seal(plaintext: &[u8], key: &ContentKey) -> Result<Self> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| CryptoError::CryptoUnavailable(e.to_string()))?;
        Self::seal_with_nonce(plaintext, key, nonce)
    }

    /// Encrypt with a caller-chosen nonce.
    ///
    /// Reusing a nonce under the same key breaks GCM. Only known-answer tests
    /// should call this directly.
    pub fn seal_with_nonce(
        plaintext: &[u8],
        key: &ContentKey,
        nonce: [u8; NONCE_LEN],
    ) -> Result<Self> {
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::CryptoUnavailable(e.to_string()))?;
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        Ok(Self { nonce, sealed })
    }

    /// Authenticate and decrypt.
    pub fn open(&self, key: &ContentKey) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::CryptoUnavailable(e.to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(&self.nonce), self.sealed.as_slice())
            .map_err(|_| CryptoError::AuthenticationFailed)
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    /// Length of the raw encoding.
    pub fn len(&self) -> usize {
        NONCE_LEN + self.sealed.len()
    }

    /// Always false; an envelope carries at least a nonce and a tag.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Raw encoding: `nonce || ciphertext || tag`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.sealed);
        out
    }

    /// Split a raw encoding. Inputs shorter than 28 bytes fail `DecodeFailed`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_ENVELOPE_LEN {
            return Err(CryptoError::DecodeFailed(format!(
                "envelope is {} bytes, need at least {}",
                bytes.len(),
                MIN_ENVELOPE_LEN
            )));
        }
        let (nonce, sealed) = bytes.split_at(NONCE_LEN);
        let mut arr = [0u8; NONCE_LEN];
        arr.copy_from_slice(nonce);
        Ok(Self {
            nonce: arr,
            sealed: sealed.to_vec(),
        })
    }

    /// Wire encoding.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    pub fn from_base64(s: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(s)
            .map_err(|e| CryptoError::DecodeFailed(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}
