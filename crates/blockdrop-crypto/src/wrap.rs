//! Key wrapping via X25519 key agreement.
//!
//! When an owner shares a file, the content key is wrapped separately for each
//! recipient. Every wrap uses a fresh ephemeral key, so two recipients' wrapped
//! keys are unrelated byte strings and dropping one never affects the other.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use blockdrop_core::KeyEnvelope;

use crate::envelope::{Envelope, MIN_ENVELOPE_LEN};
use crate::error::{CryptoError, Result};
use crate::key::{ContentKey, EphemeralKeyPair, X25519PublicKey, X25519StaticSecret};

/// A content key encrypted for one recipient.
///
/// Wire form: `base64(ephemeral_public (32 bytes) || envelope)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKey {
    /// Ephemeral X25519 public key (sender's side of ECDH).
    pub ephemeral_public: X25519PublicKey,

    /// The content key, sealed with the derived wrapping key.
    pub envelope: Envelope,
}

impl WrappedKey {
    /// Wrap `key` so that only the holder of `recipient_public`'s secret can
    /// recover it.
    pub fn wrap(key: &ContentKey, recipient_public: &X25519PublicKey) -> Result<Self> {
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();

        let shared = ephemeral.diffie_hellman(recipient_public);
        let wrap_key = shared.derive_wrapping_key(&ephemeral_public, recipient_public);

        let envelope = Envelope::seal(key.as_bytes(), &wrap_key)?;
        Ok(Self {
            ephemeral_public,
            envelope,
        })
    }

    /// Recover the content key with the recipient's secret.
    ///
    /// A different recipient's secret fails with `AuthenticationFailed`.
    pub fn unwrap(&self, recipient_secret: &X25519StaticSecret) -> Result<ContentKey> {
        let shared = recipient_secret.diffie_hellman(&self.ephemeral_public);
        let wrap_key =
            shared.derive_wrapping_key(&self.ephemeral_public, &recipient_secret.public_key());

        let key_bytes = self.envelope.open(&wrap_key)?;
        let arr: [u8; 32] = key_bytes.try_into().map_err(|b: Vec<u8>| {
            CryptoError::DecodeFailed(format!("wrapped key is {} bytes, expected 32", b.len()))
        })?;
        Ok(ContentKey::from_bytes(arr))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + self.envelope.len());
        out.extend_from_slice(self.ephemeral_public.as_bytes());
        out.extend_from_slice(&self.envelope.to_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 32 + MIN_ENVELOPE_LEN {
            return Err(CryptoError::DecodeFailed(format!(
                "wrapped key is {} bytes, need at least {}",
                bytes.len(),
                32 + MIN_ENVELOPE_LEN
            )));
        }
        let (public, rest) = bytes.split_at(32);
        let mut arr = [0u8; 32];
        arr.copy_from_slice(public);
        Ok(Self {
            ephemeral_public: X25519PublicKey::from_bytes(arr),
            envelope: Envelope::from_bytes(rest)?,
        })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    pub fn from_base64(s: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(s)
            .map_err(|e| CryptoError::DecodeFailed(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// The form the ledger stores.
    pub fn to_key_envelope(&self) -> KeyEnvelope {
        KeyEnvelope::new(self.to_base64())
    }

    pub fn from_key_envelope(envelope: &KeyEnvelope) -> Result<Self> {
        Self::from_base64(envelope.as_str())
    }
}
