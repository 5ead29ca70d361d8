//! Known-answer vectors for the envelope format.
//!
//! AES-256-GCM with a fixed key and nonce is deterministic, so these envelopes
//! pin the wire format: `base64(nonce || ciphertext || tag)`.

use blockdrop_crypto::{ContentKey, Envelope};

/// A known-answer envelope vector.
#[derive(Debug, Clone)]
pub struct EnvelopeVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Content key, 64 lowercase hex characters.
    pub key_hex: &'static str,
    /// 12-byte nonce.
    pub nonce: [u8; 12],
    /// Plaintext bytes.
    pub plaintext: &'static [u8],
    /// Expected envelope, standard base64 with padding.
    pub envelope_base64: &'static str,
}

const ZERO_KEY: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Get all known-answer vectors.
pub fn all_vectors() -> Vec<EnvelopeVector> {
    vec![
        EnvelopeVector {
            name: "empty plaintext, zero key and nonce",
            key_hex: ZERO_KEY,
            nonce: [0u8; 12],
            plaintext: b"",
            envelope_base64: "AAAAAAAAAAAAAAAAUw+K+8dFNrmpY7TxxMtziw==",
        },
        EnvelopeVector {
            name: "16 zero bytes, zero key and nonce",
            key_hex: ZERO_KEY,
            nonce: [0u8; 12],
            plaintext: &[0u8; 16],
            envelope_base64: "AAAAAAAAAAAAAAAAzqdAPU1ga24HTsXTuvOdGNDRyKeZmWvwJluYtdSKuRk=",
        },
    ]
}

/// Seal a vector's plaintext with its fixed key and nonce.
pub fn seal_vector(vector: &EnvelopeVector) -> Result<String, String> {
    let key = ContentKey::from_hex(vector.key_hex).map_err(|e| format!("{}: {}", vector.name, e))?;
    let envelope = Envelope::seal_with_nonce(vector.plaintext, &key, vector.nonce)
        .map_err(|e| format!("{}: {}", vector.name, e))?;
    Ok(envelope.to_base64())
}

/// Check every vector in both directions. Returns the first mismatch.
pub fn verify_all_vectors() -> Result<(), String> {
    for vector in all_vectors() {
        let sealed = seal_vector(&vector)?;
        if sealed != vector.envelope_base64 {
            return Err(format!(
                "{}: sealed to {}, expected {}",
                vector.name, sealed, vector.envelope_base64
            ));
        }

        let key = ContentKey::from_hex(vector.key_hex).map_err(|e| e.to_string())?;
        let opened = Envelope::from_base64(vector.envelope_base64)
            .and_then(|envelope| envelope.open(&key))
            .map_err(|e| format!("{}: {}", vector.name, e))?;
        if opened != vector.plaintext {
            return Err(format!("{}: opened to {}", vector.name, hex::encode(opened)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockdrop_crypto::CryptoError;

    #[test]
    fn test_all_vectors_verify() {
        verify_all_vectors().unwrap();
    }

    #[test]
    fn test_envelope_lengths() {
        for vector in all_vectors() {
            let envelope = Envelope::from_base64(vector.envelope_base64).unwrap();
            assert_eq!(envelope.to_bytes().len(), 12 + vector.plaintext.len() + 16);
            assert_eq!(envelope.nonce(), &vector.nonce);
        }
    }

    #[test]
    fn test_vector_rejects_other_key() {
        let vector = &all_vectors()[1];
        let key = ContentKey::from_bytes([1u8; 32]);
        let envelope = Envelope::from_base64(vector.envelope_base64).unwrap();
        assert!(matches!(
            envelope.open(&key),
            Err(CryptoError::AuthenticationFailed)
        ));
    }
}
