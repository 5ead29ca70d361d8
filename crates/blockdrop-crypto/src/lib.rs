//! # BlockDrop Crypto
//!
//! Envelope encryption for BlockDrop. Stateless: no identities, no storage.
//!
//! ## Overview
//!
//! Each file gets one random [`ContentKey`]. The payload is sealed once into an
//! AES-256-GCM [`Envelope`]; the key itself is then wrapped per recipient with
//! X25519 key agreement ([`WrappedKey`]). Sharing or revoking never re-encrypts
//! the payload.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use blockdrop_crypto::{ContentKey, Envelope, WrappedKey, X25519StaticSecret};
//!
//! let bob = X25519StaticSecret::generate();
//! let key = ContentKey::generate()?;
//!
//! let sealed = Envelope::seal(b"quarterly report", &key)?;
//! let for_bob = WrappedKey::wrap(&key, &bob.public_key())?;
//!
//! let recovered = for_bob.unwrap(&bob)?;
//! assert_eq!(sealed.open(&recovered)?, b"quarterly report");
//! # Ok::<(), blockdrop_crypto::CryptoError>(())
//! ```

pub mod envelope;
pub mod error;
pub mod key;
pub mod wrap;

pub use envelope::{Envelope, MIN_ENVELOPE_LEN, NONCE_LEN, TAG_LEN};
pub use error::{CryptoError, Result};
pub use key::{ContentKey, EphemeralKeyPair, SharedKey, X25519PublicKey, X25519StaticSecret};
pub use wrap::WrappedKey;
