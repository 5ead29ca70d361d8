//! # BlockDrop
//!
//! Encrypted file sharing: client-side AES-256-GCM encryption, a caching layer
//! in front of an untrusted content-addressed store, and an access ledger that
//! owns permissions and the audit trail.
//!
//! ## Overview
//!
//! - **Crypto**: one fresh content key per file, sealed envelopes, and the
//!   content key wrapped per recipient with X25519
//! - **Cache**: bounded LRU over the content store with snapshot persistence
//! - **Ledger**: files, permissions with expiry, revocation, deactivation and
//!   an append-only audit log
//!
//! The [`Vault`] composes them. A download asks the ledger first and only
//! touches the content store once the caller has been handed a key.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use blockdrop::{Vault, VaultConfig};
//! use blockdrop::cache::MemoryContentStore;
//! use blockdrop::crypto::X25519StaticSecret;
//! use blockdrop::store::SqliteStore;
//!
//! async fn example() -> blockdrop::Result<()> {
//!     let vault = Vault::open(
//!         SqliteStore::open("ledger.db")?,
//!         MemoryContentStore::new(),
//!         VaultConfig::default(),
//!     )
//!     .await?;
//!
//!     let alice = X25519StaticSecret::generate();
//!     let bob = X25519StaticSecret::generate();
//!
//!     let receipt = vault.upload(&alice, "report.pdf", b"quarterly numbers").await?;
//!     vault
//!         .share(receipt.file_id, &alice, &receipt.key, &bob.public_key(), 0)
//!         .await?;
//!
//!     let plaintext = vault.download(receipt.file_id, &bob).await?;
//!     assert_eq!(plaintext, b"quarterly numbers");
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `blockdrop::core` - identifiers, records, mutations and ledger state
//! - `blockdrop::crypto` - envelopes and key wrapping
//! - `blockdrop::store` - ledger persistence (SQLite and in-memory)
//! - `blockdrop::ledger` - the access ledger
//! - `blockdrop::cache` - the content cache and content store trait

pub mod error;
pub mod vault;

// Re-export component crates
pub use blockdrop_cache as cache;
pub use blockdrop_core as core;
pub use blockdrop_crypto as crypto;
pub use blockdrop_ledger as ledger;
pub use blockdrop_store as store;

pub use error::{Result, VaultError};
pub use vault::{UploadReceipt, Vault, VaultConfig};

// Re-export commonly used types
pub use blockdrop_core::{
    AuditAction, AuditLogEntry, ContentAddress, FileId, Identity, IntegrityHash,
};
pub use blockdrop_crypto::{ContentKey, X25519PublicKey, X25519StaticSecret};
