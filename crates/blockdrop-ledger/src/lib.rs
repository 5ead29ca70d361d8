//! # BlockDrop Ledger
//!
//! The authoritative record of files, ownership, per-recipient permissions
//! and the audit trail. Enforces every access-control rule.
//!
//! ## Overview
//!
//! A file moves `active -> inactive` exactly once. A permission moves between
//! active and inactive as the owner revokes and re-grants it. Deactivating a
//! file does not touch its permissions; it simply makes every read fail with
//! [`LedgerError::FileInactive`].
//!
//! The ledger never sees plaintext and never talks to the content store. It
//! only hands out the opaque key envelope each caller is entitled to.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use blockdrop_core::{ContentAddress, Identity, IntegrityHash, KeyEnvelope};
//! use blockdrop_ledger::{AccessLedger, LedgerConfig};
//! use blockdrop_store::SqliteStore;
//!
//! async fn example(owner: Identity, bob: Identity) -> blockdrop_ledger::Result<()> {
//!     let store = SqliteStore::open("ledger.db")?;
//!     let ledger = AccessLedger::open(store, LedgerConfig::default()).await?;
//!
//!     let address = ContentAddress::new("bafy...").unwrap();
//!     let hash = IntegrityHash::compute("report.pdf", &address);
//!     let id = ledger
//!         .store_file(address, hash, KeyEnvelope::new("owner-wrapped"), owner)
//!         .await?;
//!
//!     ledger.grant_access(id, bob, KeyEnvelope::new("bob-wrapped"), 0, owner).await?;
//!     let envelope = ledger.get_decryption_key(id, bob).await?;
//!     # let _ = envelope;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod ledger;

pub use error::{LedgerError, Result};
pub use ledger::{AccessLedger, LedgerConfig};
