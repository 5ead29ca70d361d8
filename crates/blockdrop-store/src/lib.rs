//! # BlockDrop Store
//!
//! Persistence for the access ledger. Provides a trait-based interface with
//! SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The ledger holds its working state in memory and writes each committed
//! mutation through the [`LedgerStore`] trait. The primary implementation is
//! [`SqliteStore`], which materializes the file, permission, recipient and
//! audit tables; [`MemoryStore`] keeps an encoded journal for tests.
//!
//! ## Key Types
//!
//! - [`LedgerStore`] - The async trait for ledger persistence
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use blockdrop_store::{LedgerStore, SqliteStore};
//!
//! async fn example() -> blockdrop_store::Result<()> {
//!     let store = SqliteStore::open("ledger.db")?;
//!     let state = store.load().await?;
//!     println!("{} files", state.file_count());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::LedgerStore;
