//! # BlockDrop Cache
//!
//! A bounded LRU cache that sits between callers and the untrusted,
//! content-addressed blob store.
//!
//! ## Overview
//!
//! [`ContentCache`] is bounded by total bytes and by entry count. It knows
//! nothing about files or permissions, only content addresses. On a miss it
//! fetches from the injected [`ContentStore`] without holding its lock, and
//! passes any store error back unchanged.
//!
//! Snapshots of the most recently used entries can be written to disk and
//! restored on startup. Persistence failures never reach `get`/`set` callers;
//! the cache simply starts cold.
//!
//! ## Key Types
//!
//! - [`ContentCache`] - The cache
//! - [`CacheConfig`] - Size, count and snapshot settings
//! - [`ContentStore`] - The backing store collaborator
//! - [`MemoryContentStore`] - In-memory store for tests
//! - [`CacheSnapshot`] - Persisted cache contents
//!
//! ## Usage
//!
//! ```rust,no_run
//! use blockdrop_cache::{CacheConfig, ContentCache, MemoryContentStore};
//! use bytes::Bytes;
//!
//! async fn example() -> blockdrop_cache::Result<()> {
//!     let cache = ContentCache::new(MemoryContentStore::new(), CacheConfig::default());
//!
//!     let address = cache.put(Bytes::from_static(b"ciphertext")).await?;
//!     let bytes = cache.get(&address).await?; // served from cache
//!     # let _ = bytes;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod content;
pub mod error;
pub mod snapshot;

pub use cache::{CacheConfig, CacheStats, ContentCache};
pub use content::{ContentStore, MemoryContentStore};
pub use error::{ContentStoreError, Result, SnapshotError};
pub use snapshot::{CacheSnapshot, SnapshotEntry};
