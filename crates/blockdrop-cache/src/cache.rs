//! Bounded LRU cache in front of the content store.
//!
//! Bounded by total size and by item count. Eviction runs before insertion,
//! so the cache never exceeds either bound, even transiently.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;

use blockdrop_core::{Clock, ContentAddress, SystemClock};

use crate::content::ContentStore;
use crate::error::Result;
use crate::snapshot::{CacheSnapshot, SnapshotEntry};

/// Configuration for the content cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum total bytes cached (default: 50MB)
    pub max_size: u64,
    /// Maximum number of entries (default: 100)
    pub max_items: usize,
    /// Entries kept in a snapshot, most recently used first (default: 20)
    pub snapshot_entries: usize,
    /// Snapshots older than this are discarded on restore (default: 24h)
    pub snapshot_max_age: Duration,
    /// Where `persist` writes and `open` reads the snapshot. None disables persistence.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 50 * 1024 * 1024, // 50MB
            max_items: 100,
            snapshot_entries: 20,
            snapshot_max_age: Duration::from_secs(24 * 60 * 60),
            snapshot_path: None,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub item_count: usize,
    pub current_size: u64,
    pub max_size: u64,
    pub max_items: usize,
    /// Least recently used entry, next in line for eviction.
    pub oldest_address: Option<ContentAddress>,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups served from cache; 0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

struct CacheEntry {
    bytes: Bytes,
    /// Size charged at insert; subtracted verbatim on removal.
    size: u64,
    last_access: i64,
    /// Touch order, breaks `last_access` ties.
    touched: u64,
}

impl CacheEntry {
    fn recency(&self) -> (i64, u64) {
        (self.last_access, self.touched)
    }
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<ContentAddress, CacheEntry>,
    current_size: u64,
    tick: u64,
}

impl CacheInner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn remove(&mut self, address: &ContentAddress) -> bool {
        match self.entries.remove(address) {
            Some(entry) => {
                self.current_size -= entry.size;
                true
            }
            None => false,
        }
    }

    fn oldest(&self) -> Option<&ContentAddress> {
        self.entries
            .iter()
            .min_by_key(|(_, entry)| entry.recency())
            .map(|(address, _)| address)
    }

    fn evict_oldest(&mut self) -> Option<ContentAddress> {
        let victim = self.oldest()?.clone();
        self.remove(&victim);
        Some(victim)
    }
}

/// LRU cache over a [`ContentStore`].
///
/// Safe to share between tasks. The lock is never held across the backing
/// fetch; two concurrent misses on the same address may both fetch.
pub struct ContentCache<C: ContentStore> {
    store: C,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<CacheInner>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<C: ContentStore> ContentCache<C> {
    /// Create an empty cache.
    pub fn new(store: C, config: CacheConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create an empty cache with an explicit time source.
    pub fn with_clock(store: C, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
            inner: Mutex::new(CacheInner::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Create a cache and warm it from the snapshot at `config.snapshot_path`.
    ///
    /// A missing, unreadable, corrupt or stale snapshot yields a cold cache.
    pub async fn open(store: C, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let cache = Self::with_clock(store, config, clock);
        let Some(path) = cache.config.snapshot_path.clone() else {
            return cache;
        };

        match CacheSnapshot::read_from(&path).await {
            Ok(Some(snapshot)) => {
                cache.restore(snapshot);
            }
            Ok(None) => tracing::debug!(path = %path.display(), "no cache snapshot"),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "cache snapshot unreadable, starting cold"
                )
            }
        }
        cache
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        // Every critical section leaves the maps consistent, so a poisoned lock
        // still guards valid data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookup and Insert
    // ─────────────────────────────────────────────────────────────────────────

    /// Return the blob at `address`, fetching it on a miss.
    ///
    /// A fetch failure is returned unchanged. Dropping the returned future
    /// mid-fetch leaves no entry behind.
    pub async fn get(&self, address: &ContentAddress) -> Result<Bytes> {
        if let Some(bytes) = self.lookup(address) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(address = %address, "cache hit");
            return Ok(bytes);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(address = %address, "cache miss");
        let bytes = self.store.get(address).await?;
        self.set(address.clone(), bytes.clone());
        Ok(bytes)
    }

    /// Upload through the backing store, then cache under the returned address.
    pub async fn put(&self, bytes: Bytes) -> Result<ContentAddress> {
        let address = self.store.put(bytes.clone()).await?;
        self.set(address.clone(), bytes);
        Ok(address)
    }

    /// Insert `bytes`, evicting least recently used entries as needed.
    ///
    /// Returns false, changing nothing, if the blob alone is larger than
    /// `max_size` (or the cache holds no items at all).
    pub fn set(&self, address: ContentAddress, bytes: Bytes) -> bool {
        let now = self.clock.now_millis();
        self.insert_at(address, bytes, now)
    }

    fn insert_at(&self, address: ContentAddress, bytes: Bytes, last_access: i64) -> bool {
        let size = bytes.len() as u64;
        if size > self.config.max_size || self.config.max_items == 0 {
            tracing::debug!(address = %address, size, "blob rejected by cache policy");
            return false;
        }

        let mut inner = self.lock();
        inner.remove(&address);
        while inner.current_size + size > self.config.max_size
            || inner.entries.len() >= self.config.max_items
        {
            match inner.evict_oldest() {
                Some(victim) => tracing::debug!(address = %victim, "cache eviction"),
                None => break,
            }
        }

        let touched = inner.next_tick();
        inner.current_size += size;
        inner.entries.insert(
            address,
            CacheEntry {
                bytes,
                size,
                last_access,
                touched,
            },
        );
        true
    }

    fn lookup(&self, address: &ContentAddress) -> Option<Bytes> {
        let now = self.clock.now_millis();
        let mut inner = self.lock();
        let touched = inner.next_tick();
        let entry = inner.entries.get_mut(address)?;
        entry.last_access = now;
        entry.touched = touched;
        Some(entry.bytes.clone())
    }

    /// Fetch every absent address concurrently. Returns how many were loaded.
    ///
    /// Failures are logged and skipped.
    pub async fn preload(&self, addresses: &[ContentAddress]) -> usize {
        let missing: Vec<_> = addresses.iter().filter(|a| !self.contains(a)).collect();
        let results = join_all(missing.iter().map(|address| self.get(address))).await;

        let mut loaded = 0;
        for (address, result) in missing.iter().zip(results) {
            match result {
                Ok(_) => loaded += 1,
                Err(e) => tracing::warn!(address = %address, error = %e, "preload failed"),
            }
        }
        tracing::debug!(requested = addresses.len(), loaded, "preload finished");
        loaded
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    pub fn remove(&self, address: &ContentAddress) -> bool {
        self.lock().remove(address)
    }

    /// Whether `address` is cached. Does not count as an access.
    pub fn contains(&self, address: &ContentAddress) -> bool {
        self.lock().entries.contains_key(address)
    }

    /// Drop every entry and reset the hit/miss counters.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.current_size = 0;
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            item_count: inner.entries.len(),
            current_size: inner.current_size,
            max_size: self.config.max_size,
            max_items: self.config.max_items,
            oldest_address: inner.oldest().cloned(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Snapshots
    // ─────────────────────────────────────────────────────────────────────────

    /// The `snapshot_entries` most recently used entries.
    pub fn snapshot(&self) -> CacheSnapshot {
        let inner = self.lock();
        let mut entries: Vec<_> = inner.entries.iter().collect();
        entries.sort_by_key(|(_, entry)| std::cmp::Reverse(entry.recency()));

        CacheSnapshot {
            entries: entries
                .into_iter()
                .take(self.config.snapshot_entries)
                .map(|(address, entry)| SnapshotEntry {
                    address: address.clone(),
                    bytes: entry.bytes.clone(),
                    last_access: entry.last_access,
                })
                .collect(),
            taken_at: self.clock.now_millis(),
        }
    }

    /// Load a snapshot's entries. Returns how many were restored.
    ///
    /// A snapshot older than `snapshot_max_age` is discarded entirely.
    pub fn restore(&self, snapshot: CacheSnapshot) -> usize {
        let age = snapshot.age_millis(self.clock.now_millis());
        let max_age = self.config.snapshot_max_age.as_millis() as i64;
        if age > max_age {
            tracing::info!(age_ms = age, "cache snapshot too old, discarded");
            return 0;
        }

        // Oldest first, so recency order survives the round trip.
        let mut restored = 0;
        for entry in snapshot.entries.into_iter().rev() {
            if self.insert_at(entry.address, entry.bytes, entry.last_access) {
                restored += 1;
            }
        }
        tracing::info!(restored, "cache snapshot restored");
        restored
    }

    /// Write a snapshot to `snapshot_path`. Returns whether one was written.
    ///
    /// Failures are logged, never returned.
    pub async fn persist(&self) -> bool {
        let Some(path) = self.config.snapshot_path.as_deref() else {
            return false;
        };
        let snapshot = self.snapshot();
        match snapshot.write_to(path).await {
            Ok(()) => {
                tracing::debug!(
                    entries = snapshot.entries.len(),
                    path = %path.display(),
                    "cache snapshot saved"
                );
                true
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cache snapshot not saved");
                false
            }
        }
    }
}
