//! In-memory implementation of the LedgerStore trait.
//!
//! This is primarily for testing. It keeps an encoded journal of committed
//! mutations and replays it on load, so it exercises the same encoding path a
//! durable journal would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use blockdrop_core::{LedgerMutation, LedgerState};

use crate::error::{Result, StoreError};
use crate::traits::LedgerStore;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    journal: RwLock<Vec<Vec<u8>>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent commits fail, as if the backing storage went away.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of committed mutations.
    pub fn len(&self) -> usize {
        self.journal.read().map(|j| j.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn commit(&self, mutation: &LedgerMutation) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "memory store marked unavailable",
            )));
        }

        let encoded = mutation.to_bytes()?;
        let mut journal = self
            .journal
            .write()
            .map_err(|e| StoreError::InvalidData(format!("lock poisoned: {}", e)))?;
        journal.push(encoded);
        Ok(())
    }

    async fn load(&self) -> Result<LedgerState> {
        let journal = self
            .journal
            .read()
            .map_err(|e| StoreError::InvalidData(format!("lock poisoned: {}", e)))?;

        let mutations = journal
            .iter()
            .map(|bytes| LedgerMutation::from_bytes(bytes))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(LedgerState::replay(&mutations)?)
    }
}
