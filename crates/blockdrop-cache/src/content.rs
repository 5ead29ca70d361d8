//! The content-addressed blob store collaborator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use blockdrop_core::ContentAddress;

use crate::error::{ContentStoreError, Result};

/// An untrusted, content-addressed blob store.
///
/// The cache treats this purely as an opaque keyed store; replication and
/// availability are the store's business.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes` and return their address.
    async fn put(&self, bytes: Bytes) -> Result<ContentAddress>;

    /// Fetch the blob at `address`.
    async fn get(&self, address: &ContentAddress) -> Result<Bytes>;
}

#[async_trait]
impl<C: ContentStore + ?Sized> ContentStore for Arc<C> {
    async fn put(&self, bytes: Bytes) -> Result<ContentAddress> {
        (**self).put(bytes).await
    }

    async fn get(&self, address: &ContentAddress) -> Result<Bytes> {
        (**self).get(address).await
    }
}

/// In-memory content store.
///
/// Addresses are the hex BLAKE3 hash of the bytes. Counts `get` calls and can
/// be made slow or unavailable, which is what tests need from a remote store.
#[derive(Default)]
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<ContentAddress, Bytes>>,
    get_calls: AtomicUsize,
    unavailable: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls served or attempted.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Make every call fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every `get` by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ContentStoreError::Unavailable(
                "memory store marked unavailable".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, bytes: Bytes) -> Result<ContentAddress> {
        self.check_available()?;
        let address = ContentAddress::for_content(&bytes);
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.clone(), bytes);
        Ok(address)
    }

    async fn get(&self, address: &ContentAddress) -> Result<Bytes> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        self.check_available()?;
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .cloned()
            .ok_or_else(|| ContentStoreError::NotFound(address.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get() {
        let store = MemoryContentStore::new();
        let address = store.put(Bytes::from_static(b"blob")).await.unwrap();
        assert_eq!(address, ContentAddress::for_content(b"blob"));
        assert_eq!(store.get(&address).await.unwrap(), Bytes::from_static(b"blob"));
        assert_eq!(store.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_is_not_found() {
        let store = MemoryContentStore::new();
        let address = ContentAddress::for_content(b"nothing");
        assert_eq!(
            store.get(&address).await,
            Err(ContentStoreError::NotFound(address))
        );
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = MemoryContentStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.put(Bytes::from_static(b"x")).await,
            Err(ContentStoreError::Unavailable(_))
        ));
        assert!(store.is_empty());
    }
}
