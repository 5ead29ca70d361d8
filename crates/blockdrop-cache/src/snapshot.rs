//! Cache snapshots.
//!
//! A snapshot is a bounded set of the most recently used entries plus the
//! time it was taken, encoded as CBOR. Snapshots past their max age are
//! dropped wholesale on restore.

use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use blockdrop_core::ContentAddress;

use crate::error::SnapshotError;

/// One cached blob inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub address: ContentAddress,
    pub bytes: Bytes,
    /// Unix ms.
    pub last_access: i64,
}

/// Persisted cache contents, most recently used first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub entries: Vec<SnapshotEntry>,
    /// Unix ms.
    pub taken_at: i64,
}

impl CacheSnapshot {
    /// Age at `now`, in milliseconds. Never negative.
    pub fn age_millis(&self, now: i64) -> i64 {
        (now - self.taken_at).max(0)
    }

    /// Encode to CBOR.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| SnapshotError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decode from CBOR.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        ciborium::from_reader(bytes).map_err(|e| SnapshotError::Decode(e.to_string()))
    }

    /// Write to `path`, replacing any previous snapshot.
    pub(crate) async fn write_to(&self, path: &Path) -> Result<(), SnapshotError> {
        let encoded = self.to_bytes()?;

        // Write a sibling file and rename over the target.
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, encoded).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Read from `path`. `Ok(None)` if there is no snapshot yet.
    pub(crate) async fn read_from(path: &Path) -> Result<Option<Self>, SnapshotError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Self::from_bytes(&bytes).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> CacheSnapshot {
        CacheSnapshot {
            entries: vec![SnapshotEntry {
                address: ContentAddress::for_content(b"a"),
                bytes: Bytes::from_static(b"a"),
                last_access: 5,
            }],
            taken_at: 10,
        }
    }

    #[test]
    fn test_age_never_negative() {
        assert_eq!(snapshot().age_millis(15), 5);
        assert_eq!(snapshot().age_millis(0), 0);
    }

    #[test]
    fn test_corrupt_bytes_rejected() {
        assert!(CacheSnapshot::from_bytes(b"\xff\xff not cbor").is_err());
    }

    #[tokio::test]
    async fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.snapshot");

        assert!(CacheSnapshot::read_from(&path).await.unwrap().is_none());
        snapshot().write_to(&path).await.unwrap();
        assert_eq!(
            CacheSnapshot::read_from(&path).await.unwrap(),
            Some(snapshot())
        );
    }
}
