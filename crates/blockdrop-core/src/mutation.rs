//! Ledger mutations and the events they produce.
//!
//! Every successful ledger write is exactly one [`LedgerMutation`]: a state
//! change paired with the audit entry that records it. Persisting the pair as a
//! unit keeps a change and its audit entry from ever appearing apart.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::record::{AccessPermission, AuditLogEntry, FileRecord};
use crate::types::{FileId, Identity};

/// A state change to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Change {
    /// A new file was registered.
    StoreFile(FileRecord),

    /// A permission was created or overwritten.
    Grant(AccessPermission),

    /// A permission was deactivated.
    Revoke { file_id: FileId, recipient: Identity },

    /// A key envelope was disclosed; bumps `access_count`.
    Access { file_id: FileId },

    /// The file was deactivated.
    Deactivate { file_id: FileId },
}

/// A change plus its audit entry, committed atomically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMutation {
    pub change: Change,
    pub audit: AuditLogEntry,
}

impl LedgerMutation {
    pub fn new(change: Change, audit: AuditLogEntry) -> Self {
        Self { change, audit }
    }

    /// The file this mutation touches.
    pub fn file_id(&self) -> FileId {
        match &self.change {
            Change::StoreFile(record) => record.id,
            Change::Grant(permission) => permission.file_id,
            Change::Revoke { file_id, .. }
            | Change::Access { file_id }
            | Change::Deactivate { file_id } => *file_id,
        }
    }

    /// The notification to broadcast once this mutation is committed.
    pub fn event(&self) -> LedgerEvent {
        match &self.change {
            Change::StoreFile(record) => LedgerEvent::FileStored {
                file_id: record.id,
                owner: record.owner,
            },
            Change::Grant(permission) => LedgerEvent::AccessGranted {
                file_id: permission.file_id,
                recipient: permission.recipient,
                expires_at: permission.expires_at,
            },
            Change::Revoke { file_id, recipient } => LedgerEvent::AccessRevoked {
                file_id: *file_id,
                recipient: *recipient,
            },
            Change::Access { file_id } => LedgerEvent::FileAccessed {
                file_id: *file_id,
                accessor: self.audit.actor,
            },
            Change::Deactivate { file_id } => LedgerEvent::FileDeactivated { file_id: *file_id },
        }
    }

    /// Encode to CBOR.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Decode from CBOR.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}

/// Notification emitted after a mutation is committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    FileStored {
        file_id: FileId,
        owner: Identity,
    },
    AccessGranted {
        file_id: FileId,
        recipient: Identity,
        expires_at: i64,
    },
    AccessRevoked {
        file_id: FileId,
        recipient: Identity,
    },
    FileAccessed {
        file_id: FileId,
        accessor: Identity,
    },
    FileDeactivated {
        file_id: FileId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::AuditAction;

    #[test]
    fn test_cbor_encoding_is_stable() {
        let actor = Identity::from_bytes([9; 32]);
        let mutation = LedgerMutation::new(
            Change::Deactivate { file_id: FileId(3) },
            AuditLogEntry {
                actor,
                file_id: FileId(3),
                action: AuditAction::Deactivate,
                timestamp: 42,
                details: "File deactivated".into(),
            },
        );

        let bytes = mutation.to_bytes().unwrap();
        assert_eq!(bytes, mutation.to_bytes().unwrap());
        assert_eq!(LedgerMutation::from_bytes(&bytes).unwrap(), mutation);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(LedgerMutation::from_bytes(&[0xff, 0x00, 0x13]).is_err());
    }

    #[test]
    fn test_access_event_carries_actor() {
        let actor = Identity::from_bytes([5; 32]);
        let mutation = LedgerMutation::new(
            Change::Access { file_id: FileId(1) },
            AuditLogEntry {
                actor,
                file_id: FileId(1),
                action: AuditAction::Access,
                timestamp: 0,
                details: String::new(),
            },
        );
        assert_eq!(
            mutation.event(),
            LedgerEvent::FileAccessed {
                file_id: FileId(1),
                accessor: actor
            }
        );
        assert_eq!(mutation.file_id(), FileId(1));
    }
}
