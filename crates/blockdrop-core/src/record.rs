//! Ledger records: files, permissions and the audit trail.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::{ContentAddress, FileId, Identity, IntegrityHash};

/// A wrapped copy of a file's content key.
///
/// The ledger stores and returns these verbatim. Only the holder of the
/// matching secret can turn one back into a content key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEnvelope(String);

impl KeyEnvelope {
    pub fn new(envelope: impl Into<String>) -> Self {
        Self(envelope.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for KeyEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyEnvelope({} chars)", self.0.len())
    }
}

/// One stored file.
///
/// `id`, `owner`, `content_address` and `integrity_hash` never change after
/// creation. `active` goes true -> false once; `access_count` only grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub owner: Identity,
    pub content_address: ContentAddress,
    pub integrity_hash: IntegrityHash,
    pub owner_key_envelope: KeyEnvelope,
    /// Creation time (Unix ms).
    pub created_at: i64,
    pub active: bool,
    pub access_count: u64,
}

/// A recipient's permission on one file.
///
/// Revocation flips `active`; permissions are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPermission {
    pub file_id: FileId,
    pub recipient: Identity,
    pub recipient_key_envelope: KeyEnvelope,
    /// When the permission was (last) granted (Unix ms).
    pub granted_at: i64,
    /// Expiry (Unix ms). Zero means the permission never expires.
    pub expires_at: i64,
    pub active: bool,
}

impl AccessPermission {
    /// Whether the expiry has passed at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at != 0 && self.expires_at < now
    }

    /// Active and not expired.
    pub fn is_usable(&self, now: i64) -> bool {
        self.active && !self.is_expired(now)
    }
}

/// What an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Upload,
    Share,
    Revoke,
    Access,
    Deactivate,
}

impl AuditAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Upload => "upload",
            AuditAction::Share => "share",
            AuditAction::Revoke => "revoke",
            AuditAction::Access => "access",
            AuditAction::Deactivate => "deactivate",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upload" => Ok(AuditAction::Upload),
            "share" => Ok(AuditAction::Share),
            "revoke" => Ok(AuditAction::Revoke),
            "access" => Ok(AuditAction::Access),
            "deactivate" => Ok(AuditAction::Deactivate),
            other => Err(CoreError::UnknownAction(other.to_string())),
        }
    }
}

/// An append-only audit trail entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub actor: Identity,
    pub file_id: FileId,
    pub action: AuditAction,
    /// Unix ms.
    pub timestamp: i64,
    pub details: String,
}
