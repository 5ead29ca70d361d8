//! Ledger state computation.
//!
//! Ledger state is an arena of file records keyed by id plus secondary
//! indices, built by applying [`LedgerMutation`]s in commit order. The same
//! replay rebuilds state from a persisted journal.

use std::collections::HashMap;

use crate::error::{CoreError, Result};
use crate::mutation::{Change, LedgerMutation};
use crate::record::{AccessPermission, AuditLogEntry, FileRecord};
use crate::types::{FileId, Identity};

/// Aggregated ledger state.
#[derive(Debug, Default, Clone)]
pub struct LedgerState {
    /// File records; `files[i]` has id `i + 1`.
    files: Vec<FileRecord>,

    /// Permissions keyed by (file, recipient).
    permissions: HashMap<(FileId, Identity), AccessPermission>,

    /// Index: file -> every recipient ever granted, in first-grant order.
    recipients: HashMap<FileId, Vec<Identity>>,

    /// Index: file -> audit trail in commit order.
    audit: HashMap<FileId, Vec<AuditLogEntry>>,

    /// Index: owner -> files in upload order.
    by_owner: HashMap<Identity, Vec<FileId>>,

    total_audit_logs: u64,
}

impl LedgerState {
    /// Create a new empty ledger state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild state by replaying mutations in order.
    pub fn replay<'a>(mutations: impl IntoIterator<Item = &'a LedgerMutation>) -> Result<Self> {
        let mut state = Self::new();
        for mutation in mutations {
            state.check(mutation)?;
            state.apply(mutation);
        }
        Ok(state)
    }

    /// Rebuild state from materialized tables.
    ///
    /// `files` must hold ids `1..=n` in order; `recipients` and `audit` must be
    /// in their original insertion order.
    pub fn from_tables(
        files: Vec<FileRecord>,
        permissions: Vec<AccessPermission>,
        recipients: Vec<(FileId, Identity)>,
        audit: Vec<AuditLogEntry>,
    ) -> Result<Self> {
        let mut state = Self::new();

        for (i, record) in files.into_iter().enumerate() {
            let expected = FileId(i as u64 + 1);
            if record.id != expected {
                return Err(CoreError::Inconsistent {
                    file_id: record.id,
                    reason: format!("expected file id {}", expected.get()),
                });
            }
            state.by_owner.entry(record.owner).or_default().push(record.id);
            state.files.push(record);
        }

        for permission in permissions {
            if !state.exists(permission.file_id) {
                return Err(CoreError::Inconsistent {
                    file_id: permission.file_id,
                    reason: "permission for unknown file".into(),
                });
            }
            state
                .permissions
                .insert((permission.file_id, permission.recipient), permission);
        }

        for (file_id, recipient) in recipients {
            let list = state.recipients.entry(file_id).or_default();
            if !list.contains(&recipient) {
                list.push(recipient);
            }
        }

        for entry in audit {
            state.audit.entry(entry.file_id).or_default().push(entry);
            state.total_audit_logs += 1;
        }

        Ok(state)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Check that `mutation` is structurally applicable to this state.
    ///
    /// This does not evaluate access rules; it only guards replay against a
    /// journal that refers to files or permissions that do not exist.
    pub fn check(&self, mutation: &LedgerMutation) -> Result<()> {
        let file_id = mutation.file_id();
        let inconsistent = |reason: &str| CoreError::Inconsistent {
            file_id,
            reason: reason.to_string(),
        };

        if mutation.audit.file_id != file_id {
            return Err(inconsistent("audit entry names a different file"));
        }

        match &mutation.change {
            Change::StoreFile(_) => {
                if file_id != self.next_file_id() {
                    return Err(inconsistent("file id is not the next id"));
                }
            }
            Change::Revoke { recipient, .. } => {
                if !self.permissions.contains_key(&(file_id, *recipient)) {
                    return Err(inconsistent("revoking a permission that was never granted"));
                }
            }
            Change::Grant(_) | Change::Access { .. } | Change::Deactivate { .. } => {
                if self.file(file_id).is_none() {
                    return Err(inconsistent("unknown file"));
                }
            }
        }
        Ok(())
    }

    /// Apply a mutation. Callers must have validated it with [`check`](Self::check)
    /// or by the ledger's own access rules; an inapplicable change is ignored
    /// apart from its audit entry.
    pub fn apply(&mut self, mutation: &LedgerMutation) {
        match &mutation.change {
            Change::StoreFile(record) => {
                self.by_owner.entry(record.owner).or_default().push(record.id);
                self.files.push(record.clone());
            }
            Change::Grant(permission) => {
                let recipients = self.recipients.entry(permission.file_id).or_default();
                if !recipients.contains(&permission.recipient) {
                    recipients.push(permission.recipient);
                }
                self.permissions.insert(
                    (permission.file_id, permission.recipient),
                    permission.clone(),
                );
            }
            Change::Revoke { file_id, recipient } => {
                if let Some(permission) = self.permissions.get_mut(&(*file_id, *recipient)) {
                    permission.active = false;
                }
            }
            Change::Access { file_id } => {
                if let Some(record) = self.file_mut(*file_id) {
                    record.access_count += 1;
                }
            }
            Change::Deactivate { file_id } => {
                if let Some(record) = self.file_mut(*file_id) {
                    record.active = false;
                }
            }
        }

        self.audit
            .entry(mutation.audit.file_id)
            .or_default()
            .push(mutation.audit.clone());
        self.total_audit_logs += 1;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Number of files ever stored.
    pub fn file_count(&self) -> u64 {
        self.files.len() as u64
    }

    /// The id the next stored file will receive.
    pub fn next_file_id(&self) -> FileId {
        FileId(self.file_count() + 1)
    }

    /// Whether `1 <= id <= file_count`.
    pub fn exists(&self, file_id: FileId) -> bool {
        file_id.0 >= 1 && file_id.0 <= self.file_count()
    }

    /// Look up a file record.
    pub fn file(&self, file_id: FileId) -> Option<&FileRecord> {
        if !self.exists(file_id) {
            return None;
        }
        self.files.get((file_id.0 - 1) as usize)
    }

    fn file_mut(&mut self, file_id: FileId) -> Option<&mut FileRecord> {
        if !self.exists(file_id) {
            return None;
        }
        self.files.get_mut((file_id.0 - 1) as usize)
    }

    /// All file records in id order.
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    /// The permission for (file, recipient), active or not.
    pub fn permission(&self, file_id: FileId, recipient: &Identity) -> Option<&AccessPermission> {
        self.permissions.get(&(file_id, *recipient))
    }

    /// Every permission, in no particular order.
    pub fn permissions(&self) -> impl Iterator<Item = &AccessPermission> {
        self.permissions.values()
    }

    /// Every recipient ever granted access to a file, in first-grant order.
    pub fn recipients(&self, file_id: FileId) -> &[Identity] {
        self.recipients
            .get(&file_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The audit trail of a file, in commit order.
    pub fn audit_log(&self, file_id: FileId) -> &[AuditLogEntry] {
        self.audit.get(&file_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Files uploaded by `owner`, in upload order.
    pub fn files_of(&self, owner: &Identity) -> &[FileId] {
        self.by_owner.get(owner).map(Vec::as_slice).unwrap_or_default()
    }

    /// Total audit entries across all files.
    pub fn total_audit_logs(&self) -> u64 {
        self.total_audit_logs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AuditAction, KeyEnvelope};
    use crate::types::{ContentAddress, IntegrityHash};

    fn owner() -> Identity {
        Identity::from_bytes([1; 32])
    }

    fn bob() -> Identity {
        Identity::from_bytes([2; 32])
    }

    fn audit(actor: Identity, file_id: FileId, action: AuditAction) -> AuditLogEntry {
        AuditLogEntry {
            actor,
            file_id,
            action,
            timestamp: 0,
            details: String::new(),
        }
    }

    fn store(id: u64) -> LedgerMutation {
        let address = ContentAddress::for_content(&id.to_le_bytes());
        LedgerMutation::new(
            Change::StoreFile(FileRecord {
                id: FileId(id),
                owner: owner(),
                integrity_hash: IntegrityHash::compute("f", &address),
                content_address: address,
                owner_key_envelope: KeyEnvelope::new("owner"),
                created_at: 0,
                active: true,
                access_count: 0,
            }),
            audit(owner(), FileId(id), AuditAction::Upload),
        )
    }

    fn grant(id: u64, recipient: Identity, envelope: &str) -> LedgerMutation {
        LedgerMutation::new(
            Change::Grant(AccessPermission {
                file_id: FileId(id),
                recipient,
                recipient_key_envelope: KeyEnvelope::new(envelope),
                granted_at: 0,
                expires_at: 0,
                active: true,
            }),
            audit(owner(), FileId(id), AuditAction::Share),
        )
    }

    #[test]
    fn test_file_ids_are_one_based() {
        let state = LedgerState::replay(&[store(1), store(2)]).unwrap();
        assert_eq!(state.file_count(), 2);
        assert!(!state.exists(FileId(0)));
        assert!(state.file(FileId(0)).is_none());
        assert_eq!(state.file(FileId(2)).unwrap().id, FileId(2));
        assert!(state.file(FileId(3)).is_none());
        assert_eq!(state.files_of(&owner()), &[FileId(1), FileId(2)]);
    }

    #[test]
    fn test_replay_rejects_id_gap() {
        let result = LedgerState::replay(&[store(1), store(3)]);
        assert!(matches!(result, Err(CoreError::Inconsistent { .. })));
    }

    #[test]
    fn test_replay_rejects_unknown_file() {
        let result = LedgerState::replay(&[grant(1, bob(), "x")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_regrant_overwrites_without_duplicating_recipient() {
        let state = LedgerState::replay(&[
            store(1),
            grant(1, bob(), "first"),
            LedgerMutation::new(
                Change::Revoke {
                    file_id: FileId(1),
                    recipient: bob(),
                },
                audit(owner(), FileId(1), AuditAction::Revoke),
            ),
            grant(1, bob(), "second"),
        ])
        .unwrap();

        let permission = state.permission(FileId(1), &bob()).unwrap();
        assert!(permission.active);
        assert_eq!(permission.recipient_key_envelope.as_str(), "second");
        assert_eq!(state.recipients(FileId(1)), &[bob()]);
        assert_eq!(state.audit_log(FileId(1)).len(), 4);
        assert_eq!(state.total_audit_logs(), 4);
    }

    #[test]
    fn test_access_and_deactivate_update_record() {
        let state = LedgerState::replay(&[
            store(1),
            LedgerMutation::new(
                Change::Access { file_id: FileId(1) },
                audit(owner(), FileId(1), AuditAction::Access),
            ),
            LedgerMutation::new(
                Change::Deactivate { file_id: FileId(1) },
                audit(owner(), FileId(1), AuditAction::Deactivate),
            ),
        ])
        .unwrap();

        let record = state.file(FileId(1)).unwrap();
        assert_eq!(record.access_count, 1);
        assert!(!record.active);

        let actions: Vec<_> = state
            .audit_log(FileId(1))
            .iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec![AuditAction::Upload, AuditAction::Access, AuditAction::Deactivate]
        );
    }

    #[test]
    fn test_from_tables_matches_replay() {
        let journal = [store(1), store(2), grant(2, bob(), "env")];
        let replayed = LedgerState::replay(&journal).unwrap();

        let permissions: Vec<_> = replayed.permissions().cloned().collect();
        let recipients = vec![(FileId(2), bob())];
        let audit: Vec<_> = [FileId(1), FileId(2)]
            .iter()
            .flat_map(|id| replayed.audit_log(*id).to_vec())
            .collect();
        let rebuilt =
            LedgerState::from_tables(replayed.files().to_vec(), permissions, recipients, audit)
                .unwrap();

        assert_eq!(rebuilt.files(), replayed.files());
        assert_eq!(rebuilt.recipients(FileId(2)), replayed.recipients(FileId(2)));
        assert_eq!(rebuilt.audit_log(FileId(2)), replayed.audit_log(FileId(2)));
        assert_eq!(rebuilt.total_audit_logs(), 3);
        assert_eq!(rebuilt.files_of(&owner()), &[FileId(1), FileId(2)]);
    }

    #[test]
    fn test_from_tables_rejects_gap() {
        let replayed = LedgerState::replay(&[store(1), store(2)]).unwrap();
        let files = vec![replayed.files()[1].clone()];
        assert!(LedgerState::from_tables(files, vec![], vec![], vec![]).is_err());
    }

    #[test]
    fn test_empty_queries() {
        let state = LedgerState::new();
        assert!(state.recipients(FileId(1)).is_empty());
        assert!(state.audit_log(FileId(1)).is_empty());
        assert!(state.files_of(&owner()).is_empty());
        assert_eq!(state.next_file_id(), FileId::FIRST);
    }
}
