//! Proptest generators for property-based testing.

use std::collections::HashSet;

use proptest::prelude::*;

use blockdrop_core::{
    AccessPermission, AuditAction, AuditLogEntry, Change, ContentAddress, FileId, FileRecord,
    Identity, IntegrityHash, KeyEnvelope, LedgerMutation,
};

/// Generate a random non-null Identity.
pub fn identity() -> impl Strategy<Value = Identity> {
    any::<[u8; 32]>()
        .prop_filter("null identity", |b| b != &[0u8; 32])
        .prop_map(Identity::from_bytes)
}

/// Generate a valid file id (1-indexed).
pub fn file_id() -> impl Strategy<Value = FileId> {
    (1u64..=u64::MAX).prop_map(FileId)
}

/// Generate a content address for arbitrary bytes.
pub fn content_address() -> impl Strategy<Value = ContentAddress> {
    payload(64).prop_map(|bytes| ContentAddress::for_content(&bytes))
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=i64::MAX / 2
}

/// Generate an expiry: never (0) or a timestamp.
pub fn expiry() -> impl Strategy<Value = i64> {
    prop_oneof![Just(0i64), 1i64..=i64::MAX / 2]
}

/// Generate an AuditAction.
pub fn audit_action() -> impl Strategy<Value = AuditAction> {
    prop_oneof![
        Just(AuditAction::Upload),
        Just(AuditAction::Share),
        Just(AuditAction::Revoke),
        Just(AuditAction::Access),
        Just(AuditAction::Deactivate),
    ]
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate an AccessPermission.
pub fn permission() -> impl Strategy<Value = AccessPermission> {
    (file_id(), identity(), timestamp(), expiry(), any::<bool>()).prop_map(
        |(file_id, recipient, granted_at, expires_at, active)| AccessPermission {
            file_id,
            recipient,
            recipient_key_envelope: KeyEnvelope::new(format!(
                "wrapped-for-{}",
                recipient.short()
            )),
            granted_at,
            expires_at,
            active,
        },
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Ledger Histories
// ─────────────────────────────────────────────────────────────────────────────

/// One step of a generated history, by index into files and recipients.
#[derive(Debug, Clone, Copy)]
pub enum HistoryOp {
    Upload,
    Grant { file: usize, recipient: usize, expires_at: i64 },
    Revoke { file: usize, recipient: usize },
    Access { file: usize },
    Deactivate { file: usize },
}

fn history_op() -> impl Strategy<Value = HistoryOp> {
    prop_oneof![
        1 => Just(HistoryOp::Upload),
        3 => (any::<usize>(), any::<usize>(), expiry())
            .prop_map(|(file, recipient, expires_at)| HistoryOp::Grant {
                file,
                recipient,
                expires_at,
            }),
        2 => (any::<usize>(), any::<usize>())
            .prop_map(|(file, recipient)| HistoryOp::Revoke { file, recipient }),
        2 => any::<usize>().prop_map(|file| HistoryOp::Access { file }),
        1 => any::<usize>().prop_map(|file| HistoryOp::Deactivate { file }),
    ]
}

/// Generate a structurally valid mutation journal for one owner and up to
/// four recipients.
///
/// Every history starts with an upload. Revokes only target permissions that
/// were granted earlier, so the result always replays cleanly.
pub fn ledger_history(max_len: usize) -> impl Strategy<Value = Vec<LedgerMutation>> {
    (
        identity(),
        prop::collection::vec(identity(), 1..=4),
        prop::collection::vec(history_op(), 0..=max_len),
    )
        .prop_map(|(owner, recipients, ops)| build_history(owner, &recipients, &ops))
}

/// Turn index-based ops into concrete mutations.
pub fn build_history(
    owner: Identity,
    recipients: &[Identity],
    ops: &[HistoryOp],
) -> Vec<LedgerMutation> {
    let mut out = Vec::new();
    let mut files = 0u64;
    let mut granted = HashSet::new();
    let mut now = 1_000i64;

    let audit = |actor: Identity, file_id: FileId, action: AuditAction, timestamp: i64| {
        AuditLogEntry {
            actor,
            file_id,
            action,
            timestamp,
            details: action.to_string(),
        }
    };

    for op in std::iter::once(&HistoryOp::Upload).chain(ops) {
        now += 1;
        if let HistoryOp::Upload = op {
            files += 1;
            let id = FileId(files);
            let address = ContentAddress::for_content(&files.to_le_bytes());
            let record = FileRecord {
                id,
                owner,
                integrity_hash: IntegrityHash::compute("generated", &address),
                content_address: address,
                owner_key_envelope: KeyEnvelope::new("owner"),
                created_at: now,
                active: true,
                access_count: 0,
            };
            out.push(LedgerMutation::new(
                Change::StoreFile(record),
                audit(owner, id, AuditAction::Upload, now),
            ));
            continue;
        }

        let pick_file = |i: usize| FileId(i as u64 % files + 1);
        let pick_recipient = |i: usize| recipients[i % recipients.len()];
        let mutation = match *op {
            HistoryOp::Upload => continue,
            HistoryOp::Grant {
                file,
                recipient,
                expires_at,
            } => {
                let (file_id, recipient) = (pick_file(file), pick_recipient(recipient));
                granted.insert((file_id, recipient));
                LedgerMutation::new(
                    Change::Grant(AccessPermission {
                        file_id,
                        recipient,
                        recipient_key_envelope: KeyEnvelope::new("recipient"),
                        granted_at: now,
                        expires_at,
                        active: true,
                    }),
                    audit(owner, file_id, AuditAction::Share, now),
                )
            }
            HistoryOp::Revoke { file, recipient } => {
                let (file_id, recipient) = (pick_file(file), pick_recipient(recipient));
                if !granted.contains(&(file_id, recipient)) {
                    continue;
                }
                LedgerMutation::new(
                    Change::Revoke { file_id, recipient },
                    audit(owner, file_id, AuditAction::Revoke, now),
                )
            }
            HistoryOp::Access { file } => {
                let file_id = pick_file(file);
                LedgerMutation::new(
                    Change::Access { file_id },
                    audit(owner, file_id, AuditAction::Access, now),
                )
            }
            HistoryOp::Deactivate { file } => {
                let file_id = pick_file(file);
                LedgerMutation::new(
                    Change::Deactivate { file_id },
                    audit(owner, file_id, AuditAction::Deactivate, now),
                )
            }
        };
        out.push(mutation);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockdrop_core::LedgerState;

    proptest! {
        #[test]
        fn generated_histories_replay(history in ledger_history(40)) {
            let state = LedgerState::replay(&history).unwrap();

            let uploads = history
                .iter()
                .filter(|m| matches!(m.change, Change::StoreFile(_)))
                .count() as u64;
            prop_assert_eq!(state.file_count(), uploads);
            prop_assert_eq!(state.total_audit_logs(), history.len() as u64);
        }
    }
}
