//! The AccessLedger: authoritative record of files, permissions and audit.
//!
//! All mutations run under one write lock, so they form a single total order:
//! validate against current state, commit to the store, apply in memory, then
//! broadcast. A mutation that fails to commit leaves state untouched.
//!
//! Each mutation runs on its own spawned task. Dropping the caller's future
//! never splits a commit from its in-memory apply.

use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use blockdrop_core::{
    AccessPermission, AuditAction, AuditLogEntry, Change, Clock, ContentAddress, FileId,
    FileRecord, Identity, IntegrityHash, KeyEnvelope, LedgerEvent, LedgerMutation, LedgerState,
    SystemClock,
};
use blockdrop_store::{LedgerStore, StoreError};

use crate::error::{LedgerError, Result};

/// Configuration for the AccessLedger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Capacity of the event broadcast channel. Slow subscribers that fall
    /// further behind than this miss events; writers never wait.
    pub event_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            event_capacity: 256,
        }
    }
}

/// The access ledger.
///
/// Reads (`has_access`, `get_file`, ...) share a read lock and see a consistent
/// snapshot. `get_decryption_key` is a write because every disclosure is
/// counted and audited.
pub struct AccessLedger<S: LedgerStore> {
    shared: Arc<Shared<S>>,
}

struct Shared<S> {
    store: S,
    state: RwLock<LedgerState>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<LedgerEvent>,
}

impl<S: LedgerStore> AccessLedger<S> {
    /// Open a ledger over `store`, restoring everything committed so far.
    pub async fn open(store: S, config: LedgerConfig) -> Result<Self> {
        Self::with_clock(store, config, Arc::new(SystemClock)).await
    }

    /// Open with an explicit time source.
    pub async fn with_clock(
        store: S,
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let state = store.load().await?;
        tracing::debug!(
            files = state.file_count(),
            audit_entries = state.total_audit_logs(),
            "ledger state loaded"
        );
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Ok(Self {
            shared: Arc::new(Shared {
                store,
                state: RwLock::new(state),
                clock,
                events,
            }),
        })
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.shared.store
    }

    /// Subscribe to events for mutations committed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.shared.events.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a new file owned by `owner` and return its id.
    pub async fn store_file(
        &self,
        content_address: ContentAddress,
        integrity_hash: IntegrityHash,
        owner_key_envelope: KeyEnvelope,
        owner: Identity,
    ) -> Result<FileId> {
        let file_id = self
            .mutate(move |state, now| {
                let file_id = state.next_file_id();
                let record = FileRecord {
                    id: file_id,
                    owner,
                    content_address,
                    integrity_hash,
                    owner_key_envelope,
                    created_at: now,
                    active: true,
                    access_count: 0,
                };
                let audit = audit_entry(owner, file_id, AuditAction::Upload, now, "File uploaded");
                Ok((LedgerMutation::new(Change::StoreFile(record), audit), file_id))
            })
            .await?;

        tracing::info!(file = %file_id, owner = %owner, "file stored");
        Ok(file_id)
    }

    /// Grant (or re-grant) `recipient` access to a file.
    ///
    /// Overwrites any previous permission for the pair, including a revoked or
    /// still-active one.
    pub async fn grant_access(
        &self,
        file_id: FileId,
        recipient: Identity,
        recipient_key_envelope: KeyEnvelope,
        expires_at: i64,
        caller: Identity,
    ) -> Result<()> {
        self.mutate(move |state, now| {
            require_owner(require_file(state, file_id)?, caller)?;
            if recipient.is_null() || recipient == caller {
                return Err(LedgerError::InvalidRecipient { file_id, recipient });
            }

            let permission = AccessPermission {
                file_id,
                recipient,
                recipient_key_envelope,
                granted_at: now,
                expires_at,
                active: true,
            };
            let details = format!("Access granted to {}", recipient.short());
            let audit = audit_entry(caller, file_id, AuditAction::Share, now, details);
            Ok((LedgerMutation::new(Change::Grant(permission), audit), ()))
        })
        .await?;

        tracing::info!(file = %file_id, recipient = %recipient, expires_at, "access granted");
        Ok(())
    }

    /// Revoke `recipient`'s permission. The permission is kept, inactive.
    pub async fn revoke_access(
        &self,
        file_id: FileId,
        recipient: Identity,
        caller: Identity,
    ) -> Result<()> {
        self.mutate(move |state, now| {
            require_owner(require_file(state, file_id)?, caller)?;
            let granted = state
                .permission(file_id, &recipient)
                .map(|p| p.active)
                .unwrap_or(false);
            if !granted {
                return Err(LedgerError::NotGranted { file_id, recipient });
            }

            let details = format!("Access revoked from {}", recipient.short());
            let audit = audit_entry(caller, file_id, AuditAction::Revoke, now, details);
            let change = Change::Revoke { file_id, recipient };
            Ok((LedgerMutation::new(change, audit), ()))
        })
        .await?;

        tracing::info!(file = %file_id, recipient = %recipient, "access revoked");
        Ok(())
    }

    /// Disclose the caller's key envelope for a file.
    ///
    /// Checks, in order: existence, the file's active flag, ownership, then
    /// the caller's permission. Every success bumps the access count and
    /// appends an `access` audit entry.
    pub async fn get_decryption_key(
        &self,
        file_id: FileId,
        caller: Identity,
    ) -> Result<KeyEnvelope> {
        let envelope = self
            .mutate(move |state, now| {
                let record = require_file(state, file_id)?;
                if !record.active {
                    return Err(LedgerError::FileInactive(file_id));
                }

                let (envelope, details) = if record.owner == caller {
                    (record.owner_key_envelope.clone(), "Owner accessed file")
                } else {
                    let permission = match state.permission(file_id, &caller) {
                        Some(p) if p.active => p,
                        _ => return Err(LedgerError::AccessDenied { file_id, caller }),
                    };
                    if permission.is_expired(now) {
                        return Err(LedgerError::AccessExpired {
                            file_id,
                            expired_at: permission.expires_at,
                        });
                    }
                    (permission.recipient_key_envelope.clone(), "Recipient accessed file")
                };

                let audit = audit_entry(caller, file_id, AuditAction::Access, now, details);
                let change = Change::Access { file_id };
                Ok((LedgerMutation::new(change, audit), envelope))
            })
            .await?;

        tracing::debug!(file = %file_id, caller = %caller, "decryption key disclosed");
        Ok(envelope)
    }

    /// Deactivate a file. Irreversible; permissions are left as they are.
    pub async fn deactivate_file(&self, file_id: FileId, caller: Identity) -> Result<()> {
        self.mutate(move |state, now| {
            require_owner(require_file(state, file_id)?, caller)?;
            let audit = audit_entry(
                caller,
                file_id,
                AuditAction::Deactivate,
                now,
                "File deactivated",
            );
            let change = Change::Deactivate { file_id };
            Ok((LedgerMutation::new(change, audit), ()))
        })
        .await?;

        tracing::info!(file = %file_id, "file deactivated");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether `user` may currently read the file. No audit entry.
    pub async fn has_access(&self, file_id: FileId, user: Identity) -> Result<bool> {
        let state = self.shared.state.read().await;
        let record = require_file(&state, file_id)?;
        if !record.active {
            return Ok(false);
        }
        if record.owner == user {
            return Ok(true);
        }
        let now = self.shared.clock.now_millis();
        Ok(state
            .permission(file_id, &user)
            .map(|p| p.is_usable(now))
            .unwrap_or(false))
    }

    /// Every recipient ever granted access, in first-grant order. Owner only.
    pub async fn get_file_recipients(
        &self,
        file_id: FileId,
        caller: Identity,
    ) -> Result<Vec<Identity>> {
        let state = self.shared.state.read().await;
        require_owner(require_file(&state, file_id)?, caller)?;
        Ok(state.recipients(file_id).to_vec())
    }

    /// The file's audit trail in commit order. Owner only.
    pub async fn get_audit_logs(
        &self,
        file_id: FileId,
        caller: Identity,
    ) -> Result<Vec<AuditLogEntry>> {
        let state = self.shared.state.read().await;
        require_owner(require_file(&state, file_id)?, caller)?;
        Ok(state.audit_log(file_id).to_vec())
    }

    /// The file record.
    pub async fn get_file(&self, file_id: FileId) -> Result<FileRecord> {
        let state = self.shared.state.read().await;
        require_file(&state, file_id).cloned()
    }

    /// Files uploaded by `owner`, oldest first.
    pub async fn get_user_files(&self, owner: Identity) -> Vec<FileId> {
        self.shared.state.read().await.files_of(&owner).to_vec()
    }

    /// Number of files ever stored.
    pub async fn file_count(&self) -> u64 {
        self.shared.state.read().await.file_count()
    }

    /// Total audit entries across all files.
    pub async fn total_audit_logs(&self) -> u64 {
        self.shared.state.read().await.total_audit_logs()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal Helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate, commit, apply and broadcast one mutation on a spawned task.
    ///
    /// `plan` sees the state under the write lock and either rejects the
    /// operation or returns the mutation plus the caller's result. The task
    /// runs to completion even if the returned future is dropped.
    async fn mutate<T, F>(&self, plan: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&LedgerState, i64) -> Result<(LedgerMutation, T)> + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            let mut state = shared.state.write().await;
            let now = shared.clock.now_millis();
            let (mutation, output) = plan(&state, now)?;

            shared.store.commit(&mutation).await?;
            state.apply(&mutation);
            // No subscribers is fine.
            let _ = shared.events.send(mutation.event());
            Ok(output)
        });

        task.await.map_err(|e| LedgerError::Store(StoreError::Join(e.to_string())))?
    }
}

fn audit_entry(
    actor: Identity,
    file_id: FileId,
    action: AuditAction,
    timestamp: i64,
    details: impl Into<String>,
) -> AuditLogEntry {
    AuditLogEntry {
        actor,
        file_id,
        action,
        timestamp,
        details: details.into(),
    }
}

fn require_file(state: &LedgerState, file_id: FileId) -> Result<&FileRecord> {
    state.file(file_id).ok_or(LedgerError::NotFound(file_id))
}

fn require_owner(record: &FileRecord, caller: Identity) -> Result<()> {
    if record.owner != caller {
        return Err(LedgerError::NotOwner {
            file_id: record.id,
            caller,
        });
    }
    Ok(())
}
