//! SQLite implementation of the LedgerStore trait.
//!
//! This is the durable backend for the access ledger. It materializes the
//! ledger tables directly and uses rusqlite with bundled SQLite, wrapped in
//! async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, Transaction};

use blockdrop_core::{
    AccessPermission, AuditLogEntry, Change, ContentAddress, FileId, FileRecord, Identity,
    IntegrityHash, KeyEnvelope, LedgerMutation, LedgerState,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::LedgerStore;

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` on the connection from a blocking task.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = lock(&conn)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|e| {
        StoreError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            Some(format!("mutex poisoned: {}", e)),
        ))
    })
}

#[async_trait]
impl LedgerStore for SqliteStore {
    async fn commit(&self, mutation: &LedgerMutation) -> Result<()> {
        let mutation = mutation.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            apply_change(&tx, &mutation.change)?;
            insert_audit(&tx, &mutation.audit)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn load(&self) -> Result<LedgerState> {
        self.blocking(|conn| {
            let files = load_files(conn)?;
            let permissions = load_permissions(conn)?;
            let recipients = load_recipients(conn)?;
            let audit = load_audit(conn)?;
            Ok(LedgerState::from_tables(files, permissions, recipients, audit)?)
        })
        .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Writes
// ─────────────────────────────────────────────────────────────────────────────

fn apply_change(tx: &Transaction<'_>, change: &Change) -> Result<()> {
    match change {
        Change::StoreFile(record) => {
            tx.execute(
                "INSERT INTO files (
                    id, owner, content_address, integrity_hash, owner_key_envelope,
                    created_at, active, access_count
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id.get() as i64,
                    record.owner.as_bytes().as_slice(),
                    record.content_address.as_str(),
                    record.integrity_hash.as_bytes().as_slice(),
                    record.owner_key_envelope.as_str(),
                    record.created_at,
                    record.active,
                    record.access_count as i64,
                ],
            )?;
        }
        Change::Grant(permission) => {
            tx.execute(
                "INSERT INTO permissions (
                    file_id, recipient, recipient_key_envelope, granted_at, expires_at, active
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT (file_id, recipient) DO UPDATE SET
                    recipient_key_envelope = excluded.recipient_key_envelope,
                    granted_at = excluded.granted_at,
                    expires_at = excluded.expires_at,
                    active = excluded.active",
                params![
                    permission.file_id.get() as i64,
                    permission.recipient.as_bytes().as_slice(),
                    permission.recipient_key_envelope.as_str(),
                    permission.granted_at,
                    permission.expires_at,
                    permission.active,
                ],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO recipients (file_id, position, recipient)
                 VALUES (?1, (SELECT COUNT(*) FROM recipients WHERE file_id = ?1), ?2)",
                params![
                    permission.file_id.get() as i64,
                    permission.recipient.as_bytes().as_slice(),
                ],
            )?;
        }
        Change::Revoke { file_id, recipient } => {
            let updated = tx.execute(
                "UPDATE permissions SET active = 0 WHERE file_id = ?1 AND recipient = ?2",
                params![file_id.get() as i64, recipient.as_bytes().as_slice()],
            )?;
            expect_one_row(updated, *file_id, "no permission to revoke")?;
        }
        Change::Access { file_id } => {
            let updated = tx.execute(
                "UPDATE files SET access_count = access_count + 1 WHERE id = ?1",
                params![file_id.get() as i64],
            )?;
            expect_one_row(updated, *file_id, "unknown file")?;
        }
        Change::Deactivate { file_id } => {
            let updated = tx.execute(
                "UPDATE files SET active = 0 WHERE id = ?1",
                params![file_id.get() as i64],
            )?;
            expect_one_row(updated, *file_id, "unknown file")?;
        }
    }
    Ok(())
}

fn insert_audit(tx: &Transaction<'_>, entry: &AuditLogEntry) -> Result<()> {
    tx.execute(
        "INSERT INTO audit_logs (file_id, actor, action, timestamp, details)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.file_id.get() as i64,
            entry.actor.as_bytes().as_slice(),
            entry.action.as_str(),
            entry.timestamp,
            entry.details,
        ],
    )?;
    Ok(())
}

fn expect_one_row(updated: usize, file_id: FileId, reason: &str) -> Result<()> {
    if updated != 1 {
        return Err(StoreError::InvalidData(format!("file {}: {}", file_id, reason)));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Reads
// ─────────────────────────────────────────────────────────────────────────────

fn load_files(conn: &Connection) -> Result<Vec<FileRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner, content_address, integrity_hash, owner_key_envelope,
                created_at, active, access_count
         FROM files ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, Vec<u8>>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Vec<u8>>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, i64>(5)?,
            row.get::<_, bool>(6)?,
            row.get::<_, i64>(7)?,
        ))
    })?;

    let mut files = Vec::new();
    for row in rows {
        let (id, owner, address, hash, envelope, created_at, active, access_count) = row?;
        files.push(FileRecord {
            id: FileId(id as u64),
            owner: Identity::from_bytes(to_array(owner, "owner")?),
            content_address: ContentAddress::new(address)?,
            integrity_hash: IntegrityHash(to_array(hash, "integrity_hash")?),
            owner_key_envelope: KeyEnvelope::new(envelope),
            created_at,
            active,
            access_count: access_count as u64,
        });
    }
    Ok(files)
}

fn load_permissions(conn: &Connection) -> Result<Vec<AccessPermission>> {
    let mut stmt = conn.prepare(
        "SELECT file_id, recipient, recipient_key_envelope, granted_at, expires_at, active
         FROM permissions",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, Vec<u8>>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, bool>(5)?,
        ))
    })?;

    let mut permissions = Vec::new();
    for row in rows {
        let (file_id, recipient, envelope, granted_at, expires_at, active) = row?;
        permissions.push(AccessPermission {
            file_id: FileId(file_id as u64),
            recipient: Identity::from_bytes(to_array(recipient, "recipient")?),
            recipient_key_envelope: KeyEnvelope::new(envelope),
            granted_at,
            expires_at,
            active,
        });
    }
    Ok(permissions)
}

fn load_recipients(conn: &Connection) -> Result<Vec<(FileId, Identity)>> {
    let mut stmt =
        conn.prepare("SELECT file_id, recipient FROM recipients ORDER BY file_id, position")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
    })?;

    let mut recipients = Vec::new();
    for row in rows {
        let (file_id, recipient) = row?;
        recipients.push((
            FileId(file_id as u64),
            Identity::from_bytes(to_array(recipient, "recipient")?),
        ));
    }
    Ok(recipients)
}

fn load_audit(conn: &Connection) -> Result<Vec<AuditLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT file_id, actor, action, timestamp, details FROM audit_logs ORDER BY seq",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, Vec<u8>>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (file_id, actor, action, timestamp, details) = row?;
        entries.push(AuditLogEntry {
            actor: Identity::from_bytes(to_array(actor, "actor")?),
            file_id: FileId(file_id as u64),
            action: action.parse()?,
            timestamp,
            details,
        });
    }
    Ok(entries)
}

fn to_array(bytes: Vec<u8>, column: &str) -> Result<[u8; 32]> {
    bytes.try_into().map_err(|b: Vec<u8>| {
        StoreError::InvalidData(format!("{}: expected 32 bytes, got {}", column, b.len()))
    })
}
