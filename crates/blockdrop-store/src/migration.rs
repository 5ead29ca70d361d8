//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "ledger schema migrated");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per stored file; ids are 1-based and dense
        CREATE TABLE files (
            id INTEGER PRIMARY KEY,
            owner BLOB NOT NULL,               -- 32 bytes
            content_address TEXT NOT NULL,
            integrity_hash BLOB NOT NULL,      -- 32 bytes
            owner_key_envelope TEXT NOT NULL,
            created_at INTEGER NOT NULL,       -- Unix ms
            active INTEGER NOT NULL,           -- 1 until deactivated
            access_count INTEGER NOT NULL DEFAULT 0
        );

        -- At most one permission per (file, recipient); never deleted
        CREATE TABLE permissions (
            file_id INTEGER NOT NULL REFERENCES files(id),
            recipient BLOB NOT NULL,
            recipient_key_envelope TEXT NOT NULL,
            granted_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,       -- 0 = never
            active INTEGER NOT NULL,
            PRIMARY KEY (file_id, recipient)
        );

        -- Every recipient ever granted, in first-grant order
        CREATE TABLE recipients (
            file_id INTEGER NOT NULL REFERENCES files(id),
            position INTEGER NOT NULL,
            recipient BLOB NOT NULL,
            PRIMARY KEY (file_id, recipient),
            UNIQUE (file_id, position)
        );

        -- Append-only audit trail; seq gives the global commit order
        CREATE TABLE audit_logs (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id INTEGER NOT NULL,
            actor BLOB NOT NULL,
            action TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            details TEXT NOT NULL
        );

        CREATE INDEX idx_files_owner ON files(owner);
        CREATE INDEX idx_audit_file ON audit_logs(file_id, seq);
        "#,
    )?;

    Ok(())
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
