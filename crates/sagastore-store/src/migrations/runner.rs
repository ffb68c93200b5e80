//! Migration runner
//!
//! Applies migrations with checksums and idempotency

use crate::errors::{from_rusqlite, migration_error, Result};
use crate::migrations::checksums::{compute_checksum, verify_checksum};
use crate::migrations::embedded::get_migrations;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;

/// Apply all pending migrations to the database
///
/// Safe to call on every open: applied migrations are skipped after their
/// checksum is verified. When nothing is pending only reads are issued, so
/// an up-to-date file never waits on another writer here.
pub fn apply_migrations(conn: &mut Connection) -> Result<()> {
    let applied = applied_checksums(conn)?;

    for migration in get_migrations() {
        match applied.get(migration.id) {
            Some(recorded) => verify_checksum(migration.id, migration.sql, recorded.as_deref())?,
            None => apply_migration(conn, migration.id, migration.sql)?,
        }
    }

    Ok(())
}

/// Recorded checksum per applied migration, read outside any transaction
fn applied_checksums(conn: &Connection) -> Result<HashMap<String, Option<String>>> {
    let has_table: bool = conn
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version')",
            [],
            |row| row.get(0),
        )
        .map_err(from_rusqlite)?;
    if !has_table {
        return Ok(HashMap::new());
    }

    let mut stmt = conn
        .prepare("SELECT migration_id, checksum FROM schema_version")
        .map_err(from_rusqlite)?;
    let rows: HashMap<String, Option<String>> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<HashMap<_, _>, _>>()
        .map_err(from_rusqlite)?;
    Ok(rows)
}

/// Create the schema_version table if it doesn't exist
fn create_schema_version_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY,
            migration_id TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL,
            checksum TEXT
        )",
        [],
    )
    .map_err(from_rusqlite)?;

    Ok(())
}

/// Apply a single migration if not already applied
fn apply_migration(conn: &mut Connection, migration_id: &str, sql: &str) -> Result<()> {
    // IMMEDIATE so two processes opening a fresh file cannot both run the SQL.
    // The other one may have finished first, hence the second look below.
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(from_rusqlite)?;
    create_schema_version_table(&tx)?;

    let applied: Option<Option<String>> = tx
        .query_row(
            "SELECT checksum FROM schema_version WHERE migration_id = ?",
            [migration_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;

    if let Some(recorded) = applied {
        return verify_checksum(migration_id, sql, recorded.as_deref());
    }

    tx.execute_batch(sql)
        .map_err(|e| migration_error(migration_id, &e.to_string()))?;

    let now = chrono::Utc::now().timestamp();
    tx.execute(
        "INSERT INTO schema_version (migration_id, applied_at, checksum) VALUES (?, ?, ?)",
        rusqlite::params![migration_id, now, compute_checksum(sql)],
    )
    .map_err(from_rusqlite)?;

    tx.commit().map_err(from_rusqlite)?;

    tracing::debug!(migration_id, "applied migration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_migrations() {
        let mut conn = Connection::open_in_memory().unwrap();
        let result = apply_migrations(&mut conn);
        assert!(result.is_ok());
    }

    #[test]
    fn test_idempotency() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        let result = apply_migrations(&mut conn);
        assert!(result.is_ok());
    }

    #[test]
    fn test_edited_migration_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        conn.execute(
            "UPDATE schema_version SET checksum = 'deadbeef' WHERE migration_id = ?",
            ["001_partitioned_documents"],
        )
        .unwrap();

        let err = apply_migrations(&mut conn).unwrap_err();
        assert_eq!(err.kind(), sagastore_core::ExErrorKind::DataIntegrity);
    }

    #[test]
    fn test_migrated_file_opens_while_another_writer_holds_the_lock() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("locked.db");
        let mut first = Connection::open(&path).unwrap();
        first
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))
            .unwrap();
        apply_migrations(&mut first).unwrap();

        let writer = Connection::open(&path).unwrap();
        writer.execute_batch("BEGIN IMMEDIATE").unwrap();

        let mut second = Connection::open(&path).unwrap();
        second
            .busy_timeout(std::time::Duration::from_millis(50))
            .unwrap();
        assert!(apply_migrations(&mut second).is_ok());

        writer.execute_batch("COMMIT").unwrap();
    }
}
