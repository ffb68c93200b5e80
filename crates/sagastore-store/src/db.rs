//! Database connection management
//!
//! Provides utilities for opening and configuring SQLite connections

use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Configure a connection for shared single-file use
pub fn configure(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    // Writers wait this long for the file lock instead of failing at once
    conn.busy_timeout(busy_timeout).map_err(from_rusqlite)?;

    // WAL lets readers proceed while a writer holds the lock. The mode is
    // persistent, so it is only switched on a file that is not yet in WAL.
    // In-memory databases answer "memory" and stay as they are.
    let mode: String = conn
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .map_err(from_rusqlite)?;
    if !mode.eq_ignore_ascii_case("wal") && !mode.eq_ignore_ascii_case("memory") {
        let _mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .map_err(from_rusqlite)?;
    }

    Ok(())
}

/// Open, configure and migrate a storage file
pub fn open_storage<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Connection> {
    let mut conn = open(path)?;
    configure(&conn, busy_timeout)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}
