//! Where storage operations get their connection from
//!
//! By default every operation opens the storage file, runs, and drops the
//! connection. A shared source hands out one connection behind a mutex so a
//! caller can batch many operations on a single handle.

use crate::db;
use crate::errors::{poisoned_handle, Result};
use crate::migrations::apply_migrations;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Clone)]
pub enum ConnectionSource {
    PerCall { path: PathBuf, busy_timeout: Duration },
    Shared(Arc<Mutex<Connection>>),
}

impl ConnectionSource {
    pub fn per_call(path: impl AsRef<Path>, busy_timeout: Duration) -> Self {
        ConnectionSource::PerCall {
            path: path.as_ref().to_path_buf(),
            busy_timeout,
        }
    }

    /// Share an already open connection; it is configured and migrated here.
    ///
    /// # Errors
    ///
    /// `Persistence` or `DataIntegrity` if configuring or migrating fails.
    pub fn shared(mut conn: Connection) -> Result<Self> {
        db::configure(&conn, DEFAULT_BUSY_TIMEOUT)?;
        apply_migrations(&mut conn)?;
        Ok(ConnectionSource::Shared(Arc::new(Mutex::new(conn))))
    }

    /// Run `f` with a connection for the duration of one operation
    ///
    /// # Errors
    ///
    /// Whatever `f` returns, plus `Persistence` if the file cannot be opened
    /// and `Internal` if the shared handle is poisoned.
    pub fn with_connection<R>(&self, f: impl FnOnce(&mut Connection) -> Result<R>) -> Result<R> {
        match self {
            ConnectionSource::PerCall { path, busy_timeout } => {
                let mut conn = db::open_storage(path, *busy_timeout)?;
                f(&mut conn)
            }
            ConnectionSource::Shared(handle) => {
                let mut conn = handle.lock().map_err(|_| poisoned_handle())?;
                f(&mut conn)
            }
        }
    }
}

impl std::fmt::Debug for ConnectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionSource::PerCall { path, busy_timeout } => f
                .debug_struct("PerCall")
                .field("path", path)
                .field("busy_timeout", busy_timeout)
                .finish(),
            ConnectionSource::Shared(_) => f.write_str("Shared"),
        }
    }
}
