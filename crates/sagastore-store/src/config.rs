//! Store configuration
//!
//! ```toml
//! path = "/var/lib/app/sagas.db"
//! busy_timeout_ms = 5000
//! reject_name_collisions = true
//! ```

use crate::errors::{config_error, io_error, Result};
use crate::saga_storage::SqliteSagaStorage;
use crate::source::{ConnectionSource, DEFAULT_BUSY_TIMEOUT};
use crate::subscription_storage::SqliteSubscriptionStorage;
use sagastore_core::errors::require_non_empty;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Storage file, created on first use
    pub path: PathBuf,

    /// How long a writer waits for the file lock
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Refuse a write or delete when its name sanitizes onto a partition
    /// owned by a different name. Reads are not checked and see whatever the
    /// owning name stored.
    #[serde(default = "default_reject_name_collisions")]
    pub reject_name_collisions: bool,
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT.as_millis() as u64
}

fn default_reject_name_collisions() -> bool {
    true
}

impl StoreConfig {
    /// Defaults for the storage file at `path`
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `path` is empty.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self {
            path: path.as_ref().to_path_buf(),
            busy_timeout_ms: default_busy_timeout_ms(),
            reject_name_collisions: default_reject_name_collisions(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// `Config` on malformed TOML, `InvalidInput` on an empty path.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| config_error("invalid store config", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, otherwise as [`StoreConfig::from_toml_str`].
    pub fn load(file: impl AsRef<Path>) -> Result<Self> {
        let contents =
            std::fs::read_to_string(file.as_ref()).map_err(|e| io_error("config_load", e))?;
        Self::from_toml_str(&contents)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn connection_source(&self) -> ConnectionSource {
        ConnectionSource::per_call(&self.path, self.busy_timeout())
    }

    pub fn saga_storage(&self) -> SqliteSagaStorage {
        SqliteSagaStorage::new(self.connection_source(), self.reject_name_collisions)
    }

    pub fn subscription_storage(&self) -> SqliteSubscriptionStorage {
        SqliteSubscriptionStorage::new(self.connection_source(), self.reject_name_collisions)
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("path", &self.path.to_string_lossy())
    }
}

/// Saga storage in the SQLite file at `path`, with default settings
///
/// # Errors
///
/// `InvalidInput` if `path` is empty.
pub fn store_sagas_in_sqlite(path: impl AsRef<Path>) -> Result<SqliteSagaStorage> {
    Ok(StoreConfig::new(path)?.saga_storage())
}

/// Subscription storage in the SQLite file at `path`, with default settings
///
/// # Errors
///
/// `InvalidInput` if `path` is empty.
pub fn store_subscriptions_in_sqlite(path: impl AsRef<Path>) -> Result<SqliteSubscriptionStorage> {
    Ok(StoreConfig::new(path)?.subscription_storage())
}
