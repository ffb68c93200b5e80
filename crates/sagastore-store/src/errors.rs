//! Error handling for sagastore-store
//!
//! Wraps sagastore-core ExError with store-specific helpers

use sagastore_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create a serialization error for a stored document
pub fn serialization_error(doc_id: &str, err: serde_json::Error) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_entity_id(doc_id)
        .with_message(err.to_string())
}

/// Create a configuration error
pub fn config_error(context: &str, detail: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::Config)
        .with_op("config")
        .with_message(format!("{}: {}", context, detail))
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Error for a poisoned shared connection
pub fn poisoned_handle() -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op("shared_connection")
        .with_message("Shared connection mutex is poisoned")
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::DataIntegrity)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}
