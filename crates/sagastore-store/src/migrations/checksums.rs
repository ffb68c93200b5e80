//! Migration checksums
//!
//! Each applied migration's SQL is recorded as a hex SHA-256 digest. A
//! migration whose embedded SQL no longer matches its recorded digest was
//! edited after it shipped, and the database is refused.

use crate::errors::{checksum_mismatch, Result};
use sha2::{Digest, Sha256};

pub fn compute_checksum(sql: &str) -> String {
    hex::encode(Sha256::digest(sql.as_bytes()))
}

/// Compare embedded SQL with the digest recorded when it was applied.
///
/// Rows written without a checksum are accepted.
pub fn verify_checksum(migration_id: &str, sql: &str, recorded: Option<&str>) -> Result<()> {
    match recorded {
        Some(recorded) if recorded != compute_checksum(sql) => Err(checksum_mismatch(
            migration_id,
            recorded,
            &compute_checksum(sql),
        )),
        _ => Ok(()),
    }
}
