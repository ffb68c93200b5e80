//! SQLite saga storage engine
//!
//! Each saga type gets its own partition (named by the sanitized type
//! identifier). Stored bodies have the shape `{"id", "revision", "data"}`, so
//! correlation properties are looked up under `data.`.
//!
//! Every write runs in one `BEGIN IMMEDIATE` transaction covering both the
//! checks and the write. Writers through this engine are therefore
//! serialized on the storage file and a failed write leaves nothing behind.

use crate::errors::{from_rusqlite, serialization_error, Result};
use crate::partition::{Document, Partition, PartitionKind};
use crate::source::ConnectionSource;
use rusqlite::{Connection, TransactionBehavior};
use sagastore_core::errors::{require_non_empty, SagaStoreError};
use sagastore_core::{
    log_op_end, log_op_error, log_op_start, CorrelationValue, ExError, ResolvedCorrelation,
    SagaEnvelope, SagaStorage,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

const OP_INSERT: &str = "saga_insert";
const OP_UPDATE: &str = "saga_update";
const OP_DELETE: &str = "saga_delete";
const OP_FIND: &str = "saga_find";

/// Saga storage over a single SQLite file
#[derive(Debug, Clone)]
pub struct SqliteSagaStorage {
    source: ConnectionSource,
    reject_name_collisions: bool,
}

/// On-disk body of a saga document
#[derive(Debug, Serialize, Deserialize)]
struct StoredSaga {
    id: Uuid,
    revision: u64,
    data: serde_json::Value,
}

impl SqliteSagaStorage {
    pub fn new(source: ConnectionSource, reject_name_collisions: bool) -> Self {
        Self {
            source,
            reject_name_collisions,
        }
    }

    fn insert_in(
        &self,
        conn: &mut Connection,
        saga: &SagaEnvelope,
        correlations: &[ResolvedCorrelation],
    ) -> Result<()> {
        if saga.id.is_nil() {
            return Err(SagaStoreError::MissingId {
                op: "insert".to_string(),
            }
            .into());
        }
        if saga.revision != 0 {
            return Err(SagaStoreError::NonZeroInitialRevision {
                saga_id: saga.id.to_string(),
                revision: saga.revision,
            }
            .into());
        }

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(from_rusqlite)?;
        let partition = Partition::open(&tx, PartitionKind::Saga, &saga.saga_type)?;
        partition.register(&saga.saga_type, self.reject_name_collisions)?;

        check_correlations(&partition, saga, correlations, None)?;

        let id = saga.id.to_string();
        if partition.find_by_id(&id)?.is_some() {
            return Err(SagaStoreError::SagaAlreadyExists { saga_id: id }.into());
        }

        partition.insert(&to_document(saga, saga.revision)?)?;
        tx.commit().map_err(from_rusqlite)
    }

    /// Returns the revision now stored
    fn update_in(
        &self,
        conn: &mut Connection,
        saga: &SagaEnvelope,
        correlations: &[ResolvedCorrelation],
    ) -> Result<u64> {
        if saga.id.is_nil() {
            return Err(SagaStoreError::MissingId {
                op: "update".to_string(),
            }
            .into());
        }
        let next = next_revision(saga)?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(from_rusqlite)?;
        let partition = Partition::open(&tx, PartitionKind::Saga, &saga.saga_type)?;
        partition.register(&saga.saga_type, self.reject_name_collisions)?;

        let id = saga.id.to_string();
        let stored = partition
            .find_by_id(&id)?
            .ok_or_else(|| SagaStoreError::SagaNoLongerExists {
                saga_id: id.clone(),
            })?;

        check_correlations(&partition, saga, correlations, Some(&id))?;

        let stored = decode(stored)?;
        if stored.revision != saga.revision {
            return Err(SagaStoreError::StaleRevision {
                saga_id: id,
                revision: saga.revision,
                stored_revision: stored.revision,
            }
            .into());
        }

        partition.update(&to_document(saga, next)?)?;
        tx.commit().map_err(from_rusqlite)?;
        Ok(next)
    }

    /// Returns rows removed and the revision the caller's copy advances to
    fn delete_in(&self, conn: &Connection, saga: &SagaEnvelope) -> Result<(usize, u64)> {
        if saga.id.is_nil() {
            return Err(SagaStoreError::MissingId {
                op: "delete".to_string(),
            }
            .into());
        }
        let next = next_revision(saga)?;
        let partition = Partition::open(conn, PartitionKind::Saga, &saga.saga_type)?;
        partition.check_owner(&saga.saga_type, self.reject_name_collisions)?;
        let removed = partition.delete_by_id(&saga.id.to_string())?;
        Ok((removed, next))
    }

    fn find_in(
        &self,
        conn: &Connection,
        saga_type: &str,
        property_name: &str,
        value: &CorrelationValue,
    ) -> Result<Option<SagaEnvelope>> {
        require_non_empty("property name", property_name)?;
        let partition = Partition::open(conn, PartitionKind::Saga, saga_type)?;
        let mut matches = partition.find_by_equality(&data_path(property_name), value)?;

        if matches.len() > 1 {
            return Err(SagaStoreError::AmbiguousCorrelation {
                partition: partition.name().to_string(),
                property: property_name.to_string(),
                value: value.to_string(),
                saga_ids: matches.into_iter().map(|d| d.id).collect(),
            }
            .into());
        }

        matches
            .pop()
            .map(|doc| {
                let stored = decode(doc)?;
                Ok(SagaEnvelope {
                    saga_type: saga_type.to_string(),
                    id: stored.id,
                    revision: stored.revision,
                    data: stored.data,
                })
            })
            .transpose()
    }
}

impl SagaStorage for SqliteSagaStorage {
    fn insert(&self, saga: &mut SagaEnvelope, correlations: &[ResolvedCorrelation]) -> Result<()> {
        let start = Instant::now();
        log_op_start!(OP_INSERT, saga_type = %saga.saga_type, saga_id = %saga.id);

        let result = self
            .source
            .with_connection(|conn| self.insert_in(conn, saga, correlations));

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => {
                log_op_end!(OP_INSERT, duration_ms = duration_ms, saga_id = %saga.id);
            }
            Err(e) => {
                log_op_error!(OP_INSERT, e.clone(), duration_ms = duration_ms, saga_id = %saga.id);
            }
        }
        result
    }

    fn update(&self, saga: &mut SagaEnvelope, correlations: &[ResolvedCorrelation]) -> Result<()> {
        let start = Instant::now();
        log_op_start!(
            OP_UPDATE,
            saga_type = %saga.saga_type,
            saga_id = %saga.id,
            revision = saga.revision
        );

        let result = self
            .source
            .with_connection(|conn| self.update_in(conn, saga, correlations));

        let duration_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(next) => {
                saga.revision = next;
                log_op_end!(
                    OP_UPDATE,
                    duration_ms = duration_ms,
                    saga_id = %saga.id,
                    revision = next
                );
                Ok(())
            }
            Err(e) => {
                log_op_error!(OP_UPDATE, e.clone(), duration_ms = duration_ms, saga_id = %saga.id);
                Err(e)
            }
        }
    }

    fn delete(&self, saga: &mut SagaEnvelope) -> Result<()> {
        let start = Instant::now();
        log_op_start!(OP_DELETE, saga_type = %saga.saga_type, saga_id = %saga.id);

        let result = self.source.with_connection(|conn| self.delete_in(conn, saga));

        let duration_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok((removed, next)) => {
                saga.revision = next;
                log_op_end!(
                    OP_DELETE,
                    duration_ms = duration_ms,
                    saga_id = %saga.id,
                    removed = removed as u64
                );
                Ok(())
            }
            Err(e) => {
                log_op_error!(OP_DELETE, e.clone(), duration_ms = duration_ms, saga_id = %saga.id);
                Err(e)
            }
        }
    }

    fn find(
        &self,
        saga_type: &str,
        property_name: &str,
        value: &CorrelationValue,
    ) -> Result<Option<SagaEnvelope>> {
        let start = Instant::now();
        log_op_start!(OP_FIND, saga_type = saga_type, property = property_name);

        let result = self
            .source
            .with_connection(|conn| self.find_in(conn, saga_type, property_name, value));

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(found) => {
                log_op_end!(
                    OP_FIND,
                    duration_ms = duration_ms,
                    saga_type = saga_type,
                    match_count = u64::from(found.is_some())
                );
            }
            Err(e) => {
                log_op_error!(OP_FIND, e.clone(), duration_ms = duration_ms, saga_type = saga_type);
            }
        }
        result
    }
}

/// Fail if any correlation value is already held by another record.
///
/// `own_id` is the id of the record being updated; its own row never
/// collides. On insert every match collides.
fn check_correlations(
    partition: &Partition<'_>,
    saga: &SagaEnvelope,
    correlations: &[ResolvedCorrelation],
    own_id: Option<&str>,
) -> Result<()> {
    for correlation in correlations {
        require_non_empty("correlation property", &correlation.property_name)?;
        let matches =
            partition.find_by_equality(&data_path(&correlation.property_name), &correlation.value)?;

        if let Some(other) = matches.iter().find(|doc| Some(doc.id.as_str()) != own_id) {
            return Err(SagaStoreError::CorrelationCollision {
                saga_id: saga.id.to_string(),
                existing_id: other.id.clone(),
                property: correlation.property_name.clone(),
                value: correlation.value.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

fn next_revision(saga: &SagaEnvelope) -> Result<u64> {
    saga.revision.checked_add(1).ok_or_else(|| {
        ExError::from(SagaStoreError::RevisionOverflow {
            saga_id: saga.id.to_string(),
            revision: saga.revision,
        })
    })
}

fn data_path(property_name: &str) -> String {
    format!("data.{}", property_name)
}

fn to_document(saga: &SagaEnvelope, revision: u64) -> Result<Document> {
    let id = saga.id.to_string();
    let body = serde_json::to_value(StoredSaga {
        id: saga.id,
        revision,
        data: saga.data.clone(),
    })
    .map_err(|e| serialization_error(&id, e))?;
    Ok(Document { id, body })
}

fn decode(doc: Document) -> Result<StoredSaga> {
    serde_json::from_value(doc.body).map_err(|e| serialization_error(&doc.id, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn storage() -> SqliteSagaStorage {
        let source = ConnectionSource::shared(Connection::open_in_memory().unwrap()).unwrap();
        SqliteSagaStorage::new(source, true)
    }

    fn envelope(data: serde_json::Value) -> SagaEnvelope {
        SagaEnvelope {
            saga_type: "Tests.OrderSaga".to_string(),
            id: Uuid::now_v7(),
            revision: 0,
            data,
        }
    }

    #[test]
    fn test_stored_body_shape() {
        let saga = envelope(json!({"order": 7}));
        let doc = to_document(&saga, 3).unwrap();

        assert_eq!(doc.id, saga.id.to_string());
        assert_eq!(doc.body["revision"], 3);
        assert_eq!(doc.body["data"]["order"], 7);
        assert_eq!(doc.body["id"], saga.id.to_string());
    }

    #[test]
    fn test_find_with_empty_property_is_invalid_input() {
        let storage = storage();
        let err = storage
            .find("Tests.OrderSaga", "", &CorrelationValue::Integer(1))
            .unwrap_err();
        assert_eq!(err.kind(), sagastore_core::ExErrorKind::InvalidInput);
    }

    #[test]
    fn test_failed_insert_writes_nothing() {
        let storage = storage();
        let mut first = envelope(json!({"order": 1}));
        let correlations = [ResolvedCorrelation::new("order", 1)];
        storage.insert(&mut first, &correlations).unwrap();

        let mut second = envelope(json!({"order": 1, "marker": "second"}));
        assert!(storage.insert(&mut second, &correlations).is_err());

        let found = storage
            .find("Tests.OrderSaga", "marker", &CorrelationValue::from("second"))
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_revision_at_max_cannot_advance() {
        let storage = storage();
        let mut saga = envelope(json!({"order": 9}));
        storage.insert(&mut saga, &[]).unwrap();

        saga.revision = u64::MAX;
        let err = storage.update(&mut saga, &[]).unwrap_err();
        assert_eq!(err.kind(), sagastore_core::ExErrorKind::InvalidRevision);
        assert_eq!(saga.revision, u64::MAX);

        let err = storage.delete(&mut saga).unwrap_err();
        assert_eq!(err.kind(), sagastore_core::ExErrorKind::InvalidRevision);
        assert_eq!(saga.revision, u64::MAX);

        // Nothing was removed
        let found = storage
            .find("Tests.OrderSaga", "order", &CorrelationValue::Integer(9))
            .unwrap();
        assert_eq!(found.unwrap().revision, 0);
    }
}
