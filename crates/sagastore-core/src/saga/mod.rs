//! Saga records and the storage contract
//!
//! A saga record is a caller-owned payload plus two engine-managed
//! attributes: an immutable id and a revision that starts at 0 and advances
//! by one per successful update.
//!
//! Storage engines work on the untyped [`SagaEnvelope`]. Process managers
//! normally go through [`SagaStorageExt`], which converts typed
//! [`SagaRecord`]s to envelopes and copies the engine's revision changes
//! back.

pub mod correlation;

pub use correlation::{CorrelationProperty, CorrelationValue, ResolvedCorrelation};

use crate::errors::{ExError, ExErrorKind, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Implemented once per process-manager record type.
pub trait SagaData: Serialize + DeserializeOwned {
    /// Type identifier; its sanitized form names the partition.
    ///
    /// This is a persistence key. Records stored under one identifier are
    /// only found again under the same one, so it must stay fixed across
    /// builds and renames of the Rust type.
    fn saga_type() -> &'static str;
}

/// A typed saga record
#[derive(Debug, Clone, PartialEq)]
pub struct SagaRecord<T> {
    pub id: Uuid,
    pub revision: u64,
    pub data: T,
}

impl<T: SagaData> SagaRecord<T> {
    /// Fresh record with a new UUIDv7 id at revision 0
    pub fn new(data: T) -> Self {
        Self::with_id(Uuid::now_v7(), data)
    }

    pub fn with_id(id: Uuid, data: T) -> Self {
        Self {
            id,
            revision: 0,
            data,
        }
    }

    fn to_envelope(&self) -> Result<SagaEnvelope> {
        let data = serde_json::to_value(&self.data).map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_entity_id(self.id.to_string())
                .with_message(format!("Failed to serialize saga data: {}", e))
        })?;
        Ok(SagaEnvelope {
            saga_type: T::saga_type().to_string(),
            id: self.id,
            revision: self.revision,
            data,
        })
    }

    fn from_envelope(envelope: SagaEnvelope) -> Result<Self> {
        let data = serde_json::from_value(envelope.data).map_err(|e| {
            ExError::new(ExErrorKind::Serialization)
                .with_entity_id(envelope.id.to_string())
                .with_message(format!(
                    "Stored data does not deserialize as {}: {}",
                    T::saga_type(),
                    e
                ))
        })?;
        Ok(Self {
            id: envelope.id,
            revision: envelope.revision,
            data,
        })
    }
}

/// Untyped saga record: type identifier, engine attributes and JSON payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagaEnvelope {
    pub saga_type: String,
    pub id: Uuid,
    pub revision: u64,
    pub data: serde_json::Value,
}

/// Persistence contract for saga records.
///
/// Implementations partition records by sanitized `saga_type` and enforce
/// that no two records of one type share a value for any correlation
/// property passed at write time.
pub trait SagaStorage {
    /// Store a new record.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentity`: nil id
    /// - `InvalidRevision`: revision is not 0
    /// - `CorrelationCollision`: a correlation value is already taken
    /// - `Concurrency`: the id is already stored
    fn insert(&self, saga: &mut SagaEnvelope, correlations: &[ResolvedCorrelation]) -> Result<()>;

    /// Overwrite a stored record, advancing `saga.revision` by one.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentity`: nil id
    /// - `InvalidRevision`: `saga.revision` is `u64::MAX`
    /// - `Concurrency`: record missing, or stored revision differs
    /// - `CorrelationCollision`: a correlation value belongs to another record
    fn update(&self, saga: &mut SagaEnvelope, correlations: &[ResolvedCorrelation]) -> Result<()>;

    /// Remove a record by id. Absence is not an error; `saga.revision` is
    /// advanced either way.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentity`: nil id
    /// - `InvalidRevision`: `saga.revision` is `u64::MAX`
    fn delete(&self, saga: &mut SagaEnvelope) -> Result<()>;

    /// Look a record up by exact equality on one property.
    ///
    /// # Errors
    ///
    /// - `DataIntegrity`: more than one record matches
    fn find(
        &self,
        saga_type: &str,
        property_name: &str,
        value: &CorrelationValue,
    ) -> Result<Option<SagaEnvelope>>;
}

/// Typed convenience layer over any [`SagaStorage`]
pub trait SagaStorageExt: SagaStorage {
    /// Insert `saga`, checking `correlations`
    ///
    /// # Errors
    ///
    /// See [`SagaStorage::insert`].
    fn insert_saga<T: SagaData>(
        &self,
        saga: &mut SagaRecord<T>,
        correlations: &[CorrelationProperty<T>],
    ) -> Result<()> {
        let mut envelope = saga.to_envelope()?;
        let resolved = resolve_all(&saga.data, correlations);
        self.insert(&mut envelope, &resolved)?;
        saga.revision = envelope.revision;
        Ok(())
    }

    /// Update `saga`; on success its revision has advanced by one
    ///
    /// # Errors
    ///
    /// See [`SagaStorage::update`].
    fn update_saga<T: SagaData>(
        &self,
        saga: &mut SagaRecord<T>,
        correlations: &[CorrelationProperty<T>],
    ) -> Result<()> {
        let mut envelope = saga.to_envelope()?;
        let resolved = resolve_all(&saga.data, correlations);
        self.update(&mut envelope, &resolved)?;
        saga.revision = envelope.revision;
        Ok(())
    }

    /// Delete `saga`
    ///
    /// # Errors
    ///
    /// See [`SagaStorage::delete`].
    fn delete_saga<T: SagaData>(&self, saga: &mut SagaRecord<T>) -> Result<()> {
        let mut envelope = saga.to_envelope()?;
        self.delete(&mut envelope)?;
        saga.revision = envelope.revision;
        Ok(())
    }

    /// Find the record of type `T` whose `property_name` equals `value`
    ///
    /// # Errors
    ///
    /// See [`SagaStorage::find`]; also `Serialization` if the stored payload
    /// no longer fits `T`.
    fn find_saga<T: SagaData>(
        &self,
        property_name: &str,
        value: impl Into<CorrelationValue>,
    ) -> Result<Option<SagaRecord<T>>> {
        self.find(T::saga_type(), property_name, &value.into())?
            .map(SagaRecord::from_envelope)
            .transpose()
    }
}

impl<S: SagaStorage + ?Sized> SagaStorageExt for S {}

fn resolve_all<T>(data: &T, correlations: &[CorrelationProperty<T>]) -> Vec<ResolvedCorrelation> {
    correlations.iter().map(|p| p.resolve(data)).collect()
}
