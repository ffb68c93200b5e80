use thiserror::Error;

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers can match on
/// programmatically, independent of the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Saga records
    InvalidIdentity,
    InvalidRevision,
    CorrelationCollision,
    Concurrency,
    /// A correlation lookup matched more than one record
    DataIntegrity,

    // Subscriptions
    NotFound,

    // Arguments and configuration
    InvalidInput,
    /// Two distinct logical names sanitize to the same partition
    PartitionCollision,
    Config,

    // Integration/IO
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidIdentity => "ERR_INVALID_IDENTITY",
            ExErrorKind::InvalidRevision => "ERR_INVALID_REVISION",
            ExErrorKind::CorrelationCollision => "ERR_CORRELATION_COLLISION",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::DataIntegrity => "ERR_DATA_INTEGRITY",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::PartitionCollision => "ERR_PARTITION_COLLISION",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling plus optional
/// context (operation, entity, partition) for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    partition: Option<String>,
    message: String,
    candidates: Option<Vec<String>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            partition: None,
            message: String::new(),
            candidates: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add partition context
    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add candidate entity ids (used for DataIntegrity to carry every matching id)
    pub fn with_candidates(mut self, ids: Vec<String>) -> Self {
        self.candidates = Some(ids);
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the partition context, if any
    pub fn partition(&self) -> Option<&str> {
        self.partition.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get candidate entity ids, if any
    pub fn candidates(&self) -> Option<&[String]> {
        self.candidates.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(partition) = &self.partition {
            write!(f, " (partition: {})", partition)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Domain error taxonomy for saga and subscription storage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SagaStoreError {
    /// Saga record carries the nil id
    #[error("Saga data must be provided with an ID in order to {op}")]
    MissingId { op: String },

    /// Insert attempted with a revision other than 0
    #[error("Attempted to insert saga data with ID {saga_id} and revision {revision}, but revision must be 0 on first insert")]
    NonZeroInitialRevision { saga_id: String, revision: u64 },

    /// Revision cannot advance past `u64::MAX`
    #[error("Saga data with ID {saga_id} is at revision {revision} and cannot be advanced")]
    RevisionOverflow { saga_id: String, revision: u64 },

    /// Correlation value already present on a different record
    #[error("Collision on correlation property {property} : {value}")]
    CorrelationCollision {
        saga_id: String,
        existing_id: String,
        property: String,
        value: String,
    },

    /// Insert of an id that is already stored
    #[error("Saga data with ID {saga_id} already exists")]
    SagaAlreadyExists { saga_id: String },

    /// Update target is gone
    #[error("Saga data with ID {saga_id} no longer exists and cannot be updated")]
    SagaNoLongerExists { saga_id: String },

    /// Caller holds a stale copy
    #[error("Attempted to update saga data with ID {saga_id} with revision {revision}, but the existing data was updated to revision {stored_revision}")]
    StaleRevision {
        saga_id: String,
        revision: u64,
        stored_revision: u64,
    },

    /// Correlation lookup produced several records
    #[error("Found {} saga records in {partition} where {property} = {value}", .saga_ids.len())]
    AmbiguousCorrelation {
        partition: String,
        property: String,
        value: String,
        saga_ids: Vec<String>,
    },

    /// Unregister found nothing to remove
    #[error("Cannot delete item '{address}' from '{topic}'")]
    SubscriberNotFound { topic: String, address: String },

    /// Required argument was empty
    #[error("Argument '{name}' must not be empty")]
    EmptyArgument { name: String },

    /// Name sanitized to nothing
    #[error("'{source_name}' does not contain any character usable in a partition name")]
    UnusablePartitionName { source_name: String },

    /// Two logical names share one sanitized partition
    #[error("Partition '{partition}' already belongs to '{existing_source}', refusing '{source_name}'")]
    PartitionNameCollision {
        partition: String,
        existing_source: String,
        source_name: String,
    },
}

impl From<SagaStoreError> for ExError {
    fn from(err: SagaStoreError) -> Self {
        let message = err.to_string();
        match err {
            SagaStoreError::MissingId { op } => ExError::new(ExErrorKind::InvalidIdentity)
                .with_op(op)
                .with_message(message),

            SagaStoreError::NonZeroInitialRevision { saga_id, .. }
            | SagaStoreError::RevisionOverflow { saga_id, .. } => {
                ExError::new(ExErrorKind::InvalidRevision)
                    .with_entity_id(saga_id)
                    .with_message(message)
            }

            SagaStoreError::CorrelationCollision { saga_id, existing_id, .. } => {
                ExError::new(ExErrorKind::CorrelationCollision)
                    .with_entity_id(saga_id)
                    .with_candidates(vec![existing_id])
                    .with_message(message)
            }

            SagaStoreError::SagaAlreadyExists { saga_id }
            | SagaStoreError::SagaNoLongerExists { saga_id }
            | SagaStoreError::StaleRevision { saga_id, .. } => {
                ExError::new(ExErrorKind::Concurrency)
                    .with_entity_id(saga_id)
                    .with_message(message)
            }

            SagaStoreError::AmbiguousCorrelation { partition, saga_ids, .. } => {
                ExError::new(ExErrorKind::DataIntegrity)
                    .with_partition(partition)
                    .with_candidates(saga_ids)
                    .with_message(message)
            }

            SagaStoreError::SubscriberNotFound { topic, address } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_entity_id(address)
                    .with_partition(topic)
                    .with_message(message)
            }

            SagaStoreError::EmptyArgument { .. } | SagaStoreError::UnusablePartitionName { .. } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(message)
            }

            SagaStoreError::PartitionNameCollision { partition, .. } => {
                ExError::new(ExErrorKind::PartitionCollision)
                    .with_partition(partition)
                    .with_message(message)
            }
        }
    }
}

/// Fail with `InvalidInput` when a required string argument is empty
pub fn require_non_empty(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(SagaStoreError::EmptyArgument {
            name: name.to_string(),
        }
        .into());
    }
    Ok(())
}
