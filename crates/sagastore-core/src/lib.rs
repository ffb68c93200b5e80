//! SagaStore Core - domain contracts for saga and subscription persistence
//!
//! This crate provides:
//! - The structured error facility (`ExError`, `ExErrorKind`, `SagaStoreError`)
//! - The structured logging facility and lifecycle macros
//! - Partition name sanitizing
//! - Saga records, correlation descriptors and the `SagaStorage` trait
//! - The `SubscriptionStorage` trait
//!
//! Storage engines live in `sagastore-store`.

pub mod errors;
pub mod logging_facility;
pub mod naming;
pub mod saga;
pub mod subscription;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, Result, SagaStoreError};
pub use naming::correct_name;
pub use saga::{
    CorrelationProperty, CorrelationValue, ResolvedCorrelation, SagaData, SagaEnvelope,
    SagaRecord, SagaStorage, SagaStorageExt,
};
pub use subscription::{Subscriber, SubscriptionStorage};
