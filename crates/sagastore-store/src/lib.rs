//! SagaStore Store - SQLite engines for saga and subscription storage
//!
//! Provides:
//! - A single-file SQLite schema with embedded, checksummed migrations
//! - A partitioned JSON document layer with a partition-name catalog
//! - `SqliteSagaStorage` and `SqliteSubscriptionStorage`
//! - TOML configuration and the `store_*_in_sqlite` shortcuts

pub mod config;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod partition;
pub mod saga_storage;
pub mod source;
pub mod subscription_storage;

// Re-export key types
pub use config::{store_sagas_in_sqlite, store_subscriptions_in_sqlite, StoreConfig};
pub use errors::Result;
pub use partition::{list_partitions, PartitionInfo, PartitionKind};
pub use saga_storage::SqliteSagaStorage;
pub use source::ConnectionSource;
pub use subscription_storage::SqliteSubscriptionStorage;
