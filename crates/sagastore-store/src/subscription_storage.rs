//! SQLite subscription registry
//!
//! One topic partition per sanitized topic name; each registration is a
//! separate `{"address"}` document with a fresh UUIDv7 id, so repeated
//! registrations are kept.

use crate::errors::{from_rusqlite, serialization_error, Result};
use crate::partition::{Document, Partition, PartitionKind};
use crate::source::ConnectionSource;
use rusqlite::{Connection, TransactionBehavior};
use sagastore_core::errors::{require_non_empty, SagaStoreError};
use sagastore_core::{
    log_op_end, log_op_error, log_op_start, CorrelationValue, Subscriber, SubscriptionStorage,
};
use std::time::Instant;
use uuid::Uuid;

const OP_REGISTER: &str = "subscriber_register";
const OP_UNREGISTER: &str = "subscriber_unregister";
const OP_LIST: &str = "subscriber_list";

/// Subscription storage over a single SQLite file
#[derive(Debug, Clone)]
pub struct SqliteSubscriptionStorage {
    source: ConnectionSource,
    reject_name_collisions: bool,
}

impl SqliteSubscriptionStorage {
    pub fn new(source: ConnectionSource, reject_name_collisions: bool) -> Self {
        Self {
            source,
            reject_name_collisions,
        }
    }

    fn register_in(&self, conn: &mut Connection, topic: &str, address: &str) -> Result<()> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(from_rusqlite)?;
        let partition = Partition::open(&tx, PartitionKind::Topic, topic)?;
        partition.register(topic, self.reject_name_collisions)?;

        let id = Uuid::now_v7().to_string();
        let body = serde_json::to_value(Subscriber {
            address: address.to_string(),
        })
        .map_err(|e| serialization_error(&id, e))?;
        partition.insert(&Document { id, body })?;

        tx.commit().map_err(from_rusqlite)
    }

    fn unregister_in(&self, conn: &Connection, topic: &str, address: &str) -> Result<usize> {
        let partition = Partition::open(conn, PartitionKind::Topic, topic)?;
        partition.check_owner(topic, self.reject_name_collisions)?;
        let removed = partition.delete_where("address", &CorrelationValue::from(address))?;
        if removed == 0 {
            return Err(SagaStoreError::SubscriberNotFound {
                topic: topic.to_string(),
                address: address.to_string(),
            }
            .into());
        }
        Ok(removed)
    }

    fn list_in(&self, conn: &Connection, topic: &str) -> Result<Vec<String>> {
        let partition = Partition::open(conn, PartitionKind::Topic, topic)?;
        partition
            .find_all()?
            .into_iter()
            .map(|doc| {
                serde_json::from_value::<Subscriber>(doc.body)
                    .map(|s| s.address)
                    .map_err(|e| serialization_error(&doc.id, e))
            })
            .collect()
    }
}

impl SubscriptionStorage for SqliteSubscriptionStorage {
    fn is_centralized(&self) -> bool {
        true
    }

    fn register_subscriber(&self, topic: &str, address: &str) -> Result<()> {
        let start = Instant::now();
        log_op_start!(OP_REGISTER, topic = topic, address = address);

        let result = require_non_empty("topic", topic)
            .and_then(|()| require_non_empty("address", address))
            .and_then(|()| {
                self.source
                    .with_connection(|conn| self.register_in(conn, topic, address))
            });

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => {
                log_op_end!(OP_REGISTER, duration_ms = duration_ms, topic = topic);
            }
            Err(e) => {
                log_op_error!(OP_REGISTER, e.clone(), duration_ms = duration_ms, topic = topic);
            }
        }
        result
    }

    fn unregister_subscriber(&self, topic: &str, address: &str) -> Result<()> {
        let start = Instant::now();
        log_op_start!(OP_UNREGISTER, topic = topic, address = address);

        let result = require_non_empty("topic", topic)
            .and_then(|()| require_non_empty("address", address))
            .and_then(|()| {
                self.source
                    .with_connection(|conn| self.unregister_in(conn, topic, address))
            });

        let duration_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(removed) => {
                log_op_end!(
                    OP_UNREGISTER,
                    duration_ms = duration_ms,
                    topic = topic,
                    removed = removed as u64
                );
                Ok(())
            }
            Err(e) => {
                log_op_error!(OP_UNREGISTER, e.clone(), duration_ms = duration_ms, topic = topic);
                Err(e)
            }
        }
    }

    fn get_subscriber_addresses(&self, topic: &str) -> Result<Vec<String>> {
        let start = Instant::now();
        log_op_start!(OP_LIST, topic = topic);

        let result = require_non_empty("topic", topic)
            .and_then(|()| self.source.with_connection(|conn| self.list_in(conn, topic)));

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(addresses) => {
                log_op_end!(
                    OP_LIST,
                    duration_ms = duration_ms,
                    topic = topic,
                    match_count = addresses.len() as u64
                );
            }
            Err(e) => {
                log_op_error!(OP_LIST, e.clone(), duration_ms = duration_ms, topic = topic);
            }
        }
        result
    }
}
