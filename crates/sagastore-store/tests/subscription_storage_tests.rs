// Integration tests for the SQLite subscription registry

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sagastore_core::{ExErrorKind, SubscriptionStorage};
use sagastore_store::{
    list_partitions, store_subscriptions_in_sqlite, PartitionKind, SqliteSubscriptionStorage,
    StoreConfig,
};
use std::path::PathBuf;
use tempfile::TempDir;

fn setup() -> (TempDir, PathBuf, SqliteSubscriptionStorage) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("subscriptions.db");
    let storage = store_subscriptions_in_sqlite(&path).unwrap();
    (dir, path, storage)
}

#[test]
fn test_register_list_unregister_cycle() {
    // Given: A subscriber registered for a topic
    let (_dir, _path, storage) = setup();
    storage
        .register_subscriber("Orders.OrderPlaced", "billing@host")
        .unwrap();

    // Then: It is listed
    assert_eq!(
        storage.get_subscriber_addresses("Orders.OrderPlaced").unwrap(),
        vec!["billing@host".to_string()]
    );

    // When: It is unregistered
    storage
        .unregister_subscriber("Orders.OrderPlaced", "billing@host")
        .unwrap();

    // Then: It is gone and a second unregister fails
    assert!(storage
        .get_subscriber_addresses("Orders.OrderPlaced")
        .unwrap()
        .is_empty());
    let err = storage
        .unregister_subscriber("Orders.OrderPlaced", "billing@host")
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert!(err.message().contains("billing@host"));
}

#[test]
fn test_duplicates_are_kept_in_insertion_order() {
    let (_dir, _path, storage) = setup();
    storage.register_subscriber("t", "b").unwrap();
    storage.register_subscriber("t", "a").unwrap();
    storage.register_subscriber("t", "b").unwrap();

    assert_eq!(
        storage.get_subscriber_addresses("t").unwrap(),
        vec!["b".to_string(), "a".to_string(), "b".to_string()]
    );

    // Unregister removes every entry for the address
    storage.unregister_subscriber("t", "b").unwrap();
    assert_eq!(
        storage.get_subscriber_addresses("t").unwrap(),
        vec!["a".to_string()]
    );
}

#[test]
fn test_topics_are_isolated() {
    let (_dir, _path, storage) = setup();
    storage.register_subscriber("first", "x").unwrap();

    assert!(storage.get_subscriber_addresses("second").unwrap().is_empty());
    let err = storage.unregister_subscriber("second", "x").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_topics_sanitizing_alike_collide_when_detection_on() {
    // Given: A subscriber for "a.b" (partition "ab")
    let (_dir, path, storage) = setup();
    storage.register_subscriber("a.b", "one").unwrap();

    // When: Another topic maps to the same partition
    let err = storage.register_subscriber("a-b", "two").unwrap_err();

    // Then: It is refused and nothing was written
    assert_eq!(err.kind(), ExErrorKind::PartitionCollision);
    assert_eq!(err.partition(), Some("ab"));
    assert_eq!(
        storage.get_subscriber_addresses("a.b").unwrap(),
        vec!["one".to_string()]
    );

    // When: Detection is off
    let mut config = StoreConfig::new(&path).unwrap();
    config.reject_name_collisions = false;
    let shared = config.subscription_storage();
    shared.register_subscriber("a-b", "two").unwrap();

    // Then: Both topics read the same partition
    assert_eq!(
        shared.get_subscriber_addresses("a.b").unwrap(),
        vec!["one".to_string(), "two".to_string()]
    );
}

#[test]
fn test_unregister_under_colliding_topic_is_refused() {
    // Given: A subscriber for "a.b" (partition "ab")
    let (_dir, path, storage) = setup();
    storage.register_subscriber("a.b", "one").unwrap();

    // When: It is unregistered through a topic that sanitizes alike
    let err = storage.unregister_subscriber("ab", "one").unwrap_err();

    // Then: It is refused and the subscriber is still listed
    assert_eq!(err.kind(), ExErrorKind::PartitionCollision);
    assert_eq!(
        storage.get_subscriber_addresses("a.b").unwrap(),
        vec!["one".to_string()]
    );

    // When: Detection is off, the shared partition can be cleared
    let mut config = StoreConfig::new(&path).unwrap();
    config.reject_name_collisions = false;
    config
        .subscription_storage()
        .unregister_subscriber("ab", "one")
        .unwrap();
    assert!(storage.get_subscriber_addresses("a.b").unwrap().is_empty());
}

#[test]
fn test_unregister_on_unclaimed_topic_is_not_found() {
    let (_dir, _path, storage) = setup();
    let err = storage.unregister_subscriber("never.used", "x").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_catalog_lists_topic_partitions() {
    let (_dir, path, storage) = setup();
    storage.register_subscriber("zeta", "1").unwrap();
    storage.register_subscriber("alpha.topic", "1").unwrap();
    storage.register_subscriber("alpha.topic", "2").unwrap();

    let conn = rusqlite::Connection::open(&path).unwrap();
    let catalog = list_partitions(&conn).unwrap();

    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog[0].kind, PartitionKind::Topic);
    assert_eq!(catalog[0].name, "alphatopic");
    assert_eq!(catalog[0].source_name, "alpha.topic");
    assert_eq!(catalog[0].documents, 2);
    assert_eq!(catalog[1].name, "zeta");
    assert_eq!(catalog[1].documents, 1);
}

#[test]
fn test_topic_without_usable_characters_is_rejected() {
    let (_dir, _path, storage) = setup();
    let err = storage.register_subscriber("...", "x").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
}
