// Lifecycle logging emitted by the storage engines

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sagastore_core::logging_facility::test_capture::init_test_capture;
use sagastore_core::{
    CorrelationValue, ExErrorKind, ResolvedCorrelation, SagaEnvelope, SagaStorage,
    SubscriptionStorage,
};
use sagastore_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};
use sagastore_store::{store_sagas_in_sqlite, store_subscriptions_in_sqlite};
use tempfile::TempDir;
use uuid::Uuid;

fn envelope() -> SagaEnvelope {
    SagaEnvelope {
        saga_type: "Logging.AuditSaga".to_string(),
        id: Uuid::now_v7(),
        revision: 0,
        data: serde_json::json!({"ticket": 1}),
    }
}

#[test]
fn test_insert_emits_start_and_end() {
    let capture = init_test_capture();
    let dir = TempDir::new().unwrap();
    let storage = store_sagas_in_sqlite(dir.path().join("s.db")).unwrap();

    let mut saga = envelope();
    storage.insert(&mut saga, &[]).unwrap();

    let id = saga.id.to_string();
    let events = capture.events_for("saga_insert", "saga_id", &id);
    assert_eq!(events.len(), 2);
    assert!(events[0].is(EVENT_START));
    assert_eq!(events[0].field("saga_type"), Some("Logging.AuditSaga"));
    assert!(events[1].is(EVENT_END));
    assert!(events[1].field("duration_ms").is_some());
}

#[test]
fn test_failed_update_emits_end_error_with_code() {
    let capture = init_test_capture();
    let dir = TempDir::new().unwrap();
    let storage = store_sagas_in_sqlite(dir.path().join("s.db")).unwrap();

    let mut saga = envelope();
    let err = storage.update(&mut saga, &[]).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Concurrency);

    let id = saga.id.to_string();
    let errors = capture.lifecycle_events("saga_update", "saga_id", &id, EVENT_END_ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("err_code"), Some("ERR_CONCURRENCY"));
    assert_eq!(errors[0].field("err_kind"), Some("Concurrency"));
}

#[test]
fn test_collision_is_logged_as_error() {
    let capture = init_test_capture();
    let dir = TempDir::new().unwrap();
    let storage = store_sagas_in_sqlite(dir.path().join("s.db")).unwrap();
    let correlations = [ResolvedCorrelation::new("ticket", 1)];

    let mut first = envelope();
    storage.insert(&mut first, &correlations).unwrap();
    let mut second = envelope();
    storage.insert(&mut second, &correlations).unwrap_err();

    let id = second.id.to_string();
    let errors = capture.lifecycle_events("saga_insert", "saga_id", &id, EVENT_END_ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("err_code"), Some("ERR_CORRELATION_COLLISION"));
}

#[test]
fn test_find_reports_match_count() {
    let capture = init_test_capture();
    let dir = TempDir::new().unwrap();
    let storage = store_sagas_in_sqlite(dir.path().join("s.db")).unwrap();
    let saga_type = "Logging.FindCountSaga";

    storage
        .find(saga_type, "ticket", &CorrelationValue::Integer(5))
        .unwrap();

    let ends = capture.lifecycle_events("saga_find", "saga_type", saga_type, EVENT_END);
    assert_eq!(ends.len(), 1);
    assert_eq!(ends[0].field("match_count"), Some("0"));
}

#[test]
fn test_subscription_operations_are_logged() {
    let capture = init_test_capture();
    let dir = TempDir::new().unwrap();
    let storage = store_subscriptions_in_sqlite(dir.path().join("s.db")).unwrap();
    let topic = "Logging.UniqueTopicForLifecycle";

    storage.register_subscriber(topic, "a").unwrap();
    storage.get_subscriber_addresses(topic).unwrap();
    storage.unregister_subscriber(topic, "a").unwrap();
    storage.unregister_subscriber(topic, "a").unwrap_err();

    for op in ["subscriber_register", "subscriber_list", "subscriber_unregister"] {
        let events = capture.events_for(op, "topic", topic);
        assert!(
            events.iter().any(|e| e.is(EVENT_START)),
            "missing start for {}",
            op
        );
        assert!(
            events.iter().any(|e| e.is(EVENT_END)),
            "missing end for {}",
            op
        );
    }

    let not_found =
        capture.lifecycle_events("subscriber_unregister", "topic", topic, EVENT_END_ERROR);
    assert_eq!(not_found.len(), 1);
}
