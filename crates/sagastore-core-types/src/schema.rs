//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names identical across the engines, the CLI
//! and the test capture layer.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";

// Entity identifiers
pub const FIELD_SAGA_TYPE: &str = "saga_type";
pub const FIELD_SAGA_ID: &str = "saga_id";
pub const FIELD_REVISION: &str = "revision";
pub const FIELD_PARTITION: &str = "partition";
pub const FIELD_TOPIC: &str = "topic";
pub const FIELD_ADDRESS: &str = "address";

// Collection sizes
pub const FIELD_MATCH_COUNT: &str = "match_count";
pub const FIELD_REMOVED: &str = "removed";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
