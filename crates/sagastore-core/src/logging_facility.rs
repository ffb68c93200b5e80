//! Structured logging facility for SagaStore
//!
//! - Single initialization point via `init(profile)`
//! - Lifecycle macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use sagastore_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! Storage engines own the lifecycle events of their public operations.
//! The partition layer below them only emits `tracing::debug!`.

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
