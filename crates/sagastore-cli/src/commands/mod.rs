pub mod partitions;
pub mod sagas;
pub mod topics;
