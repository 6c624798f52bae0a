// src/status/mod.rs

//! Durable command statuses.
//!
//! - [`record`] is the JSON document and manifest drift check.
//! - [`store`] provides the `StatusStore` trait with a file-backed and an
//!   in-memory implementation.

pub mod record;
pub mod store;

pub use record::{ManifestFingerprint, StatusRecord};
pub use store::{
    FileStatusStore, MemoryStatusStore, STATUS_FILE_NAME, StatusStore, read_record,
};
