// src/dag/mod.rs

//! Pure command queue and dependency scheduling.
//!
//! - [`queue`] holds the `CommandQueue` state machine: enqueue validation,
//!   scan passes, completion transitions and restore from the status file.
//! - [`queue_step`] defines the result types a scan or completion produces.
//! - [`closure`] answers read-only questions about transitive `needs`.

pub mod closure;
pub mod queue;
pub mod queue_step;

pub use queue::{CommandQueue, QueueEntry};
pub use queue_step::{Launch, ScanStep, StatusWrite};
