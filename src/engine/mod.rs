// src/engine/mod.rs

//! Async scheduling engine.
//!
//! The pure queue semantics live in [`crate::dag`]; this module is the IO
//! shell around them:
//! - [`scheduler`] owns the queue behind its locks, runs the work loop,
//!   launches commands through the `ProcedureExecutor` and mirrors status
//!   changes into the `StatusStore`.
//! - [`watchers`] fans the pending set out to `drain_all` / `drain` callers.

/// Canonical command name type used throughout the engine.
pub type CommandName = String;

/// How a launched command ended, as seen by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Succeeded,
    Failed,
}

/// Events that wake the work loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// A command was added to the queue.
    Enqueued(CommandName),
    /// A launch task finished.
    Completed(CommandName),
    /// A drainer registered and wants a fresh pending report.
    Drain,
    /// Exit the loop after the current pass.
    Shutdown,
}

pub mod scheduler;
pub mod watchers;

pub use scheduler::Scheduler;
pub use watchers::DrainWatchers;
