// src/dag/queue_step.rs

//! Result types produced by the pure command queue.

use std::sync::Arc;

use crate::engine::CommandName;
use crate::manifest::CommandSpec;
use crate::types::CommandStatus;

/// A status transition the shell should mirror into the status store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusWrite {
    pub name: CommandName,
    pub status: CommandStatus,
}

impl StatusWrite {
    pub fn new(name: impl Into<CommandName>, status: CommandStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// A command the queue has just moved to `Running`.
#[derive(Debug, Clone)]
pub struct Launch {
    pub name: CommandName,
    pub spec: Arc<CommandSpec>,
}

/// Structured result of a single scan pass.
#[derive(Debug, Clone, Default)]
pub struct ScanStep {
    /// Commands that became eligible and are now `Running`.
    pub launches: Vec<Launch>,
    /// Dependencies enqueued lazily during this pass; they are considered
    /// on the next pass.
    pub discovered: Vec<CommandName>,
    /// Status transitions to persist, in order.
    pub writes: Vec<StatusWrite>,
}

impl ScanStep {
    pub fn launched_names(&self) -> Vec<&str> {
        self.launches.iter().map(|l| l.name.as_str()).collect()
    }
}
