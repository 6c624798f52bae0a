use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a command behaves once it has finished.
///
/// - `Always`: runs every time it is explicitly enqueued (default).
/// - `Once`: runs once per manifest lifetime; success is tracked durably.
/// - `Restart`: never terminal; relaunched after every success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunPolicy {
    #[default]
    Always,
    Once,
    Restart,
}

impl FromStr for RunPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(RunPolicy::Always),
            "once" => Ok(RunPolicy::Once),
            "restart" => Ok(RunPolicy::Restart),
            other => Err(format!(
                "invalid run policy: {other} (expected \"always\", \"once\" or \"restart\")"
            )),
        }
    }
}

/// Status of a queued command, also the value stored in the status file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Waiting,
    Running,
    Done,
    Error,
}

impl CommandStatus {
    /// `Done` and `Error` are terminal, subject to the `Restart` exception
    /// applied by the scheduler.
    pub fn is_terminal(self) -> bool {
        matches!(self, CommandStatus::Done | CommandStatus::Error)
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommandStatus::Waiting => "waiting",
            CommandStatus::Running => "running",
            CommandStatus::Done => "done",
            CommandStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Mode for persisting command statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusStorageMode {
    /// Rewrite a JSON status file on every change.
    File,
    /// Keep statuses in memory only (lost on restart).
    Memory,
}

impl Default for StatusStorageMode {
    fn default() -> Self {
        StatusStorageMode::File
    }
}
