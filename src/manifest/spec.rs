// src/manifest/spec.rs

//! Validated, immutable command specifications.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{Result, ScrollError};
use crate::status::ManifestFingerprint;
use crate::types::RunPolicy;

/// How the executor waits for a procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitSpec {
    /// Run synchronously (the default).
    #[default]
    None,
    /// `true` behaves like `None`; `false` runs detached.
    Immediate(bool),
    /// Run detached after the given number of seconds.
    Delayed(u64),
}

impl WaitSpec {
    /// Whether the executor blocks on this procedure before moving on.
    pub fn is_blocking(self) -> bool {
        matches!(self, WaitSpec::None | WaitSpec::Immediate(true))
    }
}

/// Procedure mode tag, parsed from the manifest's `mode` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcedureMode {
    Exec,
    ExecTty,
    Stdin,
    /// `plugin:<name>`; holds `<name>`.
    Plugin(String),
    /// Delegate to another command (`command` or `sub-command`).
    Command,
    /// Anything else. Fails with `UnsupportedMode` when dispatched.
    Unsupported(String),
}

impl ProcedureMode {
    pub fn parse(mode: &str) -> Self {
        match mode.trim() {
            "exec" => ProcedureMode::Exec,
            "exec-tty" => ProcedureMode::ExecTty,
            "stdin" => ProcedureMode::Stdin,
            "command" | "sub-command" => ProcedureMode::Command,
            other => match other.strip_prefix("plugin:") {
                Some(name) if !name.is_empty() => ProcedureMode::Plugin(name.to_string()),
                _ => ProcedureMode::Unsupported(other.to_string()),
            },
        }
    }
}

impl fmt::Display for ProcedureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcedureMode::Exec => f.write_str("exec"),
            ProcedureMode::ExecTty => f.write_str("exec-tty"),
            ProcedureMode::Stdin => f.write_str("stdin"),
            ProcedureMode::Plugin(name) => write!(f, "plugin:{name}"),
            ProcedureMode::Command => f.write_str("command"),
            ProcedureMode::Unsupported(mode) => f.write_str(mode),
        }
    }
}

/// Mode-dependent payload of a procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcedureData {
    /// Program and arguments for `exec` / `exec-tty`.
    Argv(Vec<String>),
    /// `stdin`: the process id to write to and the input.
    Stdin { target: String, input: String },
    /// `plugin:<name>` payload.
    Payload(String),
    /// Target of a `command` delegation.
    Command(String),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureSpec {
    /// Status key; either the manifest `id` or `<command>.<index>`.
    pub id: String,
    pub mode: ProcedureMode,
    pub data: ProcedureData,
    pub wait: WaitSpec,
    pub ignore_failure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: String,
    pub run: RunPolicy,
    pub needs: Vec<String>,
    pub procedures: Vec<ProcedureSpec>,
}

/// Manifest accessor used by the scheduler.
pub trait CommandLookup: Send + Sync {
    /// Fails with [`ScrollError::CommandNotFound`] for unknown names.
    fn lookup(&self, name: &str) -> Result<Arc<CommandSpec>>;
}

/// Validated manifest. Build it with `Manifest::try_from(RawManifest)`.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub name: String,
    pub version: Option<String>,
    pub init: Option<String>,
    pub commands: BTreeMap<String, Arc<CommandSpec>>,
}

impl Manifest {
    /// Only for use after validation; see `validate.rs`.
    pub(crate) fn new_unchecked(
        name: String,
        version: Option<String>,
        init: Option<String>,
        commands: BTreeMap<String, Arc<CommandSpec>>,
    ) -> Self {
        Self {
            name,
            version,
            init,
            commands,
        }
    }

    pub fn fingerprint(&self) -> ManifestFingerprint {
        ManifestFingerprint {
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }

    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(|s| s.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CommandSpec>> {
        self.commands.get(name)
    }
}

impl CommandLookup for Manifest {
    fn lookup(&self, name: &str) -> Result<Arc<CommandSpec>> {
        self.commands
            .get(name)
            .cloned()
            .ok_or_else(|| ScrollError::CommandNotFound(name.to_string()))
    }
}
