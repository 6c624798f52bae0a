// src/manifest/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::RunPolicy;

/// Manifest as read from a TOML file, before validation.
///
/// ```toml
/// name = "minecraft"
/// version = "1.2.0"
/// init = "start"
///
/// [commands.install]
/// run = "once"
///
/// [[commands.install.procedures]]
/// mode = "exec"
/// data = ["touch", "install.txt"]
///
/// [commands.start]
/// run = "restart"
/// needs = ["install"]
///
/// [[commands.start.procedures]]
/// mode = "exec"
/// data = "sleep 1"
/// ```
///
/// `wait` and `data` are kept as untyped TOML values here; validation turns
/// them into [`WaitSpec`](super::WaitSpec) and
/// [`ProcedureData`](super::ProcedureData).
#[derive(Debug, Clone, Deserialize)]
pub struct RawManifest {
    /// Manifest name, recorded in the status file for drift detection.
    pub name: String,

    /// Optional manifest version, recorded alongside the name.
    #[serde(default)]
    pub version: Option<String>,

    /// Command enqueued at boot when no command is named on the CLI.
    #[serde(default)]
    pub init: Option<String>,

    /// All commands from `[commands.<name>]`.
    #[serde(default)]
    pub commands: BTreeMap<String, RawCommand>,
}

/// `[commands.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCommand {
    /// `"always"` (default), `"once"` or `"restart"`.
    #[serde(default)]
    pub run: RunPolicy,

    /// Commands that must be `done` before this one launches.
    #[serde(default)]
    pub needs: Vec<String>,

    #[serde(default)]
    pub procedures: Vec<RawProcedure>,
}

/// `[[commands.<name>.procedures]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawProcedure {
    pub mode: String,

    #[serde(default)]
    pub data: Option<toml::Value>,

    /// Absent, `true`/`false`, or a number of seconds to delay.
    #[serde(default)]
    pub wait: Option<toml::Value>,

    /// Explicit status key; defaults to `<command>.<index>`.
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub ignore_failure: bool,
}
