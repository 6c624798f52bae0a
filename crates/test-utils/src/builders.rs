#![allow(dead_code)]

use std::collections::BTreeMap;

use scrolld::manifest::{Manifest, RawCommand, RawManifest, RawProcedure};
use scrolld::types::RunPolicy;

/// Builder for `Manifest` to simplify test setup.
pub struct ManifestBuilder {
    manifest: RawManifest,
}

impl ManifestBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            manifest: RawManifest {
                name: name.to_string(),
                version: None,
                init: None,
                commands: BTreeMap::new(),
            },
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.manifest.version = Some(version.to_string());
        self
    }

    pub fn init(mut self, command: &str) -> Self {
        self.manifest.init = Some(command.to_string());
        self
    }

    pub fn with_command(mut self, name: &str, command: RawCommand) -> Self {
        self.manifest.commands.insert(name.to_string(), command);
        self
    }

    /// The raw model, for tests exercising validation errors.
    pub fn build_raw(self) -> RawManifest {
        self.manifest
    }

    pub fn build(self) -> Manifest {
        Manifest::try_from(self.manifest).expect("Failed to build valid manifest from builder")
    }
}

/// Builder for `RawCommand`.
pub struct CommandBuilder {
    command: RawCommand,
}

impl CommandBuilder {
    pub fn new() -> Self {
        Self {
            command: RawCommand::default(),
        }
    }

    pub fn run(mut self, policy: RunPolicy) -> Self {
        self.command.run = policy;
        self
    }

    pub fn once(self) -> Self {
        self.run(RunPolicy::Once)
    }

    pub fn restart(self) -> Self {
        self.run(RunPolicy::Restart)
    }

    pub fn needs(mut self, dep: &str) -> Self {
        self.command.needs.push(dep.to_string());
        self
    }

    pub fn procedure(mut self, procedure: ProcedureBuilder) -> Self {
        self.command.procedures.push(procedure.build());
        self
    }

    /// Shorthand for an `exec` procedure with the given argv.
    pub fn exec(self, argv: &[&str]) -> Self {
        self.procedure(ProcedureBuilder::exec(argv))
    }

    /// Shorthand for an `exec` procedure running `line` through `sh -c`.
    pub fn shell(self, line: &str) -> Self {
        self.procedure(ProcedureBuilder::shell(line))
    }

    pub fn build(self) -> RawCommand {
        self.command
    }
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RawProcedure`.
pub struct ProcedureBuilder {
    procedure: RawProcedure,
}

impl ProcedureBuilder {
    pub fn new(mode: &str, data: Option<toml::Value>) -> Self {
        Self {
            procedure: RawProcedure {
                mode: mode.to_string(),
                data,
                wait: None,
                id: None,
                ignore_failure: false,
            },
        }
    }

    pub fn exec(argv: &[&str]) -> Self {
        Self::new("exec", Some(string_array(argv)))
    }

    pub fn exec_tty(argv: &[&str]) -> Self {
        Self::new("exec-tty", Some(string_array(argv)))
    }

    pub fn shell(line: &str) -> Self {
        Self::new("exec", Some(toml::Value::String(line.to_string())))
    }

    pub fn stdin(target: &str, input: &str) -> Self {
        Self::new("stdin", Some(string_array(&[target, input])))
    }

    pub fn command(target: &str) -> Self {
        Self::new("command", Some(toml::Value::String(target.to_string())))
    }

    pub fn plugin(name: &str, payload: &str) -> Self {
        Self::new(
            &format!("plugin:{name}"),
            Some(toml::Value::String(payload.to_string())),
        )
    }

    pub fn id(mut self, id: &str) -> Self {
        self.procedure.id = Some(id.to_string());
        self
    }

    pub fn wait(mut self, wait: bool) -> Self {
        self.procedure.wait = Some(toml::Value::Boolean(wait));
        self
    }

    pub fn wait_secs(mut self, secs: i64) -> Self {
        self.procedure.wait = Some(toml::Value::Integer(secs));
        self
    }

    pub fn ignore_failure(mut self) -> Self {
        self.procedure.ignore_failure = true;
        self
    }

    pub fn build(self) -> RawProcedure {
        self.procedure
    }
}

fn string_array(items: &[&str]) -> toml::Value {
    toml::Value::Array(
        items
            .iter()
            .map(|s| toml::Value::String(s.to_string()))
            .collect(),
    )
}
