// src/manifest/validate.rs

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, ScrollError};
use crate::manifest::model::{RawCommand, RawManifest, RawProcedure};
use crate::manifest::spec::{
    CommandSpec, Manifest, ProcedureData, ProcedureMode, ProcedureSpec, WaitSpec,
};

impl TryFrom<RawManifest> for Manifest {
    type Error = ScrollError;

    fn try_from(raw: RawManifest) -> std::result::Result<Self, Self::Error> {
        validate_raw_manifest(&raw)?;

        let mut commands = BTreeMap::new();
        let mut seen_ids = HashSet::new();

        for (name, cmd) in raw.commands.iter() {
            let spec = resolve_command(name, cmd, &raw.commands)?;
            for proc in &spec.procedures {
                if !seen_ids.insert(proc.id.clone()) {
                    return Err(ScrollError::ManifestError(format!(
                        "procedure id '{}' is used more than once",
                        proc.id
                    )));
                }
            }
            commands.insert(name.clone(), Arc::new(spec));
        }

        Ok(Manifest::new_unchecked(
            raw.name,
            raw.version,
            raw.init,
            commands,
        ))
    }
}

fn validate_raw_manifest(raw: &RawManifest) -> Result<()> {
    ensure_has_commands(raw)?;
    validate_header(raw)?;
    validate_needs(raw)?;
    validate_graph(raw)?;
    Ok(())
}

fn ensure_has_commands(raw: &RawManifest) -> Result<()> {
    if raw.commands.is_empty() {
        return Err(ScrollError::ManifestError(
            "manifest must contain at least one [commands.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_header(raw: &RawManifest) -> Result<()> {
    if raw.name.trim().is_empty() {
        return Err(ScrollError::ManifestError(
            "manifest `name` must not be empty".to_string(),
        ));
    }

    if let Some(init) = &raw.init {
        if !raw.commands.contains_key(init) {
            return Err(ScrollError::ManifestError(format!(
                "`init` refers to unknown command '{init}'"
            )));
        }
    }

    Ok(())
}

fn validate_needs(raw: &RawManifest) -> Result<()> {
    for (name, cmd) in raw.commands.iter() {
        for dep in cmd.needs.iter() {
            if dep == name {
                return Err(ScrollError::ManifestError(format!(
                    "command '{name}' cannot depend on itself in `needs`"
                )));
            }
            if !raw.commands.contains_key(dep) {
                return Err(ScrollError::ManifestError(format!(
                    "command '{name}' has unknown dependency '{dep}' in `needs`"
                )));
            }
        }
    }
    Ok(())
}

fn validate_graph(raw: &RawManifest) -> Result<()> {
    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in raw.commands.keys() {
        graph.add_node(name.as_str());
    }

    for (name, cmd) in raw.commands.iter() {
        for dep in cmd.needs.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(ScrollError::DependencyCycle(format!(
            "cycle detected in `needs` involving command '{}'",
            cycle.node_id()
        ))),
    }
}

fn resolve_command(
    name: &str,
    cmd: &RawCommand,
    known: &BTreeMap<String, RawCommand>,
) -> Result<CommandSpec> {
    let procedures = cmd
        .procedures
        .iter()
        .enumerate()
        .map(|(index, raw)| resolve_procedure(name, index, raw, known))
        .collect::<Result<Vec<_>>>()?;

    Ok(CommandSpec {
        name: name.to_string(),
        run: cmd.run,
        needs: cmd.needs.clone(),
        procedures,
    })
}

fn resolve_procedure(
    command: &str,
    index: usize,
    raw: &RawProcedure,
    known: &BTreeMap<String, RawCommand>,
) -> Result<ProcedureSpec> {
    let id = match &raw.id {
        Some(id) if !id.trim().is_empty() => id.clone(),
        Some(_) => {
            return Err(ScrollError::ManifestError(format!(
                "procedure {index} of command '{command}' has an empty `id`"
            )));
        }
        None => format!("{command}.{index}"),
    };

    let mode = ProcedureMode::parse(&raw.mode);
    let wait = parse_wait(&id, raw.wait.as_ref())?;
    let data = parse_data(&id, &mode, raw.data.as_ref())?;

    if let ProcedureData::Command(target) = &data {
        if !known.contains_key(target) {
            return Err(ScrollError::ManifestError(format!(
                "procedure '{id}' delegates to unknown command '{target}'"
            )));
        }
    }

    Ok(ProcedureSpec {
        id,
        mode,
        data,
        wait,
        ignore_failure: raw.ignore_failure,
    })
}

fn parse_wait(id: &str, value: Option<&toml::Value>) -> Result<WaitSpec> {
    match value {
        None => Ok(WaitSpec::None),
        Some(toml::Value::Boolean(b)) => Ok(WaitSpec::Immediate(*b)),
        Some(toml::Value::Integer(secs)) if *secs >= 0 => Ok(WaitSpec::Delayed(*secs as u64)),
        Some(other) => Err(ScrollError::ManifestError(format!(
            "procedure '{id}': `wait` must be a bool or a non-negative number of seconds, got {other}"
        ))),
    }
}

fn parse_data(id: &str, mode: &ProcedureMode, value: Option<&toml::Value>) -> Result<ProcedureData> {
    let shape_error = |expected: &str| {
        ScrollError::ManifestError(format!(
            "procedure '{id}' (mode {mode}): `data` must be {expected}"
        ))
    };

    match mode {
        ProcedureMode::Exec | ProcedureMode::ExecTty => match value {
            Some(toml::Value::String(line)) if !line.trim().is_empty() => Ok(ProcedureData::Argv(
                vec!["sh".to_string(), "-c".to_string(), line.clone()],
            )),
            Some(v) => match string_list(v) {
                Some(argv) if !argv.is_empty() => Ok(ProcedureData::Argv(argv)),
                _ => Err(shape_error("a non-empty argv list or a shell string")),
            },
            None => Err(shape_error("a non-empty argv list or a shell string")),
        },
        ProcedureMode::Stdin => match value.and_then(string_list).as_deref() {
            Some([target, input]) => Ok(ProcedureData::Stdin {
                target: target.clone(),
                input: input.clone(),
            }),
            _ => Err(shape_error("a [process_id, input] pair")),
        },
        ProcedureMode::Plugin(_) => Ok(ProcedureData::Payload(match value {
            None => String::new(),
            Some(toml::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        })),
        ProcedureMode::Command => match value {
            Some(toml::Value::String(target)) => Ok(ProcedureData::Command(target.clone())),
            _ => Err(shape_error("the name of a command")),
        },
        ProcedureMode::Unsupported(_) => Ok(ProcedureData::Empty),
    }
}

fn string_list(value: &toml::Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}
