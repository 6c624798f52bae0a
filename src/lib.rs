// src/lib.rs

pub mod cli;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod manifest;
pub mod status;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::engine::Scheduler;
use crate::errors::ScrollError;
use crate::exec::{ProcedureExecutor, TokioProcessRunner};
use crate::manifest::{Manifest, ProcedureData, WaitSpec, load_and_validate};
use crate::status::{FileStatusStore, MemoryStatusStore, STATUS_FILE_NAME, StatusStore};
use crate::types::{CommandStatus, StatusStorageMode};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - manifest loading
/// - the status store (with manifest drift check)
/// - process runner / procedure executor
/// - the scheduler and its work loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let manifest_path = PathBuf::from(&args.manifest);
    let manifest = Arc::new(load_and_validate(&manifest_path)?);

    if args.dry_run {
        print_dry_run(&manifest);
        return Ok(());
    }

    let root_dir = manifest_root_dir(&manifest_path);
    let store = open_store(&args, &manifest, &root_dir)?;

    let runner = Arc::new(TokioProcessRunner::new().with_working_dir(&root_dir));
    let executor = ProcedureExecutor::without_plugins(runner.clone());
    let scheduler = Scheduler::start(manifest.clone(), executor, store);

    let requested = requested_commands(&args, &manifest);
    if requested.is_empty() {
        warn!("no command named on the command line and no `init` in the manifest");
    }
    info!(?requested, "commands to enqueue at boot");

    for name in &requested {
        match scheduler.enqueue(name, true) {
            Ok(()) => {}
            Err(ScrollError::AlreadyCompletedOnce(_)) => {
                info!(command = %name, "already completed once; skipping");
            }
            Err(ScrollError::AlreadyQueued(_)) => {
                debug!(command = %name, "already queued (resumed from status file)");
            }
            Err(e) => return Err(e.into()),
        }
    }

    if args.once {
        tokio::select! {
            _ = scheduler.drain_all() => info!("all commands finished"),
            res = tokio::signal::ctrl_c() => log_ctrl_c(res),
        }
    } else {
        log_ctrl_c(tokio::signal::ctrl_c().await);
    }

    scheduler.shutdown();
    scheduler.join().await;

    let stopped = runner.stop_all();
    if stopped > 0 {
        info!(stopped, "stopped running processes");
    }

    let snapshot = scheduler.snapshot();
    for (name, status) in snapshot.iter() {
        info!(
            command = %name,
            status = %status,
            launches = scheduler.launch_count(name),
            "final command status"
        );
    }

    if args.once {
        let failed: Vec<&String> = snapshot
            .iter()
            .filter(|(_, status)| **status == CommandStatus::Error)
            .map(|(name, _)| name)
            .collect();
        if !failed.is_empty() {
            bail!("commands failed: {failed:?}");
        }
    }

    Ok(())
}

fn log_ctrl_c(res: std::io::Result<()>) {
    match res {
        Ok(()) => info!("Ctrl-C received; shutting down"),
        Err(e) => warn!(error = %e, "failed to listen for Ctrl-C; shutting down"),
    }
}

/// Directory commands run in and the default status file lives in.
///
/// - If the manifest path has a non-empty parent (e.g. "servers/scroll.toml"),
///   we use that directory.
/// - For a bare filename like "scroll.toml" we use the current directory.
fn manifest_root_dir(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn open_store(args: &CliArgs, manifest: &Manifest, root_dir: &Path) -> Result<Box<dyn StatusStore>> {
    let store: Box<dyn StatusStore> = match args.storage_mode() {
        StatusStorageMode::Memory => Box::new(MemoryStatusStore::new(manifest.fingerprint())),
        StatusStorageMode::File => {
            let path = args
                .status_file
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| root_dir.join(STATUS_FILE_NAME));
            Box::new(FileStatusStore::open(
                path,
                manifest.fingerprint(),
                args.ignore_version,
            )?)
        }
    };
    Ok(store)
}

/// Commands named on the CLI, else the manifest's `init` command.
fn requested_commands(args: &CliArgs, manifest: &Manifest) -> Vec<String> {
    if !args.commands.is_empty() {
        return args.commands.clone();
    }
    manifest.init.iter().cloned().collect()
}

/// Simple dry-run output: print commands, policies, needs and procedures.
fn print_dry_run(manifest: &Manifest) {
    println!("scrolld dry-run");
    println!("  name = {}", manifest.name);
    println!(
        "  version = {}",
        manifest.version.as_deref().unwrap_or("(none)")
    );
    if let Some(init) = &manifest.init {
        println!("  init = {init}");
    }
    println!();

    println!("commands ({}):", manifest.commands.len());
    for (name, spec) in manifest.commands.iter() {
        println!("  - {name}");
        println!("      run: {:?}", spec.run);
        if !spec.needs.is_empty() {
            println!("      needs: {:?}", spec.needs);
        }
        for proc in spec.procedures.iter() {
            let data = match &proc.data {
                ProcedureData::Argv(argv) => format!("{argv:?}"),
                ProcedureData::Stdin { target, input } => format!("{target} <- {input:?}"),
                ProcedureData::Payload(payload) => format!("{payload:?}"),
                ProcedureData::Command(target) => target.clone(),
                ProcedureData::Empty => String::new(),
            };
            let wait = match proc.wait {
                WaitSpec::None => String::new(),
                WaitSpec::Immediate(b) => format!(" wait={b}"),
                WaitSpec::Delayed(secs) => format!(" wait={secs}s"),
            };
            let ignore = if proc.ignore_failure { " ignore_failure" } else { "" };
            println!("      [{}] {} {data}{wait}{ignore}", proc.id, proc.mode);
        }
    }

    debug!("dry-run complete (no execution)");
}
