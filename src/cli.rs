// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::StatusStorageMode;

/// Command-line arguments for `scrolld`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "scrolld",
    version,
    about = "Boot and supervise interdependent commands from a manifest.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the manifest (TOML).
    #[arg(long, value_name = "PATH", default_value = "scroll.toml")]
    pub manifest: String,

    /// Path to the JSON status file.
    ///
    /// Default: `scroll-lock.json` next to the manifest.
    #[arg(long, value_name = "PATH")]
    pub status_file: Option<String>,

    /// Accept a status file written for another manifest name/version.
    #[arg(long)]
    pub ignore_version: bool,

    /// Keep statuses in memory only; nothing is written to disk.
    #[arg(long)]
    pub no_persist: bool,

    /// Exit once every queued command has finished instead of supervising
    /// until Ctrl-C.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SCROLLD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the commands, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Commands to enqueue at boot. Defaults to the manifest's `init`.
    #[arg(value_name = "COMMAND")]
    pub commands: Vec<String>,
}

impl CliArgs {
    pub fn storage_mode(&self) -> StatusStorageMode {
        if self.no_persist {
            StatusStorageMode::Memory
        } else {
            StatusStorageMode::File
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
