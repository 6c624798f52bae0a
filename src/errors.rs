// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrollError {
    #[error("Manifest error: {0}")]
    ManifestError(String),

    #[error("Cycle detected in command graph: {0}")]
    DependencyCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command already queued: {0}")]
    AlreadyQueued(String),

    #[error("Command already completed once: {0}")]
    AlreadyCompletedOnce(String),

    #[error("No running process named '{0}'")]
    ProcessNotFound(String),

    #[error("Unsupported procedure mode: {0}")]
    UnsupportedMode(String),

    #[error("Procedure '{mode}' failed with exit code {exit_code}")]
    ProcedureFailed { mode: String, exit_code: i32 },

    #[error("Process '{0}' was terminated")]
    Terminated(String),

    #[error(
        "Status file belongs to manifest {recorded}, current manifest is {current} (use --ignore-version to override)"
    )]
    ManifestMismatch { recorded: String, current: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ScrollError>;
