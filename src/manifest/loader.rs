// src/manifest/loader.rs

use std::fs;
use std::path::Path;

use crate::errors::Result;
use crate::manifest::model::RawManifest;
use crate::manifest::spec::Manifest;

/// Load a manifest file and return the raw, unvalidated `RawManifest`.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] to get
/// a [`Manifest`] the scheduler can use.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawManifest> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let raw: RawManifest = toml::from_str(&contents)?;

    Ok(raw)
}

/// Load a manifest from path and validate it.
///
/// - Reads TOML.
/// - Checks for unknown `needs` / `init` / delegation targets and cycles.
/// - Resolves `wait` and `data` into typed values, rejecting bad shapes.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Manifest> {
    let raw = load_from_path(&path)?;
    Manifest::try_from(raw)
}
