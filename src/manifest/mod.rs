// src/manifest/mod.rs

//! Manifest loading and validation.
//!
//! - [`model`] is the TOML-backed raw data model.
//! - [`spec`] holds the validated command/procedure types and the
//!   [`CommandLookup`] trait the scheduler consumes.
//! - [`validate`] turns a raw manifest into a [`Manifest`].
//! - [`loader`] reads manifests from disk.

pub mod loader;
pub mod model;
pub mod spec;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{RawCommand, RawManifest, RawProcedure};
pub use spec::{
    CommandLookup, CommandSpec, Manifest, ProcedureData, ProcedureMode, ProcedureSpec, WaitSpec,
};
