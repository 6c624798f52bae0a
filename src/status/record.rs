// src/status/record.rs

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, ScrollError};
use crate::types::CommandStatus;

/// Name and version of the manifest a status file was written for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFingerprint {
    pub name: String,
    pub version: Option<String>,
}

impl fmt::Display for ManifestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "'{}' version {}", self.name, version),
            None => write!(f, "'{}' (unversioned)", self.name),
        }
    }
}

/// On-disk status document.
///
/// ```json
/// {
///   "statuses": { "install": "done", "start": "running" },
///   "scroll_version": "1.2.0",
///   "scroll_name": "minecraft"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    #[serde(default)]
    pub statuses: BTreeMap<String, CommandStatus>,

    #[serde(default)]
    pub scroll_version: Option<String>,

    #[serde(default)]
    pub scroll_name: String,
}

impl StatusRecord {
    /// Whether a manifest fingerprint has been captured yet.
    pub fn is_fingerprinted(&self) -> bool {
        !self.scroll_name.is_empty()
    }

    pub fn fingerprint(&self) -> Option<ManifestFingerprint> {
        self.is_fingerprinted().then(|| ManifestFingerprint {
            name: self.scroll_name.clone(),
            version: self.scroll_version.clone(),
        })
    }

    /// Record `fingerprint` unless one was captured already.
    pub fn capture(&mut self, fingerprint: &ManifestFingerprint) {
        if !self.is_fingerprinted() {
            self.overwrite_fingerprint(fingerprint);
        }
    }

    pub fn overwrite_fingerprint(&mut self, fingerprint: &ManifestFingerprint) {
        self.scroll_name = fingerprint.name.clone();
        self.scroll_version = fingerprint.version.clone();
    }

    /// Fail with `ManifestMismatch` if this record was written for a different
    /// manifest. A fresh record matches anything.
    pub fn check(&self, current: &ManifestFingerprint) -> Result<()> {
        match self.fingerprint() {
            Some(recorded) if &recorded != current => Err(ScrollError::ManifestMismatch {
                recorded: recorded.to_string(),
                current: current.to_string(),
            }),
            _ => Ok(()),
        }
    }

    pub fn status_of(&self, name: &str) -> Option<CommandStatus> {
        self.statuses.get(name).copied()
    }
}
