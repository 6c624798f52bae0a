// src/status/store.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::status::record::{ManifestFingerprint, StatusRecord};
use crate::types::CommandStatus;

/// Default file name of the status file, next to the manifest.
pub const STATUS_FILE_NAME: &str = "scroll-lock.json";

/// Durable store for command statuses.
pub trait StatusStore: Send {
    /// Current record (loaded at open time, updated by `set_status`).
    fn read(&self) -> &StatusRecord;

    /// Update `name` and rewrite the whole record.
    fn set_status(&mut self, name: &str, status: CommandStatus) -> Result<()>;

    /// Persist the current record. Idempotent.
    fn write(&mut self) -> Result<()>;
}

/// Read a status file, returning a fresh record if it does not exist.
pub fn read_record(path: &Path) -> Result<StatusRecord> {
    if !path.exists() {
        debug!(path = ?path, "no status file yet; starting from an empty record");
        return Ok(StatusRecord::default());
    }
    let data = fs::read_to_string(path)?;
    let record: StatusRecord = serde_json::from_str(&data)?;
    Ok(record)
}

/// Stores statuses in a JSON file, rewritten wholesale on every change.
#[derive(Debug)]
pub struct FileStatusStore {
    path: PathBuf,
    record: StatusRecord,
    fingerprint: ManifestFingerprint,
}

impl FileStatusStore {
    /// Open the status file at `path` for the manifest `fingerprint`.
    ///
    /// A status file written for another manifest name/version is rejected
    /// unless `ignore_version` is set, in which case the statuses are kept and
    /// the fingerprint is replaced on the next write.
    pub fn open(
        path: impl Into<PathBuf>,
        fingerprint: ManifestFingerprint,
        ignore_version: bool,
    ) -> Result<Self> {
        let path = path.into();
        let mut record = read_record(&path)?;

        if let Err(err) = record.check(&fingerprint) {
            if !ignore_version {
                return Err(err);
            }
            warn!(path = ?path, error = %err, "ignoring manifest mismatch in status file");
            record.overwrite_fingerprint(&fingerprint);
        }

        info!(
            path = ?path,
            commands = record.statuses.len(),
            "opened status file"
        );

        Ok(Self {
            path,
            record,
            fingerprint,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatusStore for FileStatusStore {
    fn read(&self) -> &StatusRecord {
        &self.record
    }

    fn set_status(&mut self, name: &str, status: CommandStatus) -> Result<()> {
        self.record.statuses.insert(name.to_string(), status);
        self.write()
    }

    fn write(&mut self) -> Result<()> {
        self.record.capture(&self.fingerprint);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&self.record)?;
        fs::write(&self.path, json)?;
        debug!(path = ?self.path, "status file written");
        Ok(())
    }
}

/// Keeps statuses in memory only (lost on restart).
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    record: StatusRecord,
    fingerprint: Option<ManifestFingerprint>,
}

impl MemoryStatusStore {
    pub fn new(fingerprint: ManifestFingerprint) -> Self {
        Self {
            record: StatusRecord::default(),
            fingerprint: Some(fingerprint),
        }
    }

    /// Start from an existing record, e.g. to simulate a daemon restart.
    pub fn with_record(record: StatusRecord) -> Self {
        Self {
            record,
            fingerprint: None,
        }
    }
}

impl StatusStore for MemoryStatusStore {
    fn read(&self) -> &StatusRecord {
        &self.record
    }

    fn set_status(&mut self, name: &str, status: CommandStatus) -> Result<()> {
        self.record.statuses.insert(name.to_string(), status);
        self.write()
    }

    fn write(&mut self) -> Result<()> {
        if let Some(fingerprint) = &self.fingerprint {
            self.record.capture(fingerprint);
        }
        Ok(())
    }
}
