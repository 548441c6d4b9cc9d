//! Durable storage for the application collection.
//!
//! The on-disk artifact is a pretty-printed JSON array of [`Application`]
//! records. Saves never touch the artifact in place: the full collection is
//! written to a temporary file in the same directory, synced, and renamed over
//! the target so readers observe either the old or the new contents.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::domain::{Application, ApplicationId};

/// Storage abstraction so the lifecycle manager can be exercised in isolation.
pub trait ApplicationGateway: Send + Sync {
    /// Reads the full collection. A missing artifact is an empty collection.
    fn load(&self) -> Result<Vec<Application>, PersistenceError>;

    /// Replaces the stored collection with `records`.
    fn save(&self, records: &[Application]) -> Result<(), PersistenceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("{path} does not contain a valid application list: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode applications: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("{path} is inconsistent: {detail}")]
    Corrupt { path: PathBuf, detail: String },
    /// For gateways backed by something other than a local file (a remote
    /// store, a mounted volume) whose backend cannot be reached at all.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Gateway backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileGateway {
    path: PathBuf,
}

impl JsonFileGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn write_error(&self, source: io::Error) -> PersistenceError {
        PersistenceError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl ApplicationGateway for JsonFileGateway {
    fn load(&self) -> Result<Vec<Application>, PersistenceError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no application artifact yet; starting empty");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let records: Vec<Application> =
            serde_json::from_reader(io::BufReader::new(file)).map_err(|source| {
                PersistenceError::Decode {
                    path: self.path.clone(),
                    source,
                }
            })?;

        verify_invariants(&records).map_err(|detail| PersistenceError::Corrupt {
            path: self.path.clone(),
            detail,
        })?;

        info!(path = %self.path.display(), records = records.len(), "applications loaded");
        Ok(records)
    }

    fn save(&self, records: &[Application]) -> Result<(), PersistenceError> {
        let directory = self.directory();
        fs::create_dir_all(directory).map_err(|source| self.write_error(source))?;

        let staged = NamedTempFile::new_in(directory).map_err(|source| self.write_error(source))?;
        {
            let mut writer = BufWriter::new(staged.as_file());
            serde_json::to_writer_pretty(&mut writer, records).map_err(PersistenceError::Encode)?;
            writer.flush().map_err(|source| self.write_error(source))?;
        }
        staged
            .as_file()
            .sync_all()
            .map_err(|source| self.write_error(source))?;

        staged
            .persist(&self.path)
            .map_err(|err| self.write_error(err.error))?;

        debug!(path = %self.path.display(), records = records.len(), "applications committed");
        Ok(())
    }
}

/// Checks the invariants a stored collection must satisfy before it is served.
fn verify_invariants(records: &[Application]) -> Result<(), String> {
    let mut seen: HashSet<ApplicationId> = HashSet::with_capacity(records.len());
    let mut active: HashSet<(u64, &str)> = HashSet::new();

    for record in records {
        if !seen.insert(record.id) {
            return Err(format!("application id {} appears more than once", record.id));
        }
        if !record.is_consistent() {
            return Err(format!(
                "application {} has status '{}' but cancelled_date is {}",
                record.id,
                record.status.label(),
                if record.cancelled_date.is_some() {
                    "set"
                } else {
                    "missing"
                }
            ));
        }
        if record.is_active() && !active.insert((record.room_id, record.user_id.as_str())) {
            return Err(format!(
                "user '{}' has more than one active application for room {}",
                record.user_id, record.room_id
            ));
        }
    }

    Ok(())
}
