//! Timestamp-scoped file snapshots.
//!
//! Layout under the project's backup root:
//!
//! ```text
//! <backup_root>/<YYYY-MM-DD-HH-MM-SS>/<relative path of the file>
//! ```
//!
//! Snapshots are written once and never overwritten or pruned.

use crate::config::ProjectTarget;
use crate::safety::SafetyError;
use chrono::{DateTime, Utc};
use filetime::FileTime;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use xxhash_rust::xxh3::xxh3_64;

/// Second-resolution UTC label of a snapshot directory.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("file to back up does not exist: {0}")]
    SourceMissing(PathBuf),

    #[error("a backup of this file was already taken this second, retry once the clock advances: {0}")]
    AlreadyExists(PathBuf),

    #[error("backup not found: {0}")]
    NotFound(PathBuf),

    #[error(transparent)]
    Path(#[from] SafetyError),

    #[error("backup I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BackupError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| BackupError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub backup_path: PathBuf,
    pub relative_path: PathBuf,
    pub timestamp_label: String,
    /// xxh3 of the copied bytes
    pub fingerprint: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub backup_path: PathBuf,
    pub relative_path: PathBuf,
    pub timestamp_label: String,
    pub size: u64,
    /// Modification time of the backup, which carries the source file's mtime
    pub created_at: Option<DateTime<Utc>>,
}

/// Snapshot, restore and list backups of one project.
#[derive(Debug, Clone, Copy)]
pub struct BackupStore<'a> {
    target: &'a ProjectTarget,
}

impl<'a> BackupStore<'a> {
    pub fn new(target: &'a ProjectTarget) -> Self {
        Self { target }
    }

    pub fn snapshot(&self, relative: impl AsRef<Path>) -> Result<BackupSnapshot, BackupError> {
        self.snapshot_at(relative, Utc::now())
    }

    /// Copy the file at `relative` into the snapshot directory for `now`.
    ///
    /// Creates the backup root on first use. An existing backup of the same
    /// file in the same second is an error; it is never replaced.
    pub fn snapshot_at(
        &self,
        relative: impl AsRef<Path>,
        now: DateTime<Utc>,
    ) -> Result<BackupSnapshot, BackupError> {
        let source = self.target.resolve_file(relative.as_ref())?;
        let relative = self.target.guard().relative(&source)?;
        if !source.is_file() {
            return Err(BackupError::SourceMissing(relative));
        }

        let timestamp_label = now.format(TIMESTAMP_FORMAT).to_string();
        let backup_path = self
            .target
            .backup_guard()
            .validate_path(Path::new(&timestamp_label).join(&relative))?;
        if backup_path.exists() {
            return Err(BackupError::AlreadyExists(backup_path));
        }
        if let Some(parent) = backup_path.parent() {
            fs::create_dir_all(parent).map_err(BackupError::io(parent))?;
        }

        let bytes = fs::read(&source).map_err(BackupError::io(&source))?;
        let metadata = fs::metadata(&source).map_err(BackupError::io(&source))?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&backup_path)
            .map_err(|source| match source.kind() {
                io::ErrorKind::AlreadyExists => BackupError::AlreadyExists(backup_path.clone()),
                _ => BackupError::Io {
                    path: backup_path.clone(),
                    source,
                },
            })?;
        file.write_all(&bytes)
            .and_then(|()| file.sync_all())
            .map_err(BackupError::io(&backup_path))?;
        drop(file);

        let mtime = FileTime::from_last_modification_time(&metadata);
        if let Err(err) = filetime::set_file_mtime(&backup_path, mtime) {
            warn!(backup = %backup_path.display(), "could not preserve mtime: {err}");
        }

        info!(
            file = %relative.display(),
            backup = %backup_path.display(),
            "created backup"
        );

        Ok(BackupSnapshot {
            backup_path,
            relative_path: relative,
            timestamp_label,
            fingerprint: xxh3_64(&bytes),
        })
    }

    /// Copy a backup over the project file at `relative`.
    ///
    /// Both paths are checked against their guards before any I/O.
    pub fn restore(&self, backup_path: &Path, relative: &Path) -> Result<PathBuf, BackupError> {
        let backup_path = self.target.backup_guard().validate_path(backup_path)?;
        let destination = self.target.resolve_file(relative)?;
        if !backup_path.is_file() {
            return Err(BackupError::NotFound(backup_path));
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(BackupError::io(parent))?;
        }
        fs::copy(&backup_path, &destination).map_err(BackupError::io(&destination))?;

        info!(
            file = %relative.display(),
            backup = %backup_path.display(),
            "restored from backup"
        );
        Ok(destination)
    }

    /// Every backed-up file, newest snapshot first.
    pub fn list(&self) -> Result<Vec<BackupEntry>, BackupError> {
        let root = self.target.backup_root();
        let mut entries = Vec::new();
        if !root.is_dir() {
            return Ok(entries);
        }

        for entry in WalkDir::new(root).min_depth(2) {
            let entry = entry.map_err(|err| BackupError::Io {
                path: err.path().unwrap_or(root).to_path_buf(),
                source: err
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("filesystem loop")),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(inner) = entry.path().strip_prefix(root) else {
                continue;
            };
            let mut components = inner.components();
            let Some(label) = components.next() else {
                continue;
            };
            let timestamp_label = label.as_os_str().to_string_lossy().into_owned();
            let relative_path = components.as_path().to_path_buf();

            let metadata = entry.metadata().map_err(|err| BackupError::Io {
                path: entry.path().to_path_buf(),
                source: err
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("metadata unavailable")),
            })?;

            entries.push(BackupEntry {
                backup_path: entry.path().to_path_buf(),
                relative_path,
                timestamp_label,
                size: metadata.len(),
                created_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        entries.sort_by(|a, b| {
            b.timestamp_label
                .cmp(&a.timestamp_label)
                .then_with(|| a.relative_path.cmp(&b.relative_path))
        });
        debug!(project = self.target.id(), count = entries.len(), "listed backups");
        Ok(entries)
    }
}
