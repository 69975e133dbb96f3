//! Resolved, ready-to-use view of a configured project.

use crate::config::schema::ProjectConfig;
use crate::safety::{ProjectGuard, SafetyError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Default backup root, relative to the project root.
pub const DEFAULT_BACKUP_DIR: &str = ".style-patcher/backups";

#[derive(Error, Debug)]
pub enum TargetError {
    #[error("unknown project: {0}")]
    UnknownProject(String),

    #[error("project root does not exist: {0}")]
    RootMissing(PathBuf),

    #[error("project root is not a directory: {0}")]
    RootNotDirectory(PathBuf),

    #[error(transparent)]
    Guard(#[from] SafetyError),
}

/// A project resolved against the filesystem.
///
/// Construction canonicalizes the root and builds the path guards without
/// touching the filesystem; the backup root is created by the first
/// snapshot. Everything derived from it (stylesheet lists, indexes) is
/// recomputed on demand.
#[derive(Debug, Clone)]
pub struct ProjectTarget {
    id: String,
    stylesheet_globs: Vec<String>,
    component_globs: Vec<String>,
    backup_root: PathBuf,
    guard: ProjectGuard,
    backup_guard: ProjectGuard,
}

impl ProjectTarget {
    pub fn resolve(id: impl Into<String>, config: &ProjectConfig) -> Result<Self, TargetError> {
        let root = expand_home(&config.root_path);
        if !root.exists() {
            return Err(TargetError::RootMissing(root));
        }
        if !root.is_dir() {
            return Err(TargetError::RootNotDirectory(root));
        }
        let root = root.canonicalize().map_err(|source| SafetyError::Canonicalize {
            path: root.clone(),
            source,
        })?;

        let backup_dir = config
            .backup_dir
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BACKUP_DIR));
        let backup_dir = if backup_dir.is_absolute() {
            backup_dir
        } else {
            root.join(backup_dir)
        };
        let backup_guard = ProjectGuard::lenient(&backup_dir)?;
        let backup_root = backup_guard.root().to_path_buf();
        let guard = ProjectGuard::with_forbidden(&root, vec![backup_root.clone()])?;

        debug!(
            project = %config.root_path,
            root = %guard.root().display(),
            backups = %backup_root.display(),
            "resolved project target"
        );

        Ok(Self {
            id: id.into(),
            stylesheet_globs: config.stylesheet_globs.clone(),
            component_globs: config.component_globs.clone(),
            backup_root,
            guard,
            backup_guard,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Path {
        self.guard.root()
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    pub fn guard(&self) -> &ProjectGuard {
        &self.guard
    }

    pub fn backup_guard(&self) -> &ProjectGuard {
        &self.backup_guard
    }

    pub fn stylesheet_globs(&self) -> &[String] {
        &self.stylesheet_globs
    }

    /// Stylesheets matched by the configured patterns, root-relative, in
    /// declared order with duplicates removed.
    pub fn stylesheet_files(&self) -> Vec<PathBuf> {
        expand_patterns(&self.guard, &self.stylesheet_globs)
    }

    pub fn component_files(&self) -> Vec<PathBuf> {
        expand_patterns(&self.guard, &self.component_globs)
    }

    /// Validate a root-relative path and return its absolute location.
    pub fn resolve_file(&self, relative: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        self.guard.validate_path(relative)
    }
}

fn expand_home(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw == "~" {
        if let Some(home) = home::home_dir() {
            return home;
        }
    }
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = home::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

fn has_glob_meta(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn expand_patterns(guard: &ProjectGuard, patterns: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();

    let accept = |candidate: &Path, files: &mut Vec<PathBuf>| {
        if !candidate.is_file() {
            return;
        }
        match guard.validate_path(candidate).and_then(|p| guard.relative(&p)) {
            Ok(relative) => {
                if !files.contains(&relative) {
                    files.push(relative);
                }
            }
            Err(err) => debug!(path = %candidate.display(), "skipping file: {err}"),
        }
    };

    for pattern in patterns {
        if !has_glob_meta(pattern) {
            accept(&guard.root().join(pattern), &mut files);
            continue;
        }

        let full = format!(
            "{}/{}",
            glob::Pattern::escape(&guard.root().to_string_lossy()),
            pattern
        );
        let entries = match glob::glob(&full) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(pattern = %pattern, "skipping invalid pattern: {err}");
                continue;
            }
        };
        for entry in entries {
            match entry {
                Ok(path) => accept(&path, &mut files),
                Err(err) => warn!(pattern = %pattern, "unreadable glob entry: {err}"),
            }
        }
    }

    files
}
