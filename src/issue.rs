//! Error kinds surfaced in operation results.

use crate::backup::BackupError;
use crate::config::{ConfigError, TargetError};
use crate::css::{LocateError, PatchError};
use crate::safety::SafetyError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Project missing or misconfigured
    Configuration,
    /// A path escaped the project root or hit a forbidden directory
    PathSecurity,
    NotFound,
    /// Per-change conflict (`add` on a present property, `remove` on an
    /// absent one), or a snapshot already taken for the current second
    PatchConflict,
    /// Post-patch structural check failed
    Validation,
    Io,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssueKind::Configuration => "configuration",
            IssueKind::PathSecurity => "path_security",
            IssueKind::NotFound => "not_found",
            IssueKind::PatchConflict => "patch_conflict",
            IssueKind::Validation => "validation",
            IssueKind::Io => "io",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub message: String,
}

impl Issue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl From<&SafetyError> for IssueKind {
    fn from(err: &SafetyError) -> Self {
        match err {
            SafetyError::Canonicalize { .. } => IssueKind::Io,
            SafetyError::OutsideRoot { .. } | SafetyError::ForbiddenPath { .. } => {
                IssueKind::PathSecurity
            }
        }
    }
}

impl From<&TargetError> for IssueKind {
    fn from(err: &TargetError) -> Self {
        match err {
            TargetError::Guard(err) => err.into(),
            TargetError::UnknownProject(_)
            | TargetError::RootMissing(_)
            | TargetError::RootNotDirectory(_) => IssueKind::Configuration,
        }
    }
}

impl From<&ConfigError> for IssueKind {
    fn from(_: &ConfigError) -> Self {
        IssueKind::Configuration
    }
}

impl From<&LocateError> for IssueKind {
    fn from(_: &LocateError) -> Self {
        IssueKind::NotFound
    }
}

impl From<&BackupError> for IssueKind {
    fn from(err: &BackupError) -> Self {
        match err {
            BackupError::Path(err) => err.into(),
            BackupError::SourceMissing(_) | BackupError::NotFound(_) => IssueKind::NotFound,
            BackupError::AlreadyExists(_) => IssueKind::PatchConflict,
            BackupError::Io { .. } => IssueKind::Io,
        }
    }
}

impl From<&PatchError> for IssueKind {
    fn from(err: &PatchError) -> Self {
        match err {
            PatchError::SelectorNotFound { .. }
            | PatchError::GenericSelectorNotFound { .. } => IssueKind::NotFound,
            PatchError::Scan(_) => IssueKind::Validation,
            PatchError::Edit(_) => IssueKind::Io,
            PatchError::EmptyProperty
            | PatchError::EmptyValue { .. }
            | PatchError::PropertyExists { .. }
            | PatchError::PropertyNotFound { .. } => IssueKind::PatchConflict,
        }
    }
}

/// Build an [`Issue`] from any error whose kind is known.
pub fn issue<E>(err: &E) -> Issue
where
    E: std::error::Error,
    for<'a> IssueKind: From<&'a E>,
{
    Issue::new(IssueKind::from(err), err.to_string())
}
