//! The apply pipeline.
//!
//! ```text
//! Idle → Located → BackedUp → Patched → Validated → Written
//! ```
//!
//! Every failure branch ends in a [`PatchResult`] with `success = false`.
//! Failures after `BackedUp` that could have touched the file restore it
//! from the snapshot taken for this call.

use crate::backup::{BackupSnapshot, BackupStore};
use crate::config::ProjectTarget;
use crate::css::{
    validate_structure, AppliedChange, BlockPatcher, FileLocator, PatchOutcome, StructureIndex,
};
use crate::edit::atomic_write;
use crate::intent::PatchIntent;
use crate::issue::{issue, Issue, IssueKind};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyState {
    Idle,
    Located,
    BackedUp,
    Patched,
    Validated,
    Written,
}

/// How an apply ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStatus {
    Written,
    /// The project could not be resolved; nothing was touched
    ConfigurationError,
    NotFound,
    /// The located file failed the path guard; nothing was read
    PathRejected,
    BackupFailed,
    PatchFailed,
    InvalidCss,
    WriteFailed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchResult {
    pub success: bool,
    pub status: ApplyStatus,
    /// Last state reached
    pub state: ApplyState,
    pub file_path: Option<PathBuf>,
    pub selector: Option<String>,
    pub backup_path: Option<PathBuf>,
    pub changes_applied: Vec<AppliedChange>,
    pub errors: Vec<Issue>,
}

impl PatchResult {
    /// A result for a call rejected before the pipeline started.
    pub fn rejected(status: ApplyStatus, error: Issue) -> Self {
        Run::new().fail(status, vec![error])
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackResult {
    pub success: bool,
    pub file_path: Option<PathBuf>,
    pub backup_path: PathBuf,
    pub errors: Vec<Issue>,
}

impl RollbackResult {
    pub fn failed(file_path: Option<PathBuf>, backup_path: &Path, error: Issue) -> Self {
        Self {
            success: false,
            file_path,
            backup_path: backup_path.to_path_buf(),
            errors: vec![error],
        }
    }
}

/// Drives one project's apply pipeline.
#[derive(Debug)]
pub struct PatchApplier<'a> {
    target: &'a ProjectTarget,
    locator: FileLocator,
    patcher: BlockPatcher,
}

impl<'a> PatchApplier<'a> {
    pub fn new(target: &'a ProjectTarget) -> Self {
        Self {
            target,
            locator: FileLocator::new(),
            patcher: BlockPatcher::new(),
        }
    }

    pub fn with_locator(mut self, locator: FileLocator) -> Self {
        self.locator = locator;
        self
    }

    pub fn apply(&self, intent: &PatchIntent) -> PatchResult {
        let mut run = Run::new();

        let index = StructureIndex::build(self.target);
        let location = match self.locator.locate_for_intent(intent, &index) {
            Ok(location) => location,
            Err(err) => return run.fail(ApplyStatus::NotFound, vec![issue(&err)]),
        };
        run.result.file_path = Some(location.relative_path.clone());
        run.advance(ApplyState::Located);

        let path = match self.target.resolve_file(&location.relative_path) {
            Ok(path) => path,
            Err(err) => return run.fail(ApplyStatus::PathRejected, vec![issue(&err)]),
        };

        let store = BackupStore::new(self.target);
        let snapshot = match store.snapshot(&location.relative_path) {
            Ok(snapshot) => snapshot,
            Err(err) => return run.fail(ApplyStatus::BackupFailed, vec![issue(&err)]),
        };
        run.result.backup_path = Some(snapshot.backup_path.clone());
        run.advance(ApplyState::BackedUp);

        let original = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                let read = Issue::new(
                    IssueKind::Io,
                    format!("failed to read {}: {err}", location.relative_path.display()),
                );
                return run.fail(ApplyStatus::PatchFailed, vec![read]);
            }
        };

        // Patch the rule the locator matched; fallbacks carry the request.
        let outcome = self
            .patcher
            .patch(&original, &location.selector, &intent.changes);
        let blocked = outcome.is_blocked();
        let PatchOutcome {
            modified_text,
            selector: resolved,
            changes_applied,
            errors,
            ..
        } = outcome;
        run.result.selector = resolved;
        run.result.errors.extend(errors.iter().map(issue));
        if blocked {
            return run.fail(ApplyStatus::PatchFailed, Vec::new());
        }
        run.result.changes_applied = changes_applied;
        run.advance(ApplyState::Patched);

        let report = validate_structure(&modified_text);
        if !report.valid {
            let issues: Vec<Issue> = report
                .errors
                .into_iter()
                .map(|message| Issue::new(IssueKind::Validation, message))
                .collect();
            run.restore(&store, &snapshot);
            return run.fail(ApplyStatus::InvalidCss, issues);
        }
        run.advance(ApplyState::Validated);

        let written = self
            .target
            .guard()
            .revalidate(&path)
            .map_err(|err| issue(&err))
            .and_then(|path| {
                atomic_write(&path, modified_text.as_bytes()).map_err(|err| {
                    Issue::new(IssueKind::Io, format!("failed to write {}: {err}", path.display()))
                })
            });
        if let Err(write_issue) = written {
            run.restore(&store, &snapshot);
            return run.fail(ApplyStatus::WriteFailed, vec![write_issue]);
        }
        run.advance(ApplyState::Written);

        info!(
            file = %location.relative_path.display(),
            changes = run.result.changes_applied.len(),
            "patch written"
        );
        run.result.success = true;
        run.result.status = ApplyStatus::Written;
        run.result
    }

    /// Restore `relative` from `backup_path`, independent of any apply.
    pub fn rollback(&self, relative: &Path, backup_path: &Path) -> RollbackResult {
        let store = BackupStore::new(self.target);
        match store.restore(backup_path, relative) {
            Ok(_) => RollbackResult {
                success: true,
                file_path: Some(relative.to_path_buf()),
                backup_path: backup_path.to_path_buf(),
                errors: Vec::new(),
            },
            Err(err) => {
                warn!(file = %relative.display(), "rollback failed: {err}");
                RollbackResult::failed(Some(relative.to_path_buf()), backup_path, issue(&err))
            }
        }
    }
}

/// Bookkeeping for a single apply.
struct Run {
    state: ApplyState,
    result: PatchResult,
}

impl Run {
    fn new() -> Self {
        Self {
            state: ApplyState::Idle,
            result: PatchResult {
                success: false,
                status: ApplyStatus::NotFound,
                state: ApplyState::Idle,
                file_path: None,
                selector: None,
                backup_path: None,
                changes_applied: Vec::new(),
                errors: Vec::new(),
            },
        }
    }

    fn advance(&mut self, next: ApplyState) {
        debug!(from = ?self.state, to = ?next, "apply transition");
        self.state = next;
        self.result.state = next;
    }

    fn restore(&mut self, store: &BackupStore<'_>, snapshot: &BackupSnapshot) {
        warn!(
            file = %snapshot.relative_path.display(),
            "restoring from backup after failed apply"
        );
        if let Err(err) = store.restore(&snapshot.backup_path, &snapshot.relative_path) {
            self.result.errors.push(issue(&err));
        }
    }

    fn fail(mut self, status: ApplyStatus, issues: Vec<Issue>) -> PatchResult {
        self.result.errors.extend(issues);
        warn!(state = ?self.state, status = ?status, "apply failed");
        self.result.status = status;
        self.result.state = self.state;
        self.result
    }
}
