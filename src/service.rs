//! Stateless entry point over a [`ProjectRegistry`].
//!
//! Each call resolves its project, builds a fresh index and drops
//! everything before returning. Nothing is shared between calls but the
//! registry itself.

use crate::applicator::{ApplyStatus, PatchApplier, PatchResult, RollbackResult};
use crate::backup::{BackupEntry, BackupStore};
use crate::config::{ProjectRegistry, ProjectTarget};
use crate::css::{AppliedChange, BlockPatcher, FileLocator, Location, StructureIndex};
use crate::diff::{diff, DiffLine};
use crate::intent::{ChangeAction, PatchIntent};
use crate::issue::{issue, Issue, IssueKind};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which file a rollback restores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackTarget {
    File(PathBuf),
    /// Resolved to a file through the locator
    Selector(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub property: String,
    pub action: ChangeAction,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffStatistics {
    pub added_lines: usize,
    pub removed_lines: usize,
    /// Lines in the modified text
    pub line_count: usize,
}

/// What an apply would do, computed without writing anything.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preview {
    pub success: bool,
    pub file_path: Option<PathBuf>,
    pub selector: Option<String>,
    pub diff: String,
    pub formatted_diff: Vec<DiffLine>,
    pub changes_summary: Vec<ChangeSummary>,
    pub changes_applied: Vec<AppliedChange>,
    pub statistics: DiffStatistics,
    pub errors: Vec<Issue>,
}

impl Preview {
    fn failed(intent: &PatchIntent, file_path: Option<PathBuf>, errors: Vec<Issue>) -> Self {
        Self {
            success: false,
            file_path,
            selector: None,
            diff: String::new(),
            formatted_diff: Vec::new(),
            changes_summary: summarize(intent),
            changes_applied: Vec::new(),
            statistics: DiffStatistics::default(),
            errors,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PatchService<'a> {
    registry: &'a ProjectRegistry,
}

impl<'a> PatchService<'a> {
    pub fn new(registry: &'a ProjectRegistry) -> Self {
        Self { registry }
    }

    fn target(&self, project: &str) -> Result<ProjectTarget, Issue> {
        self.registry.target(project).map_err(|err| issue(&err))
    }

    pub fn apply(&self, project: &str, intent: &PatchIntent) -> PatchResult {
        match self.target(project) {
            Ok(target) => PatchApplier::new(&target).apply(intent),
            Err(err) => PatchResult::rejected(ApplyStatus::ConfigurationError, err),
        }
    }

    /// Locate, patch in memory and diff. Never writes.
    pub fn preview(&self, project: &str, intent: &PatchIntent) -> Preview {
        let target = match self.target(project) {
            Ok(target) => target,
            Err(err) => return Preview::failed(intent, None, vec![err]),
        };

        let index = StructureIndex::build(&target);
        let location = match FileLocator::new().locate_for_intent(intent, &index) {
            Ok(location) => location,
            Err(err) => return Preview::failed(intent, None, vec![issue(&err)]),
        };
        let relative = location.relative_path;

        let original = match target
            .resolve_file(&relative)
            .map_err(|err| issue(&err))
            .and_then(|path| {
                fs::read_to_string(&path).map_err(|err| {
                    Issue::new(IssueKind::Io, format!("failed to read {}: {err}", path.display()))
                })
            }) {
            Ok(text) => text,
            Err(err) => return Preview::failed(intent, Some(relative), vec![err]),
        };

        let outcome = BlockPatcher::new().patch(&original, &location.selector, &intent.changes);
        let errors: Vec<Issue> = outcome.errors.iter().map(issue).collect();
        if outcome.is_blocked() {
            return Preview::failed(intent, Some(relative), errors);
        }

        let result = diff(&original, &outcome.modified_text, &relative.to_string_lossy());
        debug!(
            file = %relative.display(),
            added = result.added_lines,
            removed = result.removed_lines,
            "computed preview"
        );

        Preview {
            success: true,
            selector: outcome.selector,
            statistics: DiffStatistics {
                added_lines: result.added_lines,
                removed_lines: result.removed_lines,
                line_count: outcome.modified_text.lines().count(),
            },
            diff: result.unified,
            formatted_diff: result.lines,
            changes_summary: summarize(intent),
            changes_applied: outcome.changes_applied,
            file_path: Some(relative),
            errors,
        }
    }

    pub fn rollback(
        &self,
        project: &str,
        rollback_target: &RollbackTarget,
        backup_path: &Path,
    ) -> RollbackResult {
        let target = match self.target(project) {
            Ok(target) => target,
            Err(err) => return RollbackResult::failed(None, backup_path, err),
        };

        let relative = match rollback_target {
            RollbackTarget::File(path) => path.clone(),
            RollbackTarget::Selector(selector) => {
                let index = StructureIndex::build(&target);
                match FileLocator::new().locate(selector, &index) {
                    Ok(location) => location.relative_path,
                    Err(err) => return RollbackResult::failed(None, backup_path, issue(&err)),
                }
            }
        };

        PatchApplier::new(&target).rollback(&relative, backup_path)
    }

    pub fn list_backups(&self, project: &str) -> Result<Vec<BackupEntry>, Issue> {
        let target = self.target(project)?;
        BackupStore::new(&target).list().map_err(|err| issue(&err))
    }

    pub fn locate(&self, project: &str, selector: &str) -> Result<Location, Issue> {
        let target = self.target(project)?;
        let index = StructureIndex::build(&target);
        FileLocator::new()
            .locate(selector, &index)
            .map_err(|err| issue(&err))
    }

    pub fn index(&self, project: &str) -> Result<StructureIndex, Issue> {
        let target = self.target(project)?;
        Ok(StructureIndex::build(&target))
    }
}

fn summarize(intent: &PatchIntent) -> Vec<ChangeSummary> {
    intent
        .changes
        .iter()
        .map(|change| ChangeSummary {
            property: change.property.clone(),
            action: change.action,
            value: change.value.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::intent::PropertyChange;

    fn registry(css: &str) -> (tempfile::TempDir, ProjectRegistry) {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("components.css"), css).unwrap();
        let mut registry = ProjectRegistry::new();
        registry.register(
            "site",
            ProjectConfig::new(temp_dir.path().to_string_lossy(), vec!["*.css".into()]),
        );
        (temp_dir, registry)
    }

    #[test]
    fn test_preview_does_not_write() {
        let css = ".btn-base {\n  width: 20px;\n}\n";
        let (dir, registry) = registry(css);
        let service = PatchService::new(&registry);
        let intent = PatchIntent::new(".btn-base", vec![PropertyChange::modify("min-width", "44px")]);

        let preview = service.preview("site", &intent);
        assert!(preview.success, "{:?}", preview.errors);
        assert_eq!(preview.file_path.as_deref(), Some(Path::new("components.css")));
        assert_eq!(preview.statistics.added_lines, 1);
        assert_eq!(preview.statistics.removed_lines, 0);
        assert_eq!(preview.statistics.line_count, 4);
        assert_eq!(preview.changes_summary[0].action, ChangeAction::Modify);
        assert!(preview.diff.contains("+  min-width: 44px;"));

        assert_eq!(fs::read_to_string(dir.path().join("components.css")).unwrap(), css);
        assert!(service.list_backups("site").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_project() {
        let (_dir, registry) = registry("");
        let service = PatchService::new(&registry);
        let intent = PatchIntent::new(".a", vec![]);

        let result = service.apply("missing", &intent);
        assert_eq!(result.status, ApplyStatus::ConfigurationError);
        assert_eq!(result.errors[0].kind, IssueKind::Configuration);

        let err = service.locate("missing", ".a").unwrap_err();
        assert_eq!(err.kind, IssueKind::Configuration);
    }

    #[test]
    fn test_rollback_by_selector() {
        let css = ".btn-base {\n  width: 20px;\n}\n";
        let (dir, registry) = registry(css);
        let service = PatchService::new(&registry);
        let intent = PatchIntent::new(".btn-base", vec![PropertyChange::modify("width", "44px")]);

        let applied = service.apply("site", &intent);
        assert!(applied.success);
        let backup = applied.backup_path.unwrap();

        let rollback = service.rollback(
            "site",
            &RollbackTarget::Selector(".btn-base".into()),
            &backup,
        );
        assert!(rollback.success, "{:?}", rollback.errors);
        assert_eq!(rollback.file_path.as_deref(), Some(Path::new("components.css")));
        assert_eq!(fs::read_to_string(dir.path().join("components.css")).unwrap(), css);

        let backups = service.list_backups("site").unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].relative_path, Path::new("components.css"));
    }
}
