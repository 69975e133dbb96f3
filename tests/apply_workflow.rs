//! End-to-end workflow test
//!
//! Tests the complete workflow through `PatchService`:
//! 1. Locate the target stylesheet
//! 2. Preview the patch
//! 3. Apply it (snapshot, patch, validate, write)
//! 4. Roll back to the exact original bytes

use std::fs;
use std::path::Path;
use style_patcher::{
    AppliedAction, ApplyStatus, IssueKind, MatchKind, PatchIntent, PatchService, ProjectConfig,
    ProjectRegistry, PropertyChange, RollbackTarget,
};
use tempfile::TempDir;

const INDEX_CSS: &str = r#"@import "./styles/components.css";

body {
  margin: 0;
}

.btn-base:hover {
  opacity: 0.9;
}
"#;

const COMPONENTS_CSS: &str = r#"/* Buttons */
.btn-base {
  width: 20px;
  height: 20px;
}

.card,
.panel {
  padding: 8px;
  border: 1px solid #ccc;
}
"#;

/// Create a mock frontend project with two stylesheets
fn setup_project() -> (TempDir, ProjectRegistry) {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src/styles")).unwrap();
    fs::write(dir.path().join("src/index.css"), INDEX_CSS).unwrap();
    fs::write(dir.path().join("src/styles/components.css"), COMPONENTS_CSS).unwrap();

    let mut registry = ProjectRegistry::new();
    registry.register(
        "storefront",
        ProjectConfig::new(
            dir.path().to_string_lossy(),
            vec!["src/index.css".into(), "src/styles/*.css".into()],
        ),
    );
    (dir, registry)
}

fn touch_target_intent() -> PatchIntent {
    PatchIntent::new(
        ".btn-base",
        vec![
            PropertyChange::modify("min-width", "44px"),
            PropertyChange::modify("min-height", "44px"),
        ],
    )
}

fn components(dir: &TempDir) -> String {
    fs::read_to_string(dir.path().join("src/styles/components.css")).unwrap()
}

#[test]
fn test_locate_prefers_exact_component_rule() {
    let (_dir, registry) = setup_project();
    let service = PatchService::new(&registry);

    let location = service.locate("storefront", ".btn-base").unwrap();
    assert_eq!(location.relative_path, Path::new("src/styles/components.css"));
    assert_eq!(location.line, 2);
    assert_eq!(location.kind, MatchKind::Exact);

    let fallback = service.locate("storefront", ".missing-rule").unwrap();
    assert_eq!(fallback.kind, MatchKind::NotFoundFallback);
    assert_eq!(fallback.confidence, 0.3);
}

#[test]
fn test_apply_then_rollback_restores_original_bytes() {
    let (dir, registry) = setup_project();
    let service = PatchService::new(&registry);

    let result = service.apply("storefront", &touch_target_intent());
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.status, ApplyStatus::Written);
    assert_eq!(
        result
            .changes_applied
            .iter()
            .map(|c| (c.property.as_str(), c.action, c.new_value.as_deref()))
            .collect::<Vec<_>>(),
        vec![
            ("min-width", AppliedAction::Added, Some("44px")),
            ("min-height", AppliedAction::Added, Some("44px")),
        ]
    );
    assert!(components(&dir).contains(
        ".btn-base {\n  width: 20px;\n  height: 20px;\n  min-width: 44px;\n  min-height: 44px;\n}"
    ));
    // Other rules and the other stylesheet are untouched.
    assert!(components(&dir).contains(".card,\n.panel {\n  padding: 8px;"));
    assert_eq!(
        fs::read_to_string(dir.path().join("src/index.css")).unwrap(),
        INDEX_CSS
    );

    let backup = result.backup_path.unwrap();
    let rollback = service.rollback(
        "storefront",
        &RollbackTarget::File("src/styles/components.css".into()),
        &backup,
    );
    assert!(rollback.success, "{:?}", rollback.errors);
    assert_eq!(components(&dir), COMPONENTS_CSS);
}

#[test]
fn test_preview_matches_apply() {
    let (dir, registry) = setup_project();
    let service = PatchService::new(&registry);

    let preview = service.preview("storefront", &touch_target_intent());
    assert!(preview.success);
    assert_eq!(preview.statistics.added_lines, 2);
    assert_eq!(preview.statistics.removed_lines, 0);
    assert_eq!(components(&dir), COMPONENTS_CSS);

    let result = service.apply("storefront", &touch_target_intent());
    assert!(result.success);
    assert_eq!(preview.changes_applied, result.changes_applied);
}

#[test]
fn test_generic_element_patches_first_button_rule() {
    let (dir, registry) = setup_project();
    let service = PatchService::new(&registry);

    let intent = PatchIntent::for_element(
        "button, [role=\"button\"]",
        vec![PropertyChange::modify("height", "44px")],
    );
    let result = service.apply("storefront", &intent);

    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.selector.as_deref(), Some(".btn-base"));
    assert_eq!(result.changes_applied[0].old_value.as_deref(), Some("20px"));
    assert!(components(&dir).contains("  height: 44px;\n"));
}

#[test]
fn test_selector_list_member_is_patched() {
    let (dir, registry) = setup_project();
    let service = PatchService::new(&registry);

    let intent = PatchIntent::new(".panel", vec![PropertyChange::remove("border")]);
    let result = service.apply("storefront", &intent);

    assert!(result.success, "{:?}", result.errors);
    assert!(components(&dir).contains(".card,\n.panel {\n  padding: 8px;\n}"));
}

#[test]
fn test_conflicts_reported_alongside_applied_changes() {
    let (_dir, registry) = setup_project();
    let service = PatchService::new(&registry);

    let intent = PatchIntent::new(
        ".btn-base",
        vec![
            PropertyChange::add("width", "44px"),
            PropertyChange::remove("padding"),
            PropertyChange::modify("height", "44px"),
        ],
    );
    let result = service.apply("storefront", &intent);

    assert!(result.success);
    assert_eq!(result.changes_applied.len(), 1);
    assert_eq!(result.errors.len(), 2);
    assert!(result
        .errors
        .iter()
        .all(|issue| issue.kind == IssueKind::PatchConflict));
}

#[test]
fn test_backups_listed_newest_first() {
    let (_dir, registry) = setup_project();
    let service = PatchService::new(&registry);

    assert!(service.list_backups("storefront").unwrap().is_empty());
    let result = service.apply("storefront", &touch_target_intent());
    assert!(result.success);

    let backups = service.list_backups("storefront").unwrap();
    assert_eq!(backups.len(), 1);
    assert_eq!(backups[0].relative_path, Path::new("src/styles/components.css"));
    assert_eq!(backups[0].size, COMPONENTS_CSS.len() as u64);
    assert_eq!(Some(&backups[0].backup_path), result.backup_path.as_ref());
}

#[test]
fn test_missing_root_is_configuration_error() {
    let mut registry = ProjectRegistry::new();
    registry.register(
        "ghost",
        ProjectConfig::new("/definitely/not/a/project", vec!["*.css".into()]),
    );
    let service = PatchService::new(&registry);

    let result = service.apply("ghost", &touch_target_intent());
    assert!(!result.success);
    assert_eq!(result.status, ApplyStatus::ConfigurationError);
    assert_eq!(result.errors[0].kind, IssueKind::Configuration);
}

#[test]
fn test_backup_outside_backup_root_is_rejected() {
    let (dir, registry) = setup_project();
    let service = PatchService::new(&registry);
    let outside = dir.path().join("src/index.css");

    let rollback = service.rollback(
        "storefront",
        &RollbackTarget::File("src/styles/components.css".into()),
        &outside,
    );
    assert!(!rollback.success);
    assert_eq!(rollback.errors[0].kind, IssueKind::PathSecurity);
    assert_eq!(components(&dir), COMPONENTS_CSS);
}

const NESTED_CSS: &str = ".card .btn-primary {\n  padding: 4px;\n}\n\n.panel {\n  margin: 0;\n}\n";

/// A project whose rules only loosely match the selectors asked for
fn setup_nested_project() -> (TempDir, ProjectRegistry) {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src/styles")).unwrap();
    fs::write(dir.path().join("src/styles/components.css"), NESTED_CSS).unwrap();

    let mut registry = ProjectRegistry::new();
    registry.register(
        "storefront",
        ProjectConfig::new(dir.path().to_string_lossy(), vec!["src/styles/*.css".into()]),
    );
    (dir, registry)
}

#[test]
fn test_contained_selector_patches_enclosing_rule() {
    let (dir, registry) = setup_nested_project();
    let service = PatchService::new(&registry);

    let location = service.locate("storefront", ".btn-primary").unwrap();
    assert_eq!(location.kind, MatchKind::Contains);
    assert_eq!(location.selector, ".card .btn-primary");

    let intent = PatchIntent::new(".btn-primary", vec![PropertyChange::modify("padding", "12px")]);
    let result = service.apply("storefront", &intent);

    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.status, ApplyStatus::Written);
    assert_eq!(result.selector.as_deref(), Some(".card .btn-primary"));
    assert_eq!(result.changes_applied[0].action, AppliedAction::Modified);
    assert_eq!(result.changes_applied[0].old_value.as_deref(), Some("4px"));
    assert_eq!(
        components(&dir),
        ".card .btn-primary {\n  padding: 12px;\n}\n\n.panel {\n  margin: 0;\n}\n"
    );
}

#[test]
fn test_contained_selector_preview() {
    let (dir, registry) = setup_nested_project();
    let service = PatchService::new(&registry);

    let intent = PatchIntent::new(".btn-primary", vec![PropertyChange::modify("padding", "12px")]);
    let preview = service.preview("storefront", &intent);

    assert!(preview.success, "{:?}", preview.errors);
    assert_eq!(preview.selector.as_deref(), Some(".card .btn-primary"));
    assert!(preview.diff.contains("-  padding: 4px;"));
    assert!(preview.diff.contains("+  padding: 12px;"));
    assert_eq!(preview.statistics.added_lines, 1);
    assert_eq!(preview.statistics.removed_lines, 1);
    assert_eq!(components(&dir), NESTED_CSS);
}

#[test]
fn test_class_overlap_patches_matched_rule() {
    let (dir, registry) = setup_nested_project();
    let service = PatchService::new(&registry);

    let location = service.locate("storefront", ".panel.is-open").unwrap();
    assert_eq!(location.kind, MatchKind::ClassOverlap);
    assert_eq!(location.selector, ".panel");

    let intent = PatchIntent::new(".panel.is-open", vec![PropertyChange::modify("margin", "8px")]);
    let preview = service.preview("storefront", &intent);
    assert!(preview.success, "{:?}", preview.errors);
    assert_eq!(preview.selector.as_deref(), Some(".panel"));

    let result = service.apply("storefront", &intent);
    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.selector.as_deref(), Some(".panel"));
    assert!(components(&dir).ends_with(".panel {\n  margin: 8px;\n}\n"));
    assert!(components(&dir).starts_with(".card .btn-primary {\n  padding: 4px;\n}"));
}

#[test]
fn test_read_only_operations_create_nothing() {
    let (dir, registry) = setup_nested_project();
    let service = PatchService::new(&registry);
    let intent = PatchIntent::new(".btn-primary", vec![PropertyChange::modify("padding", "12px")]);

    service.locate("storefront", ".btn-primary").unwrap();
    service.index("storefront").unwrap();
    assert!(service.preview("storefront", &intent).success);
    assert!(service.list_backups("storefront").unwrap().is_empty());
    assert!(!dir.path().join(".style-patcher").exists());

    assert!(service.apply("storefront", &intent).success);
    assert!(dir.path().join(".style-patcher/backups").is_dir());
}
