//! Integration tests for the project registry
//!
//! Tests TOML loading, validation and target resolution

use std::fs;
use std::path::PathBuf;
use style_patcher::config::{ValidationIssue, DEFAULT_BACKUP_DIR};
use style_patcher::{
    load_from_path, load_from_str, ConfigError, ProjectConfig, ProjectRegistry, TargetError,
};
use tempfile::TempDir;

/// Helper to create a project with a few stylesheets
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src/styles")).unwrap();
    fs::create_dir_all(dir.path().join("src/components")).unwrap();
    fs::create_dir_all(dir.path().join("node_modules/lib")).unwrap();

    fs::write(dir.path().join("src/index.css"), "body { margin: 0; }").unwrap();
    fs::write(dir.path().join("src/styles/components.css"), ".btn { a: b; }").unwrap();
    fs::write(dir.path().join("src/styles/base.css"), "html { a: b; }").unwrap();
    fs::write(dir.path().join("src/components/Button.tsx"), "export {}").unwrap();
    fs::write(dir.path().join("node_modules/lib/vendor.css"), ".x { a: b; }").unwrap();

    dir
}

fn registry_toml(root: &std::path::Path) -> String {
    format!(
        r#"
[projects.storefront]
root_path = "{}"
stylesheet_globs = ["src/index.css", "src/styles/*.css", "**/vendor.css"]
component_globs = ["src/components/*.tsx"]
backup_dir = "backups"
"#,
        root.display()
    )
}

#[test]
fn test_load_and_resolve() {
    let project = setup_project();
    let config_path = project.path().join("style-patcher.toml");
    fs::write(&config_path, registry_toml(project.path())).unwrap();

    let registry = ProjectRegistry::load(&config_path).unwrap();
    assert_eq!(registry.project_ids().collect::<Vec<_>>(), vec!["storefront"]);
    assert!(registry.validate().is_ok());

    let target = registry.target("storefront").unwrap();
    assert_eq!(target.root(), project.path().canonicalize().unwrap());
    assert!(target.backup_root().ends_with("backups"));
    assert!(!target.backup_root().exists());

    // node_modules is never indexed, even when a pattern matches it.
    assert_eq!(
        target.stylesheet_files(),
        vec![
            PathBuf::from("src/index.css"),
            PathBuf::from("src/styles/base.css"),
            PathBuf::from("src/styles/components.css"),
        ]
    );
    assert_eq!(
        target.component_files(),
        vec![PathBuf::from("src/components/Button.tsx")]
    );
}

#[test]
fn test_default_backup_dir() {
    let project = setup_project();
    let config = load_from_str(&format!(
        "[projects.site]\nroot_path = \"{}\"\nstylesheet_globs = [\"src/*.css\"]\n",
        project.path().display()
    ))
    .unwrap();

    let registry = ProjectRegistry::from_config(config);
    let target = registry.target("site").unwrap();
    assert!(target.backup_root().ends_with(DEFAULT_BACKUP_DIR));
}

#[test]
fn test_validation_reports_all_issues() {
    let err = load_from_str(
        r#"
[projects.one]
root_path = ""
stylesheet_globs = ["", "/abs/*.css"]

[projects.two]
root_path = "/tmp"
stylesheet_globs = ["src/[*.css"]
backup_dir = " "
"#,
    )
    .unwrap_err();

    let ConfigError::Validation { source, .. } = &err else {
        panic!("expected validation error, got {err}");
    };
    assert_eq!(source.issues.len(), 5);
    assert!(source.issues.contains(&ValidationIssue::MissingField {
        project_id: Some("one".into()),
        field: "root_path",
    }));
    assert!(source.issues.contains(&ValidationIssue::MissingField {
        project_id: Some("two".into()),
        field: "backup_dir",
    }));
}

#[test]
fn test_empty_registry_rejected() {
    let err = load_from_str("").unwrap_err();
    assert!(err.to_string().contains("registry contains no projects"));
}

#[test]
fn test_malformed_toml_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[projects.site\nroot_path = 1").unwrap();

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Toml { path: Some(_), .. }));
    assert!(err.to_string().contains("broken.toml"));
}

#[test]
fn test_missing_file() {
    let err = load_from_path("/definitely/not/here.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_root_must_be_directory() {
    let project = setup_project();
    let mut registry = ProjectRegistry::new();
    registry.register(
        "file",
        ProjectConfig::new(
            project.path().join("src/index.css").to_string_lossy(),
            vec![],
        ),
    );

    assert!(matches!(
        registry.target("file"),
        Err(TargetError::RootNotDirectory(_))
    ));
}
