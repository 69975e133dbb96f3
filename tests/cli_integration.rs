//! Integration tests for the command-line interface
//!
//! Runs the built binary against a temporary project and registry

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const COMPONENTS_CSS: &str = ".btn-base {\n  width: 20px;\n  height: 20px;\n}\n";

/// Helper to create a project plus its registry file
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src/styles")).unwrap();
    fs::write(dir.path().join("src/styles/components.css"), COMPONENTS_CSS).unwrap();
    fs::write(
        dir.path().join("style-patcher.toml"),
        format!(
            r#"[projects.site]
root_path = "{}"
stylesheet_globs = ["src/styles/*.css"]
"#,
            dir.path().display()
        ),
    )
    .unwrap();
    dir
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_style-patcher"))
        .arg("--config")
        .arg(dir.join("style-patcher.toml"))
        .args(args)
        .env_remove("STYLE_PATCHER_CONFIG")
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

#[test]
fn test_apply_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_style-patcher"))
        .args(["apply", "--help"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Apply a patch intent to the located stylesheet"));
}

#[test]
fn test_apply_and_rollback_json() {
    let project = setup_project();

    let output = run(
        project.path(),
        &[
            "--json",
            "apply",
            "--project",
            "site",
            "--selector",
            ".btn-base",
            "--change",
            "min-width=44px",
            "--change",
            "remove:height",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["success"], true);
    assert_eq!(result["status"], "written");
    assert_eq!(result["filePath"], "src/styles/components.css");
    assert_eq!(result["changesApplied"][0]["action"], "added");
    assert_eq!(result["changesApplied"][1]["action"], "removed");

    let patched =
        fs::read_to_string(project.path().join("src/styles/components.css")).unwrap();
    assert_eq!(patched, ".btn-base {\n  width: 20px;\n  min-width: 44px;\n}\n");

    let backup = result["backupPath"].as_str().unwrap().to_string();
    let output = run(
        project.path(),
        &[
            "rollback",
            "--project",
            "site",
            "--backup",
            &backup,
            "--selector",
            ".btn-base",
        ],
    );
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Restored from"));
    assert_eq!(
        fs::read_to_string(project.path().join("src/styles/components.css")).unwrap(),
        COMPONENTS_CSS
    );
}

#[test]
fn test_preview_does_not_write() {
    let project = setup_project();

    let output = run(
        project.path(),
        &[
            "preview",
            "--project",
            "site",
            "--selector",
            ".btn-base",
            "--change",
            "width=44px",
        ],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("-  width: 20px;"));
    assert!(stdout.contains("+  width: 44px;"));
    assert!(stdout.contains("Summary:"));

    assert_eq!(
        fs::read_to_string(project.path().join("src/styles/components.css")).unwrap(),
        COMPONENTS_CSS
    );
}

#[test]
fn test_apply_from_intent_file() {
    let project = setup_project();
    let intent = project.path().join("intent.json");
    fs::write(
        &intent,
        r#"{
            "type": "touch-target",
            "targetElement": "button",
            "changes": [{ "property": "min-height", "value": "44px" }],
            "priority": 9,
            "status": "pending"
        }"#,
    )
    .unwrap();

    let output = run(
        project.path(),
        &["apply", "--project", "site", "--intent", intent.to_str().unwrap()],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("APPLIED"));
    assert!(fs::read_to_string(project.path().join("src/styles/components.css"))
        .unwrap()
        .contains("  min-height: 44px;\n}"));
}

#[test]
fn test_failed_apply_exits_nonzero() {
    let project = setup_project();

    let output = run(
        project.path(),
        &[
            "apply",
            "--project",
            "site",
            "--selector",
            ".missing-rule",
            "--change",
            "width=1px",
        ],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("selector not found"));
}

#[test]
fn test_locate_and_backups() {
    let project = setup_project();

    let output = run(project.path(), &["locate", "--project", "site", ".btn-base"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("src/styles/components.css:1"));

    let output = run(project.path(), &["backups", "--project", "site"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No backups"));
}

#[test]
fn test_missing_registry() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["index", "--project", "site"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Project registry not found"));
}
