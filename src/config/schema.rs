use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Top-level registry file: one table per target project.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct RegistryConfig {
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectConfig>,
}

/// Configuration of a single target project.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Project root; `~` is expanded. Must exist when the project is resolved.
    pub root_path: String,
    /// Stylesheet patterns relative to the root, in priority order.
    #[serde(default)]
    pub stylesheet_globs: Vec<String>,
    #[serde(default)]
    pub component_globs: Vec<String>,
    /// Backup root; relative values resolve under the project root.
    #[serde(default)]
    pub backup_dir: Option<String>,
}

impl ProjectConfig {
    pub fn new(root_path: impl Into<String>, stylesheet_globs: Vec<String>) -> Self {
        Self {
            root_path: root_path.into(),
            stylesheet_globs,
            component_globs: Vec::new(),
            backup_dir: None,
        }
    }

    pub fn with_backup_dir(mut self, backup_dir: impl Into<String>) -> Self {
        self.backup_dir = Some(backup_dir.into());
        self
    }

    pub fn with_component_globs(mut self, globs: Vec<String>) -> Self {
        self.component_globs = globs;
        self
    }

    fn collect_issues(&self, id: &str, issues: &mut Vec<ValidationIssue>) {
        if self.root_path.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                project_id: Some(id.to_string()),
                field: "root_path",
            });
        }

        let patterns = self
            .stylesheet_globs
            .iter()
            .map(|p| ("stylesheet_globs", p))
            .chain(self.component_globs.iter().map(|p| ("component_globs", p)));

        for (field, pattern) in patterns {
            if pattern.trim().is_empty() {
                issues.push(ValidationIssue::InvalidCombo {
                    project_id: Some(id.to_string()),
                    message: format!("{field} contains an empty pattern"),
                });
                continue;
            }
            if Path::new(pattern).is_absolute() {
                issues.push(ValidationIssue::InvalidCombo {
                    project_id: Some(id.to_string()),
                    message: format!("{field} pattern '{pattern}' must be relative to root_path"),
                });
            }
            if let Err(err) = glob::Pattern::new(pattern) {
                issues.push(ValidationIssue::InvalidCombo {
                    project_id: Some(id.to_string()),
                    message: format!("{field} pattern '{pattern}' is invalid: {err}"),
                });
            }
        }

        if let Some(backup_dir) = &self.backup_dir {
            if backup_dir.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    project_id: Some(id.to_string()),
                    field: "backup_dir",
                });
            }
        }
    }
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.projects.is_empty() {
            issues.push(ValidationIssue::EmptyProjectList);
        }

        for (id, project) in &self.projects {
            if id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    project_id: None,
                    field: "id",
                });
            }
            project.collect_issues(id, &mut issues);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyProjectList,
    MissingField {
        project_id: Option<String>,
        field: &'static str,
    },
    InvalidCombo {
        project_id: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyProjectList => write!(f, "registry contains no projects"),
            ValidationIssue::MissingField { project_id, field } => match project_id {
                Some(id) => write!(f, "project '{id}' missing required field '{field}'"),
                None => write!(f, "project missing required field '{field}'"),
            },
            ValidationIssue::InvalidCombo {
                project_id,
                message,
            } => match project_id {
                Some(id) => write!(f, "project '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid project configuration: {message}"),
            },
        }
    }
}
