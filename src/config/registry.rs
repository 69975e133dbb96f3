use crate::config::loader::{load_from_path, ConfigError};
use crate::config::schema::{ProjectConfig, RegistryConfig, ValidationError};
use crate::config::target::{ProjectTarget, TargetError};
use std::collections::BTreeMap;
use std::path::Path;

/// Explicit set of known target projects, keyed by project id.
///
/// Passed by reference into [`crate::service::PatchService`]; targets are
/// resolved fresh for every call so nothing about the filesystem is cached.
#[derive(Debug, Clone, Default)]
pub struct ProjectRegistry {
    projects: BTreeMap<String, ProjectConfig>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: RegistryConfig) -> Self {
        Self {
            projects: config.projects,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_from_path(path).map(Self::from_config)
    }

    pub fn register(&mut self, id: impl Into<String>, config: ProjectConfig) {
        self.projects.insert(id.into(), config);
    }

    pub fn get(&self, id: &str) -> Option<&ProjectConfig> {
        self.projects.get(id)
    }

    pub fn project_ids(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Report every configuration issue at once.
    pub fn validate(&self) -> Result<(), ValidationError> {
        RegistryConfig {
            projects: self.projects.clone(),
        }
        .validate()
    }

    /// Resolve a project against the filesystem.
    pub fn target(&self, id: &str) -> Result<ProjectTarget, TargetError> {
        let config = self
            .get(id)
            .ok_or_else(|| TargetError::UnknownProject(id.to_string()))?;
        ProjectTarget::resolve(id, config)
    }
}
