use crate::config::schema::{RegistryConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(
                    f,
                    "failed to read project registry from {}: {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse project registry TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse project registry TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(
                    f,
                    "invalid project registry ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "invalid project registry: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<RegistryConfig, ConfigError> {
    let config: RegistryConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<RegistryConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_str() {
        let config = load_from_str(
            r#"
[projects.storefront]
root_path = "/srv/storefront"
stylesheet_globs = ["src/styles/*.css", "src/index.css"]
component_globs = ["src/components/*.tsx"]
backup_dir = "backups/storefront"
"#,
        )
        .unwrap();

        let project = &config.projects["storefront"];
        assert_eq!(project.stylesheet_globs.len(), 2);
        assert_eq!(project.backup_dir.as_deref(), Some("backups/storefront"));
    }

    #[test]
    fn test_load_from_str_syntax_error() {
        let err = load_from_str("[projects.storefront\nroot_path = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { path: None, .. }));
    }

    #[test]
    fn test_load_from_path_attaches_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("style-patcher.toml");
        fs::write(&path, "[projects]\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        match err {
            ConfigError::Validation { path: Some(p), .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_from_missing_path() {
        let err = load_from_path("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("failed to read project registry"));
    }
}
