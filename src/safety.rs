use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Directories inside a project that are never indexed or patched.
const FORBIDDEN_DIRS: &[&str] = &["node_modules", ".git"];

/// Path-traversal guard: keeps every touched path inside a project root.
#[derive(Debug, Clone)]
pub struct ProjectGuard {
    /// Canonical absolute project root
    root: PathBuf,
    /// Canonical paths to forbidden directories
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside project root: {path} (root: {root})")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Failed to canonicalize {path}: {source}")]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProjectGuard {
    /// Create a guard rooted at `root` with the default forbidden directories.
    ///
    /// The root is canonicalized so symlinked roots compare correctly.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        Ok(Self::at_root(canonicalize(root.as_ref())?))
    }

    /// Create a guard for a root that may not exist yet.
    ///
    /// The root resolves through its nearest existing ancestor, so it
    /// compares equal to the canonical path once the directory is created.
    pub fn lenient(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        Ok(Self::at_root(resolve_lenient(root.as_ref())?))
    }

    fn at_root(root: PathBuf) -> Self {
        let forbidden_paths = FORBIDDEN_DIRS
            .iter()
            .filter_map(|dir| root.join(dir).canonicalize().ok())
            .collect();

        Self {
            root,
            forbidden_paths,
        }
    }

    /// Create a guard with additional forbidden directories.
    ///
    /// Entries that do not exist yet are resolved leniently.
    pub fn with_forbidden(
        root: impl AsRef<Path>,
        extra: impl IntoIterator<Item = PathBuf>,
    ) -> Result<Self, SafetyError> {
        let mut guard = Self::new(root)?;
        for path in extra {
            let resolved = resolve_lenient(&path)?;
            if !guard.forbidden_paths.contains(&resolved) {
                guard.forbidden_paths.push(resolved);
            }
        }
        Ok(guard)
    }

    /// Check if a path is safe to read or write.
    ///
    /// Relative paths resolve against the root. Paths that do not exist yet
    /// (a restore target that was deleted) are resolved through their nearest
    /// existing ancestor. Returns the resolved absolute path.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let resolved = resolve_lenient(&absolute)?;
        self.check_resolved(&resolved)?;
        Ok(resolved)
    }

    /// Re-validate immediately before a write to narrow the TOCTOU window.
    pub fn revalidate(&self, path: &Path) -> Result<PathBuf, SafetyError> {
        let resolved = resolve_lenient(path)?;
        self.check_resolved(&resolved)?;
        Ok(resolved)
    }

    /// Path of a validated file relative to the root.
    pub fn relative(&self, resolved: &Path) -> Result<PathBuf, SafetyError> {
        resolved
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .map_err(|_| SafetyError::OutsideRoot {
                path: resolved.to_path_buf(),
                root: self.root.clone(),
            })
    }

    fn check_resolved(&self, resolved: &Path) -> Result<(), SafetyError> {
        if !resolved.starts_with(&self.root) {
            return Err(SafetyError::OutsideRoot {
                path: resolved.to_path_buf(),
                root: self.root.clone(),
            });
        }

        for forbidden in &self.forbidden_paths {
            if resolved.starts_with(forbidden) {
                return Err(SafetyError::ForbiddenPath {
                    path: resolved.to_path_buf(),
                    forbidden: forbidden.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize()
        .map_err(|source| SafetyError::Canonicalize {
            path: path.to_path_buf(),
            source,
        })
}

/// Canonicalize the longest existing ancestor and re-append the rest.
///
/// The non-existent tail must consist of normal components only; a `..` in
/// it cannot be resolved without the filesystem and is refused.
fn resolve_lenient(path: &Path) -> Result<PathBuf, SafetyError> {
    if let Ok(canonical) = path.canonicalize() {
        return Ok(canonical);
    }

    let mut existing = path;
    let mut tail = Vec::new();
    loop {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent;
                if existing.exists() {
                    break;
                }
            }
            _ => return canonicalize(path),
        }
    }

    let mut resolved = canonicalize(existing)?;
    for name in tail.into_iter().rev() {
        let component = Path::new(&name);
        if !matches!(component.components().next(), Some(Component::Normal(_))) {
            return Err(SafetyError::Canonicalize {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "unresolvable component in missing path",
                ),
            });
        }
        resolved.push(component);
    }
    Ok(resolved)
}
