pub mod loader;
pub mod registry;
pub mod schema;
pub mod target;

pub use loader::{load_from_path, load_from_str, ConfigError};
pub use registry::ProjectRegistry;
pub use schema::{ProjectConfig, RegistryConfig, ValidationError, ValidationIssue};
pub use target::{ProjectTarget, TargetError, DEFAULT_BACKUP_DIR};
