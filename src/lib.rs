//! Style Patcher: source-aware patching of project stylesheets
//!
//! Turns a [`PatchIntent`] (a selector plus ordered property changes) into
//! an in-place edit of the stylesheet that declares it, with a snapshot
//! taken before every write and rollback on failure.
//!
//! # Architecture
//!
//! As with any byte-span patcher, every mutation compiles down to one
//! primitive: [`Edit`], a verified byte-span replacement. The interesting
//! work is in finding spans:
//!
//! - [`StructureIndex`] scans configured stylesheets for top-level rules
//! - [`FileLocator`] scores candidates and picks one file and line
//! - [`BlockPatcher`] isolates the declaration block and edits properties
//! - [`BackupStore`] snapshots the file under a timestamp directory
//! - [`PatchApplier`] runs the locate → backup → patch → validate → write
//!   pipeline
//! - [`diff()`] renders a unified diff for previews
//!
//! Brace scanning sits behind the [`BlockScanner`] trait. The bundled
//! [`BraceScanner`] handles comments, strings and one level of nested
//! blocks, and reports anything deeper instead of guessing.
//!
//! # Safety
//!
//! - Every path is checked against the project root before any I/O
//! - Backups are never overwritten
//! - Atomic file writes (tempfile + fsync + rename)
//! - Failed validation or writes restore the file from its snapshot
//!
//! # Example
//!
//! ```no_run
//! use style_patcher::{PatchIntent, PatchService, ProjectConfig, ProjectRegistry, PropertyChange};
//!
//! let mut registry = ProjectRegistry::new();
//! registry.register(
//!     "storefront",
//!     ProjectConfig::new("~/work/storefront", vec!["src/styles/*.css".into()]),
//! );
//!
//! let intent = PatchIntent::new(
//!     ".btn-base",
//!     vec![PropertyChange::modify("min-height", "44px")],
//! );
//!
//! let result = PatchService::new(&registry).apply("storefront", &intent);
//! if result.success {
//!     println!("patched {:?}, backup at {:?}", result.file_path, result.backup_path);
//! }
//! ```

pub mod applicator;
pub mod backup;
pub mod config;
pub mod css;
pub mod diff;
pub mod edit;
pub mod intent;
pub mod issue;
pub mod safety;
pub mod service;

// Re-exports
pub use applicator::{ApplyState, ApplyStatus, PatchApplier, PatchResult, RollbackResult};
pub use backup::{BackupEntry, BackupError, BackupSnapshot, BackupStore};
pub use config::{
    load_from_path, load_from_str, ConfigError, ProjectConfig, ProjectRegistry, ProjectTarget,
    RegistryConfig, TargetError,
};
pub use css::{
    validate_structure, AppliedAction, AppliedChange, BlockPatcher, BlockScanner, BlockSpan,
    BraceScanner, CssError, FileIndex, FileLocator, LocateError, Location, MatchKind, PatchError,
    SelectorRecord, StructureIndex,
};
pub use diff::{diff, DiffKind, DiffLine, DiffResult};
pub use edit::{Edit, EditError, EditResult, EditVerification};
pub use intent::{ChangeAction, PatchIntent, PropertyChange};
pub use issue::{Issue, IssueKind};
pub use safety::{ProjectGuard, SafetyError};
pub use service::{PatchService, Preview, RollbackTarget};
