//! Stylesheet structure: scanning, indexing, locating and patching.

pub mod errors;
pub mod index;
pub mod locator;
pub mod patcher;
pub mod scanner;
pub mod validator;

pub use errors::{CssError, PatchError};
pub use index::{FileIndex, SelectorRecord, SkippedFile, StructureIndex};
pub use locator::{FileLocator, LocateError, Location, MatchKind};
pub use patcher::{AppliedAction, AppliedChange, BlockPatcher, PatchOutcome};
pub use scanner::{BlockScanner, BlockSpan, BraceScanner, Declaration, Rule};
pub use validator::{validate_structure, StructureReport};
