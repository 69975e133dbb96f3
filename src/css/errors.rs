use crate::edit::EditError;
use thiserror::Error;

/// Structural problems found while scanning a stylesheet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CssError {
    #[error("block for '{selector}' at line {line} is never closed")]
    Unterminated { selector: String, line: usize },

    #[error("block for '{selector}' at line {line} nests {depth} levels deep (max {max})")]
    NestingTooDeep {
        selector: String,
        line: usize,
        depth: usize,
        max: usize,
    },
}

impl CssError {
    pub fn selector(&self) -> &str {
        match self {
            CssError::Unterminated { selector, .. } | CssError::NestingTooDeep { selector, .. } => {
                selector
            }
        }
    }
}

/// Errors reported by the block patcher.
///
/// Selector resolution and scan failures are blocking: nothing is patched.
/// Property-level errors only skip the offending change.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("selector not found: {selector}")]
    SelectorNotFound { selector: String },

    #[error("generic selector not found in file: {selector}")]
    GenericSelectorNotFound { selector: String },

    #[error(transparent)]
    Scan(#[from] CssError),

    #[error("block splice failed: {0}")]
    Edit(#[from] EditError),

    #[error("property not specified")]
    EmptyProperty,

    #[error("no value given for property: {property}")]
    EmptyValue { property: String },

    #[error("property already exists: {property}")]
    PropertyExists { property: String },

    #[error("property not found: {property}")]
    PropertyNotFound { property: String },
}

impl PatchError {
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            PatchError::SelectorNotFound { .. }
                | PatchError::GenericSelectorNotFound { .. }
                | PatchError::Scan(_)
                | PatchError::Edit(_)
        )
    }
}
