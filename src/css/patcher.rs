//! Property-level edits inside one declaration block.
//!
//! The patcher never rewrites a block wholesale: each change becomes a
//! verified byte-span [`Edit`] against the block text, and the block is
//! spliced back into the file the same way. Bytes outside the touched
//! declarations are preserved exactly.

use crate::css::errors::PatchError;
use crate::css::locator::is_generic_selector;
use crate::css::scanner::{selector_members, BlockScanner, BraceScanner, Declaration, Rule};
use crate::edit::Edit;
use crate::intent::{ChangeAction, PropertyChange};
use serde::Serialize;
use tracing::debug;

/// Interactive-element selectors tried, in order, when the target is generic.
const GENERIC_PATTERNS: &[&str] = &[
    ".btn-base",
    ".btn-primary",
    ".btn-secondary",
    "button",
    "[role=\"button\"]",
    "[role='button']",
];

const DEFAULT_INDENT: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppliedAction {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedChange {
    pub property: String,
    pub action: AppliedAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

impl AppliedChange {
    fn added(property: &str, value: &str) -> Self {
        Self {
            property: property.to_string(),
            action: AppliedAction::Added,
            old_value: None,
            new_value: Some(value.to_string()),
        }
    }
}

#[derive(Debug)]
pub struct PatchOutcome {
    pub modified_text: String,
    /// The selector whose block was patched, after generic resolution
    pub selector: Option<String>,
    pub line: Option<usize>,
    pub changes_applied: Vec<AppliedChange>,
    pub errors: Vec<PatchError>,
}

impl PatchOutcome {
    fn unchanged(text: &str, error: PatchError) -> Self {
        Self {
            modified_text: text.to_string(),
            selector: None,
            line: None,
            changes_applied: Vec::new(),
            errors: vec![error],
        }
    }

    /// True when nothing could be patched at all.
    pub fn is_blocked(&self) -> bool {
        self.errors.iter().any(PatchError::is_blocking)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockPatcher<S = BraceScanner> {
    scanner: S,
}

impl BlockPatcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: BlockScanner> BlockPatcher<S> {
    pub fn with_scanner(scanner: S) -> Self {
        Self { scanner }
    }

    /// Apply `changes` to the block of `selector` in `text`.
    ///
    /// Changes are attempted in order and independently; a failed item is
    /// recorded in `errors` and the rest still run. If the block itself
    /// cannot be found the text is returned unchanged.
    pub fn patch(&self, text: &str, selector: &str, changes: &[PropertyChange]) -> PatchOutcome {
        let selector = selector.trim();
        let resolved = if is_generic_selector(selector) {
            match self.resolve_generic(text) {
                Some(resolved) => {
                    debug!(requested = selector, resolved = %resolved, "resolved generic selector");
                    resolved
                }
                None => {
                    return PatchOutcome::unchanged(
                        text,
                        PatchError::GenericSelectorNotFound {
                            selector: selector.to_string(),
                        },
                    )
                }
            }
        } else {
            selector.to_string()
        };

        let rule = match self.scanner.find_block_span(text, &resolved) {
            Ok(Some(rule)) => rule,
            Ok(None) => {
                return PatchOutcome::unchanged(
                    text,
                    PatchError::SelectorNotFound { selector: resolved },
                )
            }
            Err(err) => return PatchOutcome::unchanged(text, err.into()),
        };

        let original_block = rule.block.slice(text);
        let mut block = original_block.to_string();
        let mut changes_applied = Vec::new();
        let mut errors = Vec::new();

        for change in changes {
            match self.apply_change(&mut block, change) {
                Ok(applied) => changes_applied.push(applied),
                Err(err) => {
                    debug!(selector = %rule.selector, "change skipped: {err}");
                    errors.push(err);
                }
            }
        }

        let mut modified_text = text.to_string();
        let splice = Edit::new(rule.block.start, rule.block.end, block, original_block);
        if let Err(err) = splice.apply_to(&mut modified_text) {
            return PatchOutcome::unchanged(text, err.into());
        }

        let Rule { selector, line, .. } = rule;
        PatchOutcome {
            modified_text,
            selector: Some(selector),
            line: Some(line),
            changes_applied,
            errors,
        }
    }

    /// First rule matching the generic patterns, patterns tried in order.
    fn resolve_generic(&self, text: &str) -> Option<String> {
        let rules: Vec<Rule> = self.scanner.rules(text).into_iter().flatten().collect();
        GENERIC_PATTERNS.iter().find_map(|pattern| {
            rules
                .iter()
                .find(|rule| {
                    selector_members(&rule.selector)
                        .iter()
                        .any(|member| member_ends_with(member, pattern))
                })
                .map(|rule| rule.selector.clone())
        })
    }

    fn apply_change(
        &self,
        block: &mut String,
        change: &PropertyChange,
    ) -> Result<AppliedChange, PatchError> {
        let property = change.property.trim();
        let value = change.value.trim();
        if property.is_empty() {
            return Err(PatchError::EmptyProperty);
        }
        if change.action != ChangeAction::Remove && value.is_empty() {
            return Err(PatchError::EmptyValue {
                property: property.to_string(),
            });
        }

        let declarations = self.scanner.declarations(block);
        let existing = declarations.iter().find(|decl| decl.name == property);

        match (change.action, existing) {
            (ChangeAction::Modify, Some(decl)) => {
                let old_value = decl.value.clone();
                splice(
                    block,
                    Edit::new(decl.value_start, decl.value_end, value, &decl.value),
                )?;
                Ok(AppliedChange {
                    property: property.to_string(),
                    action: AppliedAction::Modified,
                    old_value: Some(old_value),
                    new_value: Some(value.to_string()),
                })
            }
            (ChangeAction::Modify | ChangeAction::Add, None) => {
                append_declaration(block, &declarations, property, value)?;
                Ok(AppliedChange::added(property, value))
            }
            (ChangeAction::Add, Some(_)) => Err(PatchError::PropertyExists {
                property: property.to_string(),
            }),
            (ChangeAction::Remove, Some(decl)) => {
                let (start, end) = removal_span(block, decl);
                let removed = block[start..end].to_string();
                splice(block, Edit::new(start, end, "", removed))?;
                Ok(AppliedChange {
                    property: property.to_string(),
                    action: AppliedAction::Removed,
                    old_value: Some(decl.value.clone()),
                    new_value: None,
                })
            }
            (ChangeAction::Remove, None) => Err(PatchError::PropertyNotFound {
                property: property.to_string(),
            }),
        }
    }
}

fn splice(block: &mut String, edit: Edit) -> Result<(), PatchError> {
    edit.apply_to(block).map(|_| ())?;
    Ok(())
}

fn member_ends_with(member: &str, pattern: &str) -> bool {
    let Some(prefix) = member.strip_suffix(pattern) else {
        return false;
    };
    if pattern.starts_with(['.', '[']) {
        return true;
    }
    // Element patterns need a boundary: `button` but not `.icon-button`.
    !prefix
        .chars()
        .last()
        .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '#'))
}

/// Append `property: value;` after the last non-blank byte of the block,
/// indented like the existing declarations.
fn append_declaration(
    block: &mut String,
    declarations: &[Declaration],
    property: &str,
    value: &str,
) -> Result<(), PatchError> {
    let body_end = block.trim_end().len();
    if body_end == 0 {
        let len = block.len();
        let replacement = format!("\n{DEFAULT_INDENT}{property}: {value};\n");
        let current = block.clone();
        return splice(block, Edit::new(0, len, replacement, current));
    }

    let separator = match declarations.last() {
        Some(last) if !last.terminated => ";",
        _ => "",
    };

    let insertion = if block.contains('\n') {
        let indent = declarations
            .iter()
            .rev()
            .find_map(|decl| line_indent(block, decl.start))
            .unwrap_or(DEFAULT_INDENT);
        format!("{separator}\n{indent}{property}: {value};")
    } else {
        format!("{separator} {property}: {value};")
    };

    splice(block, Edit::insert(body_end, insertion))
}

/// Leading whitespace of the line containing `at`, when nothing but
/// whitespace precedes `at` on that line.
fn line_indent(block: &str, at: usize) -> Option<&str> {
    let line_start = block[..at].rfind('\n')? + 1;
    let indent = &block[line_start..at];
    indent
        .chars()
        .all(|c| c == ' ' || c == '\t')
        .then_some(indent)
}

/// Byte range to delete for `decl`.
///
/// A declaration alone on its line loses the whole line: indentation, the
/// declaration, trailing blanks and one line break. Otherwise only the
/// declaration and the blanks before it go.
fn removal_span(block: &str, decl: &Declaration) -> (usize, usize) {
    let rest = &block[decl.end..];
    let trailing = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    let after = decl.end + trailing;

    if line_indent(block, decl.start).is_some() {
        let line_start = block[..decl.start].rfind('\n').map_or(0, |i| i + 1);
        let tail = &block[after..];
        if tail.starts_with("\r\n") {
            return (line_start, after + 2);
        }
        if tail.starts_with('\n') {
            return (line_start, after + 1);
        }
        if tail.is_empty() {
            let mut start = line_start - 1;
            if start > 0 && block.as_bytes()[start - 1] == b'\r' {
                start -= 1;
            }
            return (start, after);
        }
    }

    let before = &block[..decl.start];
    let leading = before.len() - before.trim_end_matches([' ', '\t']).len();
    (decl.start - leading, decl.end)
}
