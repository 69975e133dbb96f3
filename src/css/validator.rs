//! Post-patch structural sanity check.
//!
//! Runs on the whole modified stylesheet before it is written. A failed
//! report makes the applier restore the file from its snapshot.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Result of the post-patch sanity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructureReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

fn rule_shape_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[^{}]+\{[^}]+\}").unwrap_or_else(|e| panic!("invalid rule shape regex: {e}"))
    })
}

/// Conservative structural check of a whole stylesheet.
///
/// Braces must balance by raw count and at least one
/// `selector { declarations }` shape must be present. This guards against
/// the patcher producing garbage; it is not CSS validation.
pub fn validate_structure(text: &str) -> StructureReport {
    let open = text.matches('{').count();
    let close = text.matches('}').count();

    let mut errors = Vec::new();
    if open != close {
        errors.push(format!("unbalanced braces: {open} opened, {close} closed"));
    } else if !rule_shape_re().is_match(text) {
        errors.push("no CSS rule found".to_string());
    }

    StructureReport {
        valid: errors.is_empty(),
        errors,
    }
}
