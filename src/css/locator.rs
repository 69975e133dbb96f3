//! Resolve a target selector to one stylesheet and line.
//!
//! Scoring is deterministic. Candidates are scored in tenths so ties are
//! exact: equal selector text 10, target contained in the candidate's
//! selector 7, shared class token 5, plus 1 when the candidate lives in a
//! components stylesheet. The highest score wins and ties go to the
//! earliest candidate in scan order.

use crate::css::index::StructureIndex;
use crate::intent::PatchIntent;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Path fragment identifying component stylesheets.
pub const COMPONENTS_MARKER: &str = "components";

const GENERIC_SELECTORS: &[&str] = &["button", "[role=\"button\"]", "[role='button']"];

const EXACT_SCORE: u8 = 10;
const CONTAINS_SCORE: u8 = 7;
const CLASS_OVERLAP_SCORE: u8 = 5;
const COMPONENTS_BONUS: u8 = 1;

const COMPONENTS_FALLBACK_CONFIDENCE: f32 = 0.5;
const FIRST_STYLESHEET_FALLBACK_CONFIDENCE: f32 = 0.4;
const NOT_FOUND_FALLBACK_CONFIDENCE: f32 = 0.3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("no target selector given")]
    EmptySelector,

    #[error("no stylesheet available for selector: {selector}")]
    NotFound { selector: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Contains,
    ClassOverlap,
    ComponentsFallback,
    FirstStylesheetFallback,
    NotFoundFallback,
}

impl MatchKind {
    pub fn is_fallback(self) -> bool {
        matches!(
            self,
            MatchKind::ComponentsFallback
                | MatchKind::FirstStylesheetFallback
                | MatchKind::NotFoundFallback
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub relative_path: PathBuf,
    pub line: usize,
    /// Matched selector text, or the requested selector for fallbacks
    pub selector: String,
    pub confidence: f32,
    pub kind: MatchKind,
}

#[derive(Debug, Clone)]
pub struct FileLocator {
    components_marker: String,
}

impl Default for FileLocator {
    fn default() -> Self {
        Self {
            components_marker: COMPONENTS_MARKER.to_string(),
        }
    }
}

impl FileLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_components_marker(mut self, marker: impl Into<String>) -> Self {
        self.components_marker = marker.into().to_lowercase();
        self
    }

    pub fn locate(&self, selector: &str, index: &StructureIndex) -> Result<Location, LocateError> {
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(LocateError::EmptySelector);
        }

        if is_generic_selector(selector) {
            if let Some(location) = self.generic_fallback(selector, index) {
                debug!(selector, file = %location.relative_path.display(), "generic selector fallback");
                return Ok(location);
            }
        }

        if let Some(location) = self.best_candidate(selector, index) {
            return Ok(location);
        }

        warn!(selector, "selector not found in any stylesheet");
        self.fallback_file(index)
            .map(|path| Location {
                relative_path: path.to_path_buf(),
                line: 1,
                selector: selector.to_string(),
                confidence: NOT_FOUND_FALLBACK_CONFIDENCE,
                kind: MatchKind::NotFoundFallback,
            })
            .ok_or_else(|| LocateError::NotFound {
                selector: selector.to_string(),
            })
    }

    /// Locate the target of an intent: its selector when set, else its
    /// element identifier.
    pub fn locate_for_intent(
        &self,
        intent: &PatchIntent,
        index: &StructureIndex,
    ) -> Result<Location, LocateError> {
        let target = intent.target().ok_or(LocateError::EmptySelector)?;
        self.locate(target, index)
    }

    fn best_candidate(&self, selector: &str, index: &StructureIndex) -> Option<Location> {
        let target_classes = class_tokens(selector);
        let mut best: Option<(u8, MatchKind, &crate::css::index::SelectorRecord)> = None;

        for record in index.records() {
            let candidate = record.selector.trim();
            let (base, kind) = if candidate == selector {
                (EXACT_SCORE, MatchKind::Exact)
            } else if candidate.contains(selector) {
                (CONTAINS_SCORE, MatchKind::Contains)
            } else if !target_classes.is_empty()
                && class_tokens(candidate)
                    .iter()
                    .any(|class| target_classes.contains(class))
            {
                (CLASS_OVERLAP_SCORE, MatchKind::ClassOverlap)
            } else {
                continue;
            };

            let score = if self.is_components_path(&record.file) {
                base + COMPONENTS_BONUS
            } else {
                base
            };

            if best.map_or(true, |(top, _, _)| score > top) {
                best = Some((score, kind, record));
            }
        }

        best.map(|(score, kind, record)| Location {
            relative_path: record.file.clone(),
            line: record.line,
            selector: record.selector.clone(),
            confidence: (f32::from(score) / 10.0).min(1.0),
            kind,
        })
    }

    fn generic_fallback(&self, selector: &str, index: &StructureIndex) -> Option<Location> {
        let (path, confidence, kind) = match self.components_file(index) {
            Some(path) => (
                path,
                COMPONENTS_FALLBACK_CONFIDENCE,
                MatchKind::ComponentsFallback,
            ),
            None => (
                index.stylesheets.first()?.as_path(),
                FIRST_STYLESHEET_FALLBACK_CONFIDENCE,
                MatchKind::FirstStylesheetFallback,
            ),
        };

        Some(Location {
            relative_path: path.to_path_buf(),
            line: 1,
            selector: selector.to_string(),
            confidence,
            kind,
        })
    }

    fn fallback_file<'a>(&self, index: &'a StructureIndex) -> Option<&'a Path> {
        self.components_file(index)
            .or_else(|| index.stylesheets.first().map(PathBuf::as_path))
    }

    fn components_file<'a>(&self, index: &'a StructureIndex) -> Option<&'a Path> {
        index
            .stylesheets
            .iter()
            .map(PathBuf::as_path)
            .find(|path| self.is_components_path(path))
    }

    fn is_components_path(&self, path: &Path) -> bool {
        path.to_string_lossy()
            .to_lowercase()
            .contains(&self.components_marker)
    }
}

/// Selector lists and bare interactive-element selectors have no single
/// home in the index.
pub fn is_generic_selector(selector: &str) -> bool {
    let selector = selector.trim();
    selector.contains(',') || GENERIC_SELECTORS.contains(&selector)
}

fn class_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\.([a-zA-Z0-9_-]+)").unwrap_or_else(|e| panic!("invalid class regex: {e}"))
    })
}

fn class_tokens(selector: &str) -> Vec<&str> {
    class_token_re()
        .captures_iter(selector)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}
