//! Per-call structural index of a project's stylesheets.
//!
//! Nothing here is cached: every locate, preview or apply builds a fresh
//! index so decisions are always made against the bytes currently on disk.

use crate::config::ProjectTarget;
use crate::css::scanner::{BlockScanner, BlockSpan, BraceScanner};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// One top-level rule as found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorRecord {
    pub selector: String,
    /// Root-relative path of the containing stylesheet
    pub file: PathBuf,
    pub line: usize,
    pub block: BlockSpan,
    /// Declared property names, in block order
    pub properties: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileIndex {
    pub path: PathBuf,
    pub selectors: Vec<SelectorRecord>,
    pub imports: Vec<String>,
    /// Custom property names (`--name`) declared anywhere in the file
    pub custom_properties: Vec<String>,
    pub line_count: usize,
}

impl FileIndex {
    /// Index one stylesheet's text.
    pub fn scan(path: impl Into<PathBuf>, text: &str, scanner: &dyn BlockScanner) -> Self {
        let path = path.into();
        let mut selectors = Vec::new();
        let mut custom_properties: Vec<String> = Vec::new();

        for scanned in scanner.rules(text) {
            let rule = match scanned {
                Ok(rule) => rule,
                Err(err) => {
                    warn!(file = %path.display(), "skipping rule: {err}");
                    continue;
                }
            };

            let properties: Vec<String> = scanner
                .declarations(rule.block.slice(text))
                .into_iter()
                .map(|decl| decl.name)
                .collect();

            for name in properties.iter().filter(|n| n.starts_with("--")) {
                if !custom_properties.contains(name) {
                    custom_properties.push(name.clone());
                }
            }

            selectors.push(SelectorRecord {
                selector: rule.selector,
                file: path.clone(),
                line: rule.line,
                block: rule.block,
                properties,
            });
        }

        Self {
            imports: extract_imports(text),
            line_count: text.lines().count(),
            path,
            selectors,
            custom_properties,
        }
    }
}

/// A file that could not be indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StructureIndex {
    /// Stylesheets in declared order, including ones that failed to index
    pub stylesheets: Vec<PathBuf>,
    pub files: Vec<FileIndex>,
    pub components: Vec<PathBuf>,
    pub skipped: Vec<SkippedFile>,
}

impl StructureIndex {
    pub fn build(target: &ProjectTarget) -> Self {
        Self::build_with(target, &BraceScanner)
    }

    /// Scan every configured stylesheet. Unreadable files are logged and
    /// skipped; a partial index is a valid result.
    pub fn build_with(target: &ProjectTarget, scanner: &dyn BlockScanner) -> Self {
        let stylesheets = target.stylesheet_files();
        let mut files = Vec::with_capacity(stylesheets.len());
        let mut skipped = Vec::new();

        for relative in &stylesheets {
            let text = target
                .resolve_file(relative)
                .map_err(|e| e.to_string())
                .and_then(|path| fs::read_to_string(path).map_err(|e| e.to_string()));
            match text {
                Ok(text) => files.push(FileIndex::scan(relative.clone(), &text, scanner)),
                Err(reason) => {
                    warn!(file = %relative.display(), "skipping stylesheet: {reason}");
                    skipped.push(SkippedFile {
                        path: relative.clone(),
                        reason,
                    });
                }
            }
        }

        debug!(
            project = target.id(),
            files = files.len(),
            skipped = skipped.len(),
            "built structure index"
        );

        Self {
            stylesheets,
            files,
            components: target.component_files(),
            skipped,
        }
    }

    /// Index in-memory sources, in the given order.
    pub fn from_sources<I, P, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = (P, S)>,
        P: Into<PathBuf>,
        S: AsRef<str>,
    {
        let files: Vec<FileIndex> = sources
            .into_iter()
            .map(|(path, text)| FileIndex::scan(path, text.as_ref(), &BraceScanner))
            .collect();
        Self {
            stylesheets: files.iter().map(|f| f.path.clone()).collect(),
            files,
            ..Self::default()
        }
    }

    /// Every selector record, files in declared order, rules in file order.
    pub fn records(&self) -> impl Iterator<Item = &SelectorRecord> {
        self.files.iter().flat_map(|file| file.selectors.iter())
    }

    pub fn file(&self, path: &std::path::Path) -> Option<&FileIndex> {
        self.files.iter().find(|file| file.path == path)
    }

    pub fn selector_count(&self) -> usize {
        self.files.iter().map(|file| file.selectors.len()).sum()
    }
}

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)@import\s+(?:url\(\s*)?["']?([^"')\s;]+)"#)
            .unwrap_or_else(|e| panic!("invalid import regex: {e}"))
    })
}

fn extract_imports(text: &str) -> Vec<String> {
    import_re()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
