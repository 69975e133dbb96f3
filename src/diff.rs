//! Line-based unified diffs for previews.
//!
//! Purely textual: reordering declarations shows up as changed lines even
//! when the stylesheet means the same thing.

use serde::Serialize;
use similar::{ChangeTag, TextDiff};

const CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Header,
    Added,
    Removed,
    Context,
}

/// One display line of a unified diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    /// 1-based position in the diff output
    pub line: usize,
    #[serde(rename = "type")]
    pub kind: DiffKind,
    /// Line text without its `+`/`-`/` ` marker
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub unified: String,
    pub added_lines: usize,
    pub removed_lines: usize,
    pub lines: Vec<DiffLine>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.added_lines == 0 && self.removed_lines == 0
    }
}

/// Diff `original` against `modified`, labelling both sides with
/// `display_path` (`a/<path>`, `b/<path>`).
///
/// Counts and classification come from the diff operations themselves, not
/// from re-reading the text, so content lines that happen to start with
/// `---` or `+++` are still counted.
pub fn diff(original: &str, modified: &str, display_path: &str) -> DiffResult {
    let text_diff = TextDiff::from_lines(original, modified);
    let old_header = format!("a/{display_path}");
    let new_header = format!("b/{display_path}");

    let mut unified_diff = text_diff.unified_diff();
    unified_diff
        .context_radius(CONTEXT_LINES)
        .header(&old_header, &new_header);
    let unified = unified_diff.to_string();

    let mut lines = DiffLines::default();
    let mut added_lines = 0;
    let mut removed_lines = 0;

    for (i, hunk) in unified_diff.iter_hunks().enumerate() {
        if i == 0 {
            lines.push(DiffKind::Header, format!("--- {old_header}"));
            lines.push(DiffKind::Header, format!("+++ {new_header}"));
        }
        lines.push(DiffKind::Header, hunk.header().to_string());

        for change in hunk.iter_changes() {
            let kind = match change.tag() {
                ChangeTag::Insert => {
                    added_lines += 1;
                    DiffKind::Added
                }
                ChangeTag::Delete => {
                    removed_lines += 1;
                    DiffKind::Removed
                }
                ChangeTag::Equal => DiffKind::Context,
            };
            let content = change.value().trim_end_matches(['\n', '\r']).to_string();
            lines.push(kind, content);
        }
    }

    DiffResult {
        unified,
        added_lines,
        removed_lines,
        lines: lines.0,
    }
}

#[derive(Default)]
struct DiffLines(Vec<DiffLine>);

impl DiffLines {
    fn push(&mut self, kind: DiffKind, content: String) {
        let line = self.0.len() + 1;
        self.0.push(DiffLine {
            line,
            kind,
            content,
        });
    }
}
