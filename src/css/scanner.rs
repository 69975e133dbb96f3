//! Brace-level stylesheet scanning.
//!
//! This is deliberately not a CSS parser. It understands exactly four things:
//! comments, quoted strings, braces and semicolons. That is enough to find
//! top-level rules, the byte span of their declaration blocks and the
//! `name: value;` declarations inside them, while leaving every other byte
//! of the file alone.
//!
//! Limits:
//! - at-rule blocks (`@media`, `@supports`, ...) are skipped whole; rules
//!   inside them are not reported
//! - a declaration block may contain one level of inner blocks (a nested
//!   rule); deeper nesting is reported as [`CssError::NestingTooDeep`]
//!
//! Callers go through [`BlockScanner`] so a real tokenizer can replace
//! [`BraceScanner`] without touching the index or the patcher.

use crate::css::errors::CssError;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Maximum brace depth of a rule: its own block plus one inner level.
pub const MAX_NESTING: usize = 2;

/// Byte span of a declaration block's contents, between its braces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockSpan {
    /// First byte after `{`
    pub start: usize,
    /// Byte offset of the closing `}`
    pub end: usize,
}

impl BlockSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// A top-level rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Selector text as written, comments removed and ends trimmed
    pub selector: String,
    pub selector_start: usize,
    /// 1-based line of the selector's first character
    pub line: usize,
    pub block: BlockSpan,
}

pub type ScannedRule = Result<Rule, CssError>;

/// A `name: value;` declaration. Offsets are relative to the scanned block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
    /// Offset of the first byte of the name
    pub start: usize,
    pub value_start: usize,
    pub value_end: usize,
    /// Offset just past the `;`, or `value_end` when unterminated
    pub end: usize,
    pub terminated: bool,
}

pub trait BlockScanner {
    /// Every top-level rule in source order. Scanning stops at the first
    /// unterminated block.
    fn rules(&self, text: &str) -> Vec<ScannedRule>;

    /// Declarations directly inside `block`; inner blocks are skipped.
    fn declarations(&self, block: &str) -> Vec<Declaration>;

    /// Find the block of `selector`.
    ///
    /// A rule whose whole selector matches wins; otherwise the first rule
    /// listing `selector` as one member of a selector list. Comparison is
    /// whitespace-insensitive.
    fn find_block_span(&self, text: &str, selector: &str) -> Result<Option<Rule>, CssError> {
        let wanted = normalize_selector(selector);
        if wanted.is_empty() {
            return Ok(None);
        }

        let mut member_match = None;
        for scanned in self.rules(text) {
            let candidate = match &scanned {
                Ok(rule) => rule.selector.as_str(),
                Err(err) => err.selector(),
            };
            let normalized = normalize_selector(candidate);
            if normalized == wanted {
                return scanned.map(Some);
            }
            if member_match.is_none()
                && selector_members(&normalized)
                    .iter()
                    .any(|member| *member == wanted)
            {
                member_match = Some(scanned);
            }
        }

        member_match.transpose()
    }
}

/// The default [`BlockScanner`]: a single-pass brace counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct BraceScanner;

impl BlockScanner for BraceScanner {
    fn rules(&self, text: &str) -> Vec<ScannedRule> {
        let bytes = text.as_bytes();
        let mut rules = Vec::new();
        let mut i = 0;
        let mut prelude_start = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = skip_comment(bytes, i);
                    continue;
                }
                b'"' | b'\'' => {
                    i = skip_string(bytes, i);
                    continue;
                }
                b';' | b'}' => prelude_start = i + 1,
                b'{' => {
                    let prelude = &text[prelude_start..i];
                    let selector = strip_comments(prelude).trim().to_string();
                    let selector_start = prelude_start + leading_trivia_len(prelude);
                    let line = line_at(text, selector_start);
                    let is_rule = !selector.is_empty() && !selector.starts_with('@');

                    let Some((close, depth)) = match_brace(bytes, i) else {
                        if is_rule {
                            rules.push(Err(CssError::Unterminated { selector, line }));
                        }
                        break;
                    };

                    if is_rule {
                        if depth > MAX_NESTING {
                            rules.push(Err(CssError::NestingTooDeep {
                                selector,
                                line,
                                depth,
                                max: MAX_NESTING,
                            }));
                        } else {
                            rules.push(Ok(Rule {
                                selector,
                                selector_start,
                                line,
                                block: BlockSpan {
                                    start: i + 1,
                                    end: close,
                                },
                            }));
                        }
                    }

                    i = close + 1;
                    prelude_start = i;
                    continue;
                }
                _ => {}
            }
            i += 1;
        }

        rules
    }

    fn declarations(&self, block: &str) -> Vec<Declaration> {
        let bytes = block.as_bytes();
        let mut declarations = Vec::new();
        let mut i = 0;
        let mut segment_start = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = skip_comment(bytes, i);
                    continue;
                }
                b'"' | b'\'' => {
                    i = skip_string(bytes, i);
                    continue;
                }
                b'{' => match match_brace(bytes, i) {
                    Some((close, _)) => {
                        i = close + 1;
                        segment_start = i;
                        continue;
                    }
                    None => {
                        segment_start = bytes.len();
                        break;
                    }
                },
                b'}' => segment_start = i + 1,
                b';' => {
                    declarations.extend(parse_declaration(block, segment_start, i, true));
                    segment_start = i + 1;
                }
                _ => {}
            }
            i += 1;
        }

        if segment_start < bytes.len() {
            declarations.extend(parse_declaration(block, segment_start, bytes.len(), false));
        }

        declarations
    }
}

fn property_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:--[A-Za-z0-9_-]+|-?[A-Za-z_][A-Za-z0-9_-]*)$")
            .unwrap_or_else(|e| panic!("invalid property name regex: {e}"))
    })
}

fn parse_declaration(block: &str, from: usize, to: usize, terminated: bool) -> Option<Declaration> {
    let segment = &block[from..to];
    let lead = leading_trivia_len(segment);
    let body = &segment[lead..];
    let colon = body.find(':')?;
    let name = body[..colon].trim_end();
    if !property_name_re().is_match(name) {
        return None;
    }

    let after = &body[colon + 1..];
    let value = after.trim();
    let value_lead = after.len() - after.trim_start().len();

    let start = from + lead;
    let value_start = start + colon + 1 + value_lead;
    let value_end = value_start + value.len();

    Some(Declaration {
        name: name.to_string(),
        value: value.to_string(),
        start,
        value_start,
        value_end,
        end: if terminated { to + 1 } else { value_end },
        terminated,
    })
}

/// Index just past the comment starting at `i`, or the end of input.
fn skip_comment(bytes: &[u8], i: usize) -> usize {
    let mut j = i + 2;
    while j + 1 < bytes.len() {
        if bytes[j] == b'*' && bytes[j + 1] == b'/' {
            return j + 2;
        }
        j += 1;
    }
    bytes.len()
}

/// Index just past the string starting at `i`. Unclosed strings end at the
/// line break, as in CSS.
fn skip_string(bytes: &[u8], i: usize) -> usize {
    let quote = bytes[i];
    let mut j = i + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'\n' => return j,
            b if b == quote => return j + 1,
            _ => j += 1,
        }
    }
    bytes.len()
}

/// Closing brace matching the `{` at `open`, with the deepest nesting seen.
fn match_brace(bytes: &[u8], open: usize) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut max_depth = 0usize;
    let mut i = open;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_comment(bytes, i);
                continue;
            }
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'{' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((i, max_depth));
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Length of leading whitespace and comments.
fn leading_trivia_len(s: &str) -> usize {
    let mut rest = s;
    loop {
        let trimmed = rest.trim_start();
        if let Some(after) = trimmed.strip_prefix("/*") {
            rest = match after.find("*/") {
                Some(end) => &after[end + 2..],
                None => "",
            };
        } else {
            rest = trimmed;
            break;
        }
    }
    s.len() - rest.len()
}

fn strip_comments(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        rest = match rest[start + 2..].find("*/") {
            Some(end) => &rest[start + 2 + end + 2..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

/// 1-based line number of `offset`.
pub fn line_at(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset.min(text.len())]
        .iter()
        .filter(|b| **b == b'\n')
        .count()
        + 1
}

/// Members of a selector list, split on top-level commas.
pub fn selector_members(selector: &str) -> Vec<&str> {
    let mut members = Vec::new();
    let mut depth = 0i32;
    let mut quote = None;
    let mut start = 0;

    for (i, c) in selector.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth -= 1,
            (None, ',') if depth == 0 => {
                members.push(selector[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    members.push(selector[start..].trim());
    members.retain(|m| !m.is_empty());
    members
}

/// Whitespace-insensitive form of a selector, used only for comparison.
pub fn normalize_selector(selector: &str) -> String {
    selector_members(selector)
        .iter()
        .map(|member| member.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(", ")
}
