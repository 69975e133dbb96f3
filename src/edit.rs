use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The fundamental edit primitive: byte-span replacement with verification.
///
/// Every property-level change the block patcher makes, and the final
/// substitution of a rewritten declaration block into its file, compiles down
/// to this primitive. Intelligence lives in span acquisition (the brace
/// scanner), not in application.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Edit does nothing until applied"]
pub struct Edit {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
    /// New text to insert at [byte_start, byte_end)
    pub new_text: String,
    /// Verification of what we expect to find before applying
    pub expected_before: EditVerification,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Before-text verification failed at byte {byte_start}")]
    BeforeTextMismatch {
        byte_start: usize,
        byte_end: usize,
        expected: String,
        found: String,
    },

    #[error("Invalid byte range: [{byte_start}, {byte_end}) in text of length {len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        len: usize,
    },

    #[error("Byte offset {0} is not on a UTF-8 character boundary")]
    NotCharBoundary(usize),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of applying an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "EditResult should be checked for success/already-applied"]
pub enum EditResult {
    /// Edit was applied
    Applied { bytes_changed: usize },
    /// Span already held the new text
    AlreadyApplied,
}

impl Edit {
    /// Create a new edit with automatic verification generation.
    pub fn new(
        byte_start: usize,
        byte_end: usize,
        new_text: impl Into<String>,
        expected_before: impl AsRef<str>,
    ) -> Self {
        Self {
            byte_start,
            byte_end,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before.as_ref()),
        }
    }

    /// Pure insertion at `at`.
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::new(at, at, text, "")
    }

    /// Validate the edit against `content`, returning the current span text.
    fn validate<'a>(&self, content: &'a str) -> Result<&'a str, EditError> {
        if self.byte_start > self.byte_end || self.byte_end > content.len() {
            return Err(EditError::InvalidByteRange {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                len: content.len(),
            });
        }
        for offset in [self.byte_start, self.byte_end] {
            if !content.is_char_boundary(offset) {
                return Err(EditError::NotCharBoundary(offset));
            }
        }

        let current = &content[self.byte_start..self.byte_end];
        if current == self.new_text {
            return Ok(current);
        }

        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                byte_start: self.byte_start,
                byte_end: self.byte_end,
                expected: format!("{:?}", self.expected_before),
                found: current.to_string(),
            });
        }

        Ok(current)
    }

    /// Apply this edit to an in-memory buffer.
    pub fn apply_to(&self, content: &mut String) -> Result<EditResult, EditError> {
        let current = self.validate(content)?;
        if current == self.new_text {
            return Ok(EditResult::AlreadyApplied);
        }

        content.replace_range(self.byte_start..self.byte_end, &self.new_text);
        Ok(EditResult::Applied {
            bytes_changed: self.new_text.len(),
        })
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write lands or the destination is left as it was. The
/// permissions of an existing destination are carried over to the new file.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    let parent = path.parent().ok_or_else(|| {
        EditError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())?;
    }

    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_verification_exact_match() {
        let verify = EditVerification::ExactMatch("color: red".to_string());
        assert!(verify.matches("color: red"));
        assert!(!verify.matches("color: blue"));
    }

    #[test]
    fn test_edit_verification_from_text_large() {
        let text = "a".repeat(2000);
        let verify = EditVerification::from_text(&text);
        assert!(matches!(verify, EditVerification::Hash(_)));
        assert!(verify.matches(&text));
    }

    #[test]
    fn test_apply_to_replaces_span() {
        let mut content = String::from("color: red;");
        let edit = Edit::new(7, 10, "blue", "red");
        let result = edit.apply_to(&mut content).unwrap();
        assert_eq!(result, EditResult::Applied { bytes_changed: 4 });
        assert_eq!(content, "color: blue;");
    }

    #[test]
    fn test_apply_to_already_applied() {
        let mut content = String::from("color: blue;");
        let edit = Edit::new(7, 11, "blue", "red");
        assert_eq!(edit.apply_to(&mut content).unwrap(), EditResult::AlreadyApplied);
        assert_eq!(content, "color: blue;");
    }

    #[test]
    fn test_apply_to_mismatch() {
        let mut content = String::from("color: green;");
        let edit = Edit::new(7, 10, "blue", "red");
        let result = edit.apply_to(&mut content);
        assert!(matches!(result, Err(EditError::BeforeTextMismatch { .. })));
        assert_eq!(content, "color: green;");
    }

    #[test]
    fn test_invalid_range() {
        let mut content = String::from("abc");
        let edit = Edit::new(2, 10, "x", "");
        assert!(matches!(
            edit.apply_to(&mut content),
            Err(EditError::InvalidByteRange { .. })
        ));

        let inverted = Edit::new(2, 1, "x", "");
        assert!(matches!(
            inverted.apply_to(&mut content),
            Err(EditError::InvalidByteRange { .. })
        ));
    }

    #[test]
    fn test_insert_not_on_char_boundary() {
        let mut content = String::from("content: \"é\";");
        let edit = Edit::insert(11, "x");
        assert!(matches!(
            edit.apply_to(&mut content),
            Err(EditError::NotCharBoundary(11))
        ));
    }

    #[test]
    fn test_atomic_write_replaces_content() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("site.css");
        fs::write(&file_path, b".a { color: red; }").unwrap();

        atomic_write(&file_path, b".a { color: blue; }").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), ".a { color: blue; }");
    }

    #[test]
    #[cfg(unix)]
    fn test_atomic_write_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("site.css");
        fs::write(&file_path, b"x").unwrap();
        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o644)).unwrap();

        atomic_write(&file_path, b"y").unwrap();

        let mode = fs::metadata(&file_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
