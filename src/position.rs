//! Source positions and declaration identity.
//!
//! Two parses of the same file produce distinct syntax trees, so a
//! declaration is identified by where it sits in the source: file name
//! plus byte offset. Line and column are carried for display only.

use ropey::Rope;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// A location in a source file.
///
/// Equality and hashing only consider `filename` and `offset`.
#[derive(Debug, Clone, Serialize)]
pub struct SourcePosition {
    /// File containing the position.
    #[serde(rename = "file")]
    pub filename: PathBuf,

    /// Byte offset from the start of the file.
    pub offset: usize,

    /// Line number (1-based).
    pub line: usize,

    /// Column number (1-based, in bytes).
    pub column: usize,
}

impl SourcePosition {
    /// Build a position for `offset`, deriving line and column from `rope`.
    pub fn from_offset(filename: &Path, rope: &Rope, offset: usize) -> Self {
        let offset = offset.min(rope.len_bytes());
        let line_idx = rope.byte_to_line(offset);
        let line_start = rope.line_to_byte(line_idx);

        Self {
            filename: filename.to_path_buf(),
            offset,
            line: line_idx + 1,
            column: offset - line_start + 1,
        }
    }

    /// Whether this position lies in `dir` or one of its subdirectories.
    pub fn is_within(&self, dir: &Path) -> bool {
        self.filename
            .parent()
            .is_some_and(|parent| parent.starts_with(dir))
    }
}

impl PartialEq for SourcePosition {
    fn eq(&self, other: &Self) -> bool {
        self.filename == other.filename && self.offset == other.offset
    }
}

impl Eq for SourcePosition {}

impl Hash for SourcePosition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.filename.hash(state);
        self.offset.hash(state);
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename.display(), self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_and_column_are_one_based() {
        let rope = Rope::from_str("package a\n\nvar x = 1\n");
        let pos = SourcePosition::from_offset(Path::new("/src/a.go"), &rope, 15);
        assert_eq!(pos.line, 3);
        assert_eq!(pos.column, 5);
        assert_eq!(pos.to_string(), "/src/a.go:3:5");
    }

    #[test]
    fn test_equality_ignores_line_and_column() {
        let a = SourcePosition {
            filename: PathBuf::from("/src/a.go"),
            offset: 10,
            line: 1,
            column: 11,
        };
        let mut b = a.clone();
        b.line = 99;
        b.column = 1;
        assert_eq!(a, b);

        b.offset = 11;
        assert_ne!(a, b);
    }

    #[test]
    fn test_is_within_checks_directory_prefix() {
        let rope = Rope::from_str("package a\n");
        let pos = SourcePosition::from_offset(Path::new("/src/pkg/a/a.go"), &rope, 0);
        assert!(pos.is_within(Path::new("/src/pkg")));
        assert!(pos.is_within(Path::new("/src/pkg/a")));
        assert!(!pos.is_within(Path::new("/src/other")));
    }
}
