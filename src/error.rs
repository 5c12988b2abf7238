//! Refscope error types.
//!
//! All errors are typed and provide root cause information.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for reference resolution.
#[derive(Error, Debug)]
pub enum RefError {
    /// I/O error during file operations.
    #[error("I/O error for path {path}: {source}")]
    Io {
        /// The file path that caused the I/O error.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Tree-sitter parsing error.
    #[error("Parse error in {file}: {message}")]
    Parse {
        /// The file that failed to parse.
        file: PathBuf,
        /// The parse error message.
        message: String,
    },

    /// Nothing that names a declaration covers the requested offset.
    #[error("cannot find identifier at offset {offset} in {file}")]
    NoIdentifierAtOffset {
        /// The target file.
        file: PathBuf,
        /// The requested byte offset.
        offset: usize,
    },

    /// The identifier at the offset has no determinable type or declaration.
    #[error("identifier '{name}' at {file}:{offset} has no resolvable declaration")]
    UnresolvedIdentifier {
        /// The identifier text.
        name: String,
        /// The target file.
        file: PathBuf,
        /// Byte offset of the identifier.
        offset: usize,
    },

    /// The identifier resolved, but its declaration has a shape we do not model.
    #[error("failed to build search subject: {reason}")]
    SubjectConstructionFailed {
        /// Why construction failed.
        reason: String,
    },

    /// A construct that stops the walk of one syntax tree (dot imports).
    #[error("unsupported construct in {file}: {construct}")]
    UnsupportedConstruct {
        /// The file containing the construct.
        file: PathBuf,
        /// Short description of the construct.
        construct: String,
    },

    /// The scan file set produced no packages.
    #[error("cannot find any packages in given files")]
    NoPackagesFound,

    /// Scanning was requested before a subject was resolved.
    #[error("no search subject has been resolved yet")]
    SubjectNotBuilt,

    /// Invalid file enumeration pattern.
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// JSON encoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// UTF-8 validation error.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Generic error with context.
    #[error("{0}")]
    Other(String),
}

impl RefError {
    /// Wrap an I/O error with the path that caused it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RefError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only affects the subtree it was raised in.
    pub fn is_local(&self) -> bool {
        matches!(self, RefError::UnsupportedConstruct { .. })
    }
}

impl From<std::io::Error> for RefError {
    fn from(err: std::io::Error) -> Self {
        RefError::Io {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

/// Result type alias for refscope operations.
pub type Result<T> = std::result::Result<T, RefError>;
