//! Refscope: find every reference to a Go declaration.
//!
//! Given a file, a byte offset naming an identifier and a set of files to
//! search, refscope resolves the identifier to its declaration and reports
//! each place the same entity is referenced. Identity is semantic: two
//! locals with the same name, or two methods of the same name on
//! different receivers, are told apart.

#![warn(missing_docs)]
// env_logger is used by src/main.rs (binary), not this library
#![expect(unused_crate_dependencies)]

pub mod analysis;
pub mod cli;
pub mod error;
pub mod position;
pub mod resolve;
pub mod syntax;

/// Re-export common error types for convenience.
pub use error::{RefError, Result};

/// Re-export the main entry points.
pub use analysis::{Analyzer, AnalyzerConfig, SourceProvider};
pub use position::SourcePosition;
pub use resolve::{find_references, ResolutionContext, SearchRequest, Subject};

/// Refscope version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
