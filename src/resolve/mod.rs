//! Reference resolution.
//!
//! A search session ([`ResolutionContext`]) turns a file offset into a
//! [`Subject`], then walks syntax trees with a [`Walker`] and reports every
//! [`Occurrence`] the subject matches.

pub mod context;
pub mod subject;
pub mod walker;

pub use context::{locate, Reporter, ResolutionContext, SearchRequest, SearchScope, State};
pub use subject::{MemberSubject, NameSubject, Subject};
pub use walker::{DotImports, Occurrence, Walker};

use crate::analysis::SourceProvider;
use crate::error::Result;
use crate::position::SourcePosition;
use std::path::PathBuf;

/// Find all references for one request over a file set.
///
/// Positions come back in report order: a member subject's declaration
/// first (when inside the search root), then matches in walk order, file
/// by file in the order of `files`.
pub fn find_references<P: SourceProvider + ?Sized>(
    provider: &P,
    request: SearchRequest,
    files: &[PathBuf],
) -> Result<Vec<SourcePosition>> {
    let mut found = Vec::new();
    let mut context = ResolutionContext::new(provider, request);
    context.run(files, &mut |position: &SourcePosition| {
        found.push(position.clone())
    })?;
    Ok(found)
}
