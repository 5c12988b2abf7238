//! Resolution context: one search session from a file offset to reported
//! occurrences.
//!
//! The session moves through [`State`]s in order. [`ResolutionContext::resolve`]
//! parses the target file, assembles its local package, locates the
//! occurrence under the offset, builds and finalizes the [`Subject`] and
//! picks the search scope. [`ResolutionContext::scan`] then walks either the
//! single function the subject is local to, or every file of the supplied
//! file set, and reports each match.

use crate::analysis::{DeclShape, Declaration, LocalPackage, ResolvedType, SourceProvider};
use crate::error::{RefError, Result};
use crate::position::SourcePosition;
use crate::resolve::subject::{MemberSubject, NameSubject, Subject};
use crate::resolve::walker::{Occurrence, Walker};
use crate::syntax::{enclosing_function, NodeRef, ParsedFile};
use std::path::PathBuf;
use std::rc::Rc;
use tree_sitter::Node;

/// Receives confirmed matches, in walk order.
pub trait Reporter {
    /// Record one match.
    fn report(&mut self, position: &SourcePosition);
}

impl<F> Reporter for F
where
    F: FnMut(&SourcePosition),
{
    fn report(&mut self, position: &SourcePosition) {
        self(position)
    }
}

/// What to search for and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// File containing the identifier to resolve.
    pub file: PathBuf,
    /// Byte offset of the identifier in `file`.
    pub offset: usize,
    /// Directory searched; a member's own declaration is reported only when
    /// it lies inside.
    pub search_root: PathBuf,
}

/// Session progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing done yet.
    Unresolved,
    /// Subject built and finalized.
    SubjectBuilt,
    /// Search scope chosen.
    ScopeDetermined,
    /// Walking.
    Scanning,
    /// Every match reported.
    Done,
    /// Stopped by a fatal error.
    Failed,
}

/// Where occurrences are looked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Only the function of the target file the subject is declared in.
    Function(NodeRef),
    /// Every file of the file set.
    Files,
}

/// One search session.
pub struct ResolutionContext<'p, P: SourceProvider + ?Sized> {
    provider: &'p P,
    request: SearchRequest,
    state: State,
    target: Option<Rc<ParsedFile>>,
    subject: Option<Subject>,
    scope: SearchScope,
}

impl<'p, P: SourceProvider + ?Sized> ResolutionContext<'p, P> {
    /// Start a session.
    pub fn new(provider: &'p P, request: SearchRequest) -> Self {
        Self {
            provider,
            request,
            state: State::Unresolved,
            target: None,
            subject: None,
            scope: SearchScope::Files,
        }
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The subject, once built.
    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    /// The search scope; meaningful from [`State::ScopeDetermined`] on.
    pub fn scope(&self) -> SearchScope {
        self.scope
    }

    /// The request this session serves.
    pub fn request(&self) -> &SearchRequest {
        &self.request
    }

    /// Build the subject and choose the search scope.
    ///
    /// # Errors
    /// `Parse` for an unparsable target, `NoIdentifierAtOffset`,
    /// `UnresolvedIdentifier` or `SubjectConstructionFailed`. Any error
    /// leaves the session [`State::Failed`].
    pub fn resolve(&mut self) -> Result<&Subject> {
        if self.state == State::Unresolved {
            match self.build() {
                Ok((target, subject)) => {
                    log::debug!(
                        "subject {} declared at {}",
                        subject.name(),
                        subject.declaration_position()
                    );
                    self.state = State::SubjectBuilt;
                    self.scope = determine_scope(&target, &subject);
                    log::debug!("search scope: {:?}", self.scope);
                    self.target = Some(target);
                    self.subject = Some(subject);
                    self.state = State::ScopeDetermined;
                }
                Err(err) => {
                    self.state = State::Failed;
                    return Err(err);
                }
            }
        }
        self.subject.as_ref().ok_or(RefError::SubjectNotBuilt)
    }

    fn build(&self) -> Result<(Rc<ParsedFile>, Subject)> {
        let target = self.provider.parse(&self.request.file)?;

        match self.provider.assemble_local_package(&target) {
            Ok(LocalPackage::Merged { added, skipped, .. }) => {
                log::debug!("local package: {} sibling file(s)", added);
                if !skipped.is_empty() {
                    log::warn!(
                        "local package of {} is partial: {} file(s) skipped",
                        target.path.display(),
                        skipped.len()
                    );
                }
            }
            Ok(LocalPackage::NoAdditionalFiles) => {
                log::debug!("{}: no more package files", target.path.display());
            }
            Err(err) => log::warn!("local package assembly failed: {}", err),
        }

        let occurrence = locate(&target, self.request.offset)?;
        let mut subject = self.build_subject(&target, occurrence)?;
        subject.finalize(self.provider);
        Ok((target, subject))
    }

    fn build_subject(&self, file: &ParsedFile, occurrence: Occurrence<'_>) -> Result<Subject> {
        match occurrence {
            Occurrence::Member { owner, member, .. } => {
                let name = file.text(member).to_string();
                let (decl, typ) = self.provider.member_type(file, owner, &name);
                let decl = self.resolved(file, member, decl, &typ)?;
                let recv = self.provider.expr_type(file, owner).1;
                if recv.is_bad() {
                    return Err(RefError::SubjectConstructionFailed {
                        reason: format!("owner of {} has no known type", name),
                    });
                }
                Ok(Subject::Member(MemberSubject {
                    name,
                    typ,
                    decl,
                    recv,
                }))
            }
            Occurrence::Ident(node) => {
                let name = file.text(node).to_string();
                let (decl, typ) = self.provider.expr_type(file, node);
                let decl = self.resolved(file, node, decl, &typ)?;
                let owner = match &decl.shape {
                    DeclShape::Method { receiver_type } => {
                        let receiver = receiver_type.ok_or_else(|| {
                            RefError::SubjectConstructionFailed {
                                reason: format!("method {} has no receiver type", name),
                            }
                        })?;
                        Some(receiver)
                    }
                    DeclShape::Field { .. } => self.provider.field_owner(&decl),
                    _ => None,
                };
                let recv = owner.map(|handle| self.provider.type_of_node(&handle));
                match recv {
                    Some(recv) if !recv.is_bad() => Ok(Subject::Member(MemberSubject {
                        name,
                        typ,
                        decl,
                        recv,
                    })),
                    Some(_) if decl.is_method() => Err(RefError::SubjectConstructionFailed {
                        reason: format!("receiver type of method {} is unknown", name),
                    }),
                    _ => Ok(Subject::Name(NameSubject { name, typ, decl })),
                }
            }
        }
    }

    fn resolved(
        &self,
        file: &ParsedFile,
        node: Node<'_>,
        decl: Option<Declaration>,
        typ: &ResolvedType,
    ) -> Result<Declaration> {
        match decl {
            Some(decl) if !typ.is_bad() => Ok(decl),
            _ => Err(RefError::UnresolvedIdentifier {
                name: file.text(node).to_string(),
                file: file.path.clone(),
                offset: node.start_byte(),
            }),
        }
    }

    /// Report every occurrence of the subject.
    ///
    /// A member subject's own declaration is reported first when it lies in
    /// the search root. Files of `files` that fail to parse are skipped;
    /// a dot import stops the walk of its file only.
    ///
    /// # Errors
    /// `SubjectNotBuilt` before a successful [`resolve`](Self::resolve),
    /// `NoPackagesFound` when a file-set scan has nothing to walk.
    pub fn scan<R: Reporter + ?Sized>(&mut self, files: &[PathBuf], reporter: &mut R) -> Result<()> {
        if self.state != State::ScopeDetermined {
            return Err(RefError::SubjectNotBuilt);
        }
        self.state = State::Scanning;
        let result = self.scan_scope(files, reporter);
        self.state = if result.is_ok() {
            State::Done
        } else {
            State::Failed
        };
        result
    }

    fn scan_scope<R: Reporter + ?Sized>(&self, files: &[PathBuf], reporter: &mut R) -> Result<()> {
        let (Some(target), Some(subject)) = (self.target.as_ref(), self.subject.as_ref()) else {
            return Err(RefError::SubjectNotBuilt);
        };

        if let Subject::Member(member) = subject {
            if member.decl.position.is_within(&self.request.search_root) {
                reporter.report(&member.decl.position);
            }
        }

        match self.scope {
            SearchScope::Function(handle) => {
                let Some(function) = target.node(&handle) else {
                    return Err(RefError::Other(format!(
                        "function scope lost in {}",
                        target.path.display()
                    )));
                };
                self.walk_file(target, function, subject, reporter)
            }
            SearchScope::Files => {
                let packages = self.provider.parse_packages(files)?;
                for package in &packages {
                    log::debug!(
                        "package #{}: {} file(s)",
                        package.package.0,
                        package.files.len()
                    );
                }
                // Files are walked in the order they were supplied; package
                // grouping only decides which siblings resolve names.
                let mut ordered: Vec<&Rc<ParsedFile>> =
                    packages.iter().flat_map(|p| p.files.iter()).collect();
                ordered.sort_by_key(|file| {
                    files
                        .iter()
                        .position(|path| *path == file.path)
                        .unwrap_or(usize::MAX)
                });
                for file in ordered {
                    self.walk_file(file, file.root(), subject, reporter)?;
                }
                Ok(())
            }
        }
    }

    fn walk_file<R: Reporter + ?Sized>(
        &self,
        file: &ParsedFile,
        node: Node<'_>,
        subject: &Subject,
        reporter: &mut R,
    ) -> Result<()> {
        let outcome = Walker::new(file).walk(node, &mut |occurrence| {
            if subject.is_match(self.provider, file, &occurrence) {
                let position = file.position(occurrence.offset());
                log::debug!("match at {}", position);
                reporter.report(&position);
            }
        });
        match outcome {
            Err(err) if err.is_local() => {
                log::warn!("{}", err);
                Ok(())
            }
            other => other,
        }
    }

    /// Resolve, then scan.
    pub fn run<R: Reporter + ?Sized>(&mut self, files: &[PathBuf], reporter: &mut R) -> Result<()> {
        self.resolve()?;
        self.scan(files, reporter)
    }
}

/// The first occurrence, in walk order, covering `offset`.
///
/// Owners are walked before their chains, so the innermost identifier or
/// member access wins.
pub fn locate(file: &ParsedFile, offset: usize) -> Result<Occurrence<'_>> {
    let mut found = None;
    Walker::locating(file).walk(file.root(), &mut |occurrence| {
        if found.is_none() && occurrence.contains(offset) {
            found = Some(occurrence);
        }
    })?;
    found.ok_or_else(|| RefError::NoIdentifierAtOffset {
        file: file.path.clone(),
        offset,
    })
}

/// Narrow to one function when the subject is declared inside it, other
/// than as the function's own name.
fn determine_scope(target: &ParsedFile, subject: &Subject) -> SearchScope {
    let position = subject.declaration_position();
    if position.filename != target.path {
        return SearchScope::Files;
    }
    let Some(node) = target
        .root()
        .descendant_for_byte_range(position.offset, position.offset)
    else {
        return SearchScope::Files;
    };
    match enclosing_function(node) {
        Some(function)
            if function
                .child_by_field_name("name")
                .map_or(true, |name| name.start_byte() != position.offset) =>
        {
            SearchScope::Function(target.node_ref(function))
        }
        _ => SearchScope::Files,
    }
}
