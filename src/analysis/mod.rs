//! Source analysis for Go files.
//!
//! The [`SourceProvider`] trait is everything the reference engine needs
//! from the language front end: parsing, static type and declaration
//! lookup, and package naming. [`Analyzer`] implements it on top of
//! tree-sitter-go with a block-structured scope model and a small type
//! inference pass.
//!
//! # Ownership
//! The analyzer owns every parsed file in an arena indexed by [`FileId`].
//! Results never borrow from the arena: declarations and types carry
//! [`NodeRef`] handles and [`SourcePosition`]s.

mod infer;
pub mod package;
mod scope;
pub mod types;

pub use package::{LocalPackage, Package, PackageId, ScanPackage};
pub use types::{
    is_identical_type, same_decl_type, DeclShape, Declaration, ResolvedType, TypeKind,
};

use crate::error::Result;
use crate::syntax::{parse_path, FileId, NodeRef, ParsedFile};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tree_sitter::Node;

/// Capabilities the reference engine requires from a language front end.
pub trait SourceProvider {
    /// Parse a file on its own, as a one-file package.
    fn parse(&self, path: &Path) -> Result<Rc<ParsedFile>>;

    /// A previously parsed file.
    fn file(&self, id: FileId) -> Option<Rc<ParsedFile>>;

    /// Static type and originating declaration of an expression or type
    /// expression node of `file`.
    fn expr_type(&self, file: &ParsedFile, node: Node<'_>) -> (Option<Declaration>, ResolvedType);

    /// Type and declaration of `owner.member`, where `owner` is a node of
    /// `file` and the member access itself may not exist in the tree.
    fn member_type(
        &self,
        file: &ParsedFile,
        owner: Node<'_>,
        member: &str,
    ) -> (Option<Declaration>, ResolvedType);

    /// Type of the node behind a handle.
    fn type_of_node(&self, node: &NodeRef) -> ResolvedType;

    /// Name node of the named struct type declaring a field, if any.
    fn field_owner(&self, decl: &Declaration) -> Option<NodeRef>;

    /// Package name of a file, derived from its package clause, its
    /// directory and the configured search roots.
    fn package_name_of(&self, path: &Path) -> String;

    /// Merge the sibling files of `file`'s package into its scope.
    fn assemble_local_package(&self, file: &ParsedFile) -> Result<LocalPackage>;

    /// Parse a file set and group it into packages. Files that fail to
    /// parse are skipped.
    fn parse_packages(&self, paths: &[PathBuf]) -> Result<Vec<ScanPackage>>;

    /// Fill in an empty package name from the file the type originates
    /// in, or from `fallback` when the type has no origin node.
    ///
    /// Idempotent: a type with a package is left alone.
    fn repair(&self, typ: &mut ResolvedType, fallback: &Path) {
        if !typ.pkg.is_empty() || typ.is_bad() {
            return;
        }
        let origin = typ
            .node
            .and_then(|node| self.file(node.file))
            .map(|file| file.path.clone())
            .unwrap_or_else(|| fallback.to_path_buf());
        typ.pkg = self.package_name_of(&origin);
    }
}

/// Analyzer settings.
#[derive(Debug, Clone, Default)]
pub struct AnalyzerConfig {
    /// Directories import paths are resolved against, in priority order.
    pub roots: Vec<PathBuf>,
}

impl AnalyzerConfig {
    /// Config with the given search roots.
    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }
}

/// tree-sitter-go backed [`SourceProvider`].
#[derive(Debug, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
    files: RefCell<Vec<Rc<ParsedFile>>>,
    file_packages: RefCell<HashMap<FileId, PackageId>>,
    packages: RefCell<Vec<Package>>,
    imports: RefCell<HashMap<PathBuf, Option<PackageId>>>,
    package_names: RefCell<HashMap<PathBuf, String>>,
}

impl Analyzer {
    /// Create an analyzer with the given configuration.
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Number of files parsed so far.
    pub fn file_count(&self) -> usize {
        self.files.borrow().len()
    }

    /// Read, parse and register a file without assigning a package.
    fn load_file(&self, path: &Path) -> Result<Rc<ParsedFile>> {
        let id = FileId(self.files.borrow().len() as u32);
        let parsed = Rc::new(parse_path(id, path)?);
        self.files.borrow_mut().push(Rc::clone(&parsed));
        log::debug!("parsed {} as file #{}", path.display(), id.0);
        Ok(parsed)
    }

    /// A parsed file by arena id.
    pub(crate) fn file_by_id(&self, id: FileId) -> Option<Rc<ParsedFile>> {
        self.files.borrow().get(id.0 as usize).cloned()
    }

    /// Package a file belongs to.
    pub fn package_of(&self, file: FileId) -> Option<PackageId> {
        self.file_packages.borrow().get(&file).copied()
    }

    /// A package by id.
    pub fn package(&self, id: PackageId) -> Option<Package> {
        self.packages.borrow().get(id.0 as usize).cloned()
    }

    /// Files sharing a package scope with `file`, starting with `file`.
    pub(crate) fn package_files(&self, file: FileId) -> Vec<FileId> {
        let mut files = vec![file];
        if let Some(pkg) = self.package_of(file).and_then(|id| self.package(id)) {
            files.extend(pkg.files.into_iter().filter(|id| *id != file));
        }
        files
    }
}

impl SourceProvider for Analyzer {
    fn parse(&self, path: &Path) -> Result<Rc<ParsedFile>> {
        let file = self.load_file(path)?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let pkg = self.create_package(&file.package_clause, &dir);
        self.add_to_package(pkg, file.id);
        Ok(file)
    }

    fn file(&self, id: FileId) -> Option<Rc<ParsedFile>> {
        self.file_by_id(id)
    }

    fn expr_type(&self, file: &ParsedFile, node: Node<'_>) -> (Option<Declaration>, ResolvedType) {
        self.infer(file, node, 0)
    }

    fn member_type(
        &self,
        file: &ParsedFile,
        owner: Node<'_>,
        member: &str,
    ) -> (Option<Declaration>, ResolvedType) {
        self.infer_member(file, owner, member, 0)
    }

    fn type_of_node(&self, node: &NodeRef) -> ResolvedType {
        let Some(file) = self.file(node.file) else {
            return ResolvedType::bad();
        };
        let Some(found) = file.node(node) else {
            return ResolvedType::bad();
        };
        if crate::syntax::is_identifier(found.kind()) {
            self.infer(&file, found, 0).1
        } else {
            self.type_expr(&file, found, 0)
        }
    }

    fn field_owner(&self, decl: &Declaration) -> Option<NodeRef> {
        self.struct_owner(decl)
    }

    fn package_name_of(&self, path: &Path) -> String {
        self.package_name(path)
    }

    fn assemble_local_package(&self, file: &ParsedFile) -> Result<LocalPackage> {
        self.assemble_local(file)
    }

    fn parse_packages(&self, paths: &[PathBuf]) -> Result<Vec<ScanPackage>> {
        self.parse_file_set(paths)
    }
}
