//! The searched-for entity and its match predicates.

use crate::analysis::{
    is_identical_type, same_decl_type, Declaration, ResolvedType, SourceProvider, TypeKind,
};
use crate::position::SourcePosition;
use crate::resolve::walker::Occurrence;
use crate::syntax::ParsedFile;

/// A subject reached through an owner: a method, a struct field or a
/// package-qualified name.
#[derive(Debug, Clone)]
pub struct MemberSubject {
    /// Member name.
    pub name: String,
    /// Type of the member.
    pub typ: ResolvedType,
    /// Where the member is declared.
    pub decl: Declaration,
    /// Type an owner must have for an access to match.
    pub recv: ResolvedType,
}

/// A subject referenced by its bare name.
#[derive(Debug, Clone)]
pub struct NameSubject {
    /// Declared name.
    pub name: String,
    /// Type of the entity.
    pub typ: ResolvedType,
    /// Where it is declared.
    pub decl: Declaration,
}

/// The entity a search looks for.
#[derive(Debug, Clone)]
pub enum Subject {
    /// Accessed through a receiver or package.
    Member(MemberSubject),
    /// Accessed by name.
    Name(NameSubject),
}

impl Subject {
    /// Name occurrences must carry.
    pub fn name(&self) -> &str {
        match self {
            Subject::Member(s) => &s.name,
            Subject::Name(s) => &s.name,
        }
    }

    /// The subject's declaration.
    pub fn declaration(&self) -> &Declaration {
        match self {
            Subject::Member(s) => &s.decl,
            Subject::Name(s) => &s.decl,
        }
    }

    /// Position of the declaring name.
    pub fn declaration_position(&self) -> &SourcePosition {
        &self.declaration().position
    }

    /// Fill in package names on the stored types. Idempotent.
    pub fn finalize<P: SourceProvider + ?Sized>(&mut self, provider: &P) {
        match self {
            Subject::Member(s) => {
                let fallback = s.decl.position.filename.clone();
                provider.repair(&mut s.typ, &fallback);
                provider.repair(&mut s.recv, &fallback);
            }
            Subject::Name(s) => {
                let fallback = s.decl.position.filename.clone();
                provider.repair(&mut s.typ, &fallback);
            }
        }
    }

    /// Whether an occurrence in `file` refers to the subject.
    pub fn is_match<P: SourceProvider + ?Sized>(
        &self,
        provider: &P,
        file: &ParsedFile,
        occurrence: &Occurrence<'_>,
    ) -> bool {
        match self {
            Subject::Member(s) => s.is_match(provider, file, occurrence),
            Subject::Name(s) => s.is_match(provider, file, occurrence),
        }
    }
}

impl MemberSubject {
    fn is_match<P: SourceProvider + ?Sized>(
        &self,
        provider: &P,
        file: &ParsedFile,
        occurrence: &Occurrence<'_>,
    ) -> bool {
        if occurrence.name(file) != self.name {
            return false;
        }
        match *occurrence {
            Occurrence::Member { owner, .. } => {
                let mut owner_type = provider.expr_type(file, owner).1;
                if owner_type.is_bad() {
                    return false;
                }
                provider.repair(&mut owner_type, &file.path);
                same_decl_type(&owner_type, &self.recv)
            }
            // Unqualified use of a package-level name inside its own package.
            Occurrence::Ident(node) => {
                if self.recv.kind != TypeKind::Package {
                    return false;
                }
                if file.position(node.start_byte()) == self.decl.position {
                    return false;
                }
                let Some(decl) = provider.expr_type(file, node).0 else {
                    return false;
                };
                // Locals and fields of the package may reuse the name.
                decl.position == self.decl.position
                    && provider.package_name_of(&decl.position.filename)
                        == provider.package_name_of(&self.decl.position.filename)
            }
        }
    }
}

impl NameSubject {
    fn is_match<P: SourceProvider + ?Sized>(
        &self,
        provider: &P,
        file: &ParsedFile,
        occurrence: &Occurrence<'_>,
    ) -> bool {
        if occurrence.name(file) != self.name {
            return false;
        }
        match *occurrence {
            Occurrence::Ident(node) => {
                let (decl, mut typ) = provider.expr_type(file, node);
                let Some(decl) = decl else {
                    return false;
                };
                provider.repair(&mut typ, &decl.position.filename);
                is_identical_type(&typ, &self.typ) && decl.position == self.decl.position
            }
            Occurrence::Member { owner, .. } => {
                let owner_type = provider.expr_type(file, owner).1;
                owner_type.kind == TypeKind::Package
                    && owner_type.name == provider.package_name_of(&self.decl.position.filename)
            }
        }
    }
}
