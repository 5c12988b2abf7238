//! Resolved types, declarations and the type comparison rules.

use crate::position::SourcePosition;
use crate::syntax::NodeRef;
use std::fmt;

/// What a resolved expression denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Could not be resolved.
    Bad,
    /// A declared type (the expression names a type).
    Type,
    /// An imported package.
    Package,
    /// A value of some type (variables, constants, functions, calls).
    Value,
}

/// The static type of an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    /// Kind of the expression.
    pub kind: TypeKind,
    /// Declared name of the type, the import path for packages, or empty
    /// for unnamed types.
    pub name: String,
    /// Owning package; may be empty until repaired.
    pub pkg: String,
    /// Node the type originates from: a `type_spec`, an `import_spec`, a
    /// function declaration or a type expression.
    pub node: Option<NodeRef>,
}

impl ResolvedType {
    /// The unresolvable type.
    pub fn bad() -> Self {
        Self {
            kind: TypeKind::Bad,
            name: String::new(),
            pkg: String::new(),
            node: None,
        }
    }

    /// A named or structural type.
    pub fn declared(name: impl Into<String>, node: Option<NodeRef>) -> Self {
        Self {
            kind: TypeKind::Type,
            name: name.into(),
            pkg: String::new(),
            node,
        }
    }

    /// A package imported under `path`.
    pub fn package(path: impl Into<String>, node: Option<NodeRef>) -> Self {
        Self {
            kind: TypeKind::Package,
            name: path.into(),
            pkg: String::new(),
            node,
        }
    }

    /// Whether this is the unresolvable type.
    pub fn is_bad(&self) -> bool {
        self.kind == TypeKind::Bad
    }

    /// The same type, seen as a value of it.
    pub fn into_value(mut self) -> Self {
        if self.kind == TypeKind::Type {
            self.kind = TypeKind::Value;
        }
        self
    }

    /// Set the package when it is not known yet.
    pub fn with_pkg_if_empty(mut self, pkg: &str) -> Self {
        if self.pkg.is_empty() && self.kind != TypeKind::Package {
            self.pkg = pkg.to_string();
        }
        self
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}.{}", self.kind, self.pkg, self.name)
    }
}

/// How a declaration was written, with the nodes needed to type it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclShape {
    /// Variable or parameter. `value` is the initialiser; `index` selects a
    /// result when one call initialises several names. `range` marks range
    /// clause variables, where `index` picks key (0) or value (1).
    Var {
        /// Declared type expression.
        type_expr: Option<NodeRef>,
        /// Initialiser expression.
        value: Option<NodeRef>,
        /// Result or range index.
        index: usize,
        /// Declared by a range clause.
        range: bool,
    },
    /// Constant. The declaration node is the `const_spec`, whose earlier
    /// siblings supply the type of specs written without type or value.
    Const {
        /// Declared type expression.
        type_expr: Option<NodeRef>,
        /// Initialiser expression.
        value: Option<NodeRef>,
    },
    /// Function without receiver.
    Func,
    /// Method with a receiver clause.
    Method {
        /// Receiver type expression (may be a pointer type).
        receiver_type: Option<NodeRef>,
    },
    /// Struct field or interface method.
    Field {
        /// Field type; `None` for interface methods.
        type_expr: Option<NodeRef>,
    },
    /// Type declaration; the node is the `type_spec`.
    Type,
    /// Import; the node is the `import_spec`.
    Package {
        /// Import path.
        path: String,
    },
}

/// A named entity and where it is declared.
#[derive(Debug, Clone)]
pub struct Declaration {
    /// Declared name.
    pub name: String,
    /// Position of the declaring name.
    pub position: SourcePosition,
    /// Declaring construct.
    pub node: NodeRef,
    /// Declaration shape.
    pub shape: DeclShape,
}

impl Declaration {
    /// Whether the declaration is a method with a receiver.
    pub fn is_method(&self) -> bool {
        matches!(self.shape, DeclShape::Method { .. })
    }
}

/// Declarations are the same entity when they sit at the same position.
impl PartialEq for Declaration {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
    }
}

impl Eq for Declaration {}

/// Receiver comparison.
///
/// When either side names a type, package and declared name must agree but
/// kinds may differ (a composite literal's type against a variable's type).
/// When either side is a package, both must be packages with the same path.
/// Otherwise the types must be identical.
pub fn same_decl_type(a: &ResolvedType, b: &ResolvedType) -> bool {
    if a.kind == TypeKind::Type || b.kind == TypeKind::Type {
        return a.pkg == b.pkg && a.name == b.name;
    }
    if a.kind == TypeKind::Package || b.kind == TypeKind::Package {
        return a.kind == b.kind && a.name == b.name;
    }
    is_identical_type(a, b)
}

/// Same package, same kind and same declared name.
pub fn is_identical_type(a: &ResolvedType, b: &ResolvedType) -> bool {
    a.pkg == b.pkg && a.kind == b.kind && a.name == b.name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typ(kind: TypeKind, pkg: &str, name: &str) -> ResolvedType {
        ResolvedType {
            kind,
            name: name.to_string(),
            pkg: pkg.to_string(),
            node: None,
        }
    }

    #[test]
    fn test_declared_type_ignores_kind() {
        let literal = typ(TypeKind::Type, "shape", "Triangle");
        let value = typ(TypeKind::Value, "shape", "Triangle");
        assert!(same_decl_type(&literal, &value));
        assert!(!same_decl_type(
            &literal,
            &typ(TypeKind::Value, "shape", "Rectangle")
        ));
        assert!(!same_decl_type(
            &literal,
            &typ(TypeKind::Value, "other", "Triangle")
        ));
    }

    #[test]
    fn test_packages_ignore_owning_package() {
        let a = typ(TypeKind::Package, "main", "pkg/shape");
        let b = typ(TypeKind::Package, "", "pkg/shape");
        assert!(same_decl_type(&a, &b));
        assert!(!same_decl_type(&a, &typ(TypeKind::Value, "", "pkg/shape")));
    }

    #[test]
    fn test_values_need_identical_types() {
        let a = typ(TypeKind::Value, "main", "int");
        assert!(same_decl_type(&a, &typ(TypeKind::Value, "main", "int")));
        assert!(!same_decl_type(&a, &typ(TypeKind::Value, "util", "int")));
        assert!(!is_identical_type(&a, &typ(TypeKind::Type, "main", "int")));
    }

    #[test]
    fn test_into_value_keeps_packages() {
        let t = ResolvedType::declared("Header", None).into_value();
        assert_eq!(t.kind, TypeKind::Value);
        let p = ResolvedType::package("fmt", None).into_value();
        assert_eq!(p.kind, TypeKind::Package);
    }
}
