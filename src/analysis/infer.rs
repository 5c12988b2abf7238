//! Static types of expressions and type expressions.
//!
//! Inference is deliberately shallow: it knows enough about declarations,
//! selectors, calls, literals and container element types to type the
//! owners of member accesses. Anything it does not model resolves to
//! [`TypeKind::Bad`]. Pointer indirection is dropped everywhere, so `*T`
//! and `T` resolve to the same type.

use super::types::{DeclShape, Declaration, ResolvedType, TypeKind};
use super::Analyzer;
use crate::syntax::{field_children, named_children, NodeRef, ParsedFile};
use tree_sitter::Node;

/// Bound on nested inference steps; self-referential declarations stop here.
const MAX_DEPTH: usize = 48;

const BUILTIN_TYPES: &[&str] = &[
    "any", "bool", "byte", "comparable", "complex64", "complex128", "error", "float32",
    "float64", "int", "int8", "int16", "int32", "int64", "rune", "string", "uint", "uint8",
    "uint16", "uint32", "uint64", "uintptr",
];

type Typed = (Option<Declaration>, ResolvedType);

/// Which part of a container an expression reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Index,
    RangeKey,
    RangeValue,
    Receive,
}

fn value(name: &str) -> ResolvedType {
    ResolvedType {
        kind: TypeKind::Value,
        name: name.to_string(),
        pkg: String::new(),
        node: None,
    }
}

fn func_value(node: NodeRef) -> ResolvedType {
    ResolvedType {
        kind: TypeKind::Value,
        name: "func".to_string(),
        pkg: String::new(),
        node: Some(node),
    }
}

/// Declared entity whose type could not be inferred.
fn unknown(decl: &Declaration) -> ResolvedType {
    ResolvedType {
        kind: TypeKind::Value,
        name: String::new(),
        pkg: String::new(),
        node: Some(decl.node),
    }
}

fn universe(name: &str) -> ResolvedType {
    match name {
        _ if BUILTIN_TYPES.contains(&name) => ResolvedType::declared(name, None),
        "true" | "false" => value("bool"),
        "iota" => value("int"),
        _ => ResolvedType::bad(),
    }
}

/// Node kinds that spell a type.
pub(crate) fn is_type_node(kind: &str) -> bool {
    matches!(
        kind,
        "type_identifier"
            | "qualified_type"
            | "pointer_type"
            | "slice_type"
            | "array_type"
            | "implicit_length_array_type"
            | "map_type"
            | "channel_type"
            | "struct_type"
            | "interface_type"
            | "function_type"
            | "generic_type"
            | "parenthesized_type"
    )
}

fn receiver_type_of(method: Node<'_>) -> Option<Node<'_>> {
    let receiver = method.child_by_field_name("receiver")?;
    named_children(receiver)
        .into_iter()
        .find(|p| p.kind() == "parameter_declaration")?
        .child_by_field_name("type")
}

/// Base type name of a receiver or embedded field type: `*T`, `T[K]` and
/// `pkg.T` all give `T`.
fn base_type_name<'f>(file: &'f ParsedFile, node: Node<'_>) -> &'f str {
    match node.kind() {
        "pointer_type" | "parenthesized_type" => node
            .named_child(0)
            .map(|inner| base_type_name(file, inner))
            .unwrap_or(""),
        "generic_type" => node
            .child_by_field_name("type")
            .map(|inner| base_type_name(file, inner))
            .unwrap_or(""),
        "qualified_type" => node
            .child_by_field_name("name")
            .map(|name| file.text(name))
            .unwrap_or(""),
        _ => file.text(node),
    }
}

fn struct_fields(structure: Node<'_>) -> Vec<Node<'_>> {
    named_children(structure)
        .into_iter()
        .filter(|c| c.kind() == "field_declaration_list")
        .flat_map(named_children)
        .filter(|c| c.kind() == "field_declaration")
        .collect()
}

impl Analyzer {
    fn with_node<R>(
        &self,
        handle: &NodeRef,
        f: impl FnOnce(&ParsedFile, Node<'_>) -> R,
    ) -> Option<R> {
        let file = self.file_by_id(handle.file)?;
        let node = file.node(handle)?;
        Some(f(&*file, node))
    }

    /// Declaration and type of an expression, identifier or type node.
    pub(crate) fn infer(&self, file: &ParsedFile, node: Node<'_>, depth: usize) -> Typed {
        if depth > MAX_DEPTH {
            return (None, ResolvedType::bad());
        }
        match node.kind() {
            "identifier" | "type_identifier" | "package_identifier" => {
                self.infer_name(file, node, depth)
            }
            "field_identifier" => self.infer_field_identifier(file, node, depth),
            "selector_expression" => match (
                node.child_by_field_name("operand"),
                node.child_by_field_name("field"),
            ) {
                (Some(owner), Some(field)) => {
                    self.infer_member(file, owner, file.text(field), depth + 1)
                }
                _ => (None, ResolvedType::bad()),
            },
            "qualified_type" => match (
                node.child_by_field_name("package"),
                node.child_by_field_name("name"),
            ) {
                (Some(owner), Some(name)) => {
                    self.infer_member(file, owner, file.text(name), depth + 1)
                }
                _ => (None, ResolvedType::bad()),
            },
            kind if is_type_node(kind) => (None, self.type_expr(file, node, depth + 1)),
            _ => (None, self.infer_value(file, node, 0, depth + 1)),
        }
    }

    fn infer_name(&self, file: &ParsedFile, node: Node<'_>, depth: usize) -> Typed {
        let name = file.text(node);
        match self.lookup(file, node, name) {
            Some(decl) => {
                let typ = self.type_of_decl(&decl, depth + 1);
                let typ = if typ.is_bad() { unknown(&decl) } else { typ };
                (Some(decl), typ)
            }
            None => (None, universe(name)),
        }
    }

    /// Field identifiers name struct fields, methods and interface methods
    /// at their declarations, and members inside selectors.
    fn infer_field_identifier(&self, file: &ParsedFile, node: Node<'_>, depth: usize) -> Typed {
        let Some(parent) = node.parent() else {
            return (None, ResolvedType::bad());
        };
        let shape = match parent.kind() {
            "selector_expression" => {
                return match parent.child_by_field_name("operand") {
                    Some(owner) => self.infer_member(file, owner, file.text(node), depth + 1),
                    None => (None, ResolvedType::bad()),
                };
            }
            "field_declaration" => DeclShape::Field {
                type_expr: parent.child_by_field_name("type").map(|t| file.node_ref(t)),
            },
            "method_declaration" => DeclShape::Method {
                receiver_type: receiver_type_of(parent).map(|t| file.node_ref(t)),
            },
            "method_spec" | "method_elem" => DeclShape::Field { type_expr: None },
            _ => return (None, ResolvedType::bad()),
        };
        let decl = self.declaration(file, node, parent, shape);
        let typ = self.type_of_decl(&decl, depth + 1);
        (Some(decl), typ)
    }

    /// Declaration and type of `owner.name`.
    pub(crate) fn infer_member(
        &self,
        file: &ParsedFile,
        owner: Node<'_>,
        name: &str,
        depth: usize,
    ) -> Typed {
        if depth > MAX_DEPTH {
            return (None, ResolvedType::bad());
        }
        let owner_type = self.infer(file, owner, depth + 1).1;
        let decl = match owner_type.kind {
            TypeKind::Bad => None,
            TypeKind::Package => self.package_member(&owner_type.name, name),
            TypeKind::Type | TypeKind::Value => self.find_member(&owner_type, name, depth + 1),
        };
        match decl {
            Some(decl) => {
                let typ = self.type_of_decl(&decl, depth + 1);
                let typ = if typ.is_bad() { unknown(&decl) } else { typ };
                (Some(decl), typ)
            }
            None => (None, ResolvedType::bad()),
        }
    }

    /// Package-scope declaration `name` of the package imported as `path`.
    fn package_member(&self, path: &str, name: &str) -> Option<Declaration> {
        let id = self.import_package(path)?;
        let package = self.package(id)?;
        self.lookup_in_package(&package.files, name)
    }

    /// Field or method `name` of a type: direct fields first, then the
    /// type's own methods, then members promoted from embedded fields.
    fn find_member(&self, typ: &ResolvedType, name: &str, depth: usize) -> Option<Declaration> {
        if depth > MAX_DEPTH {
            return None;
        }
        let mut embedded = Vec::new();
        if let Some(handle) = self.structure_of(typ, depth + 1) {
            let file = self.file_by_id(handle.file)?;
            let node = file.node(&handle)?;
            match node.kind() {
                "struct_type" => {
                    for field in struct_fields(node) {
                        let type_node = field.child_by_field_name("type");
                        let names = field_children(field, "name");
                        if names.is_empty() {
                            let Some(t) = type_node else { continue };
                            if base_type_name(&file, t) == name {
                                let anchor = match t.kind() {
                                    "qualified_type" => t.child_by_field_name("name").unwrap_or(t),
                                    _ => t,
                                };
                                let shape = DeclShape::Field {
                                    type_expr: Some(file.node_ref(t)),
                                };
                                return Some(self.declaration(&file, anchor, field, shape));
                            }
                            embedded.push(self.type_expr(&file, t, depth + 1));
                            continue;
                        }
                        for id in names {
                            if file.text(id) == name {
                                let shape = DeclShape::Field {
                                    type_expr: type_node.map(|t| file.node_ref(t)),
                                };
                                return Some(self.declaration(&file, id, field, shape));
                            }
                        }
                    }
                }
                "interface_type" => {
                    for elem in named_children(node) {
                        match elem.kind() {
                            "method_spec" | "method_elem" => {
                                let Some(id) = elem.child_by_field_name("name") else {
                                    continue;
                                };
                                if file.text(id) == name {
                                    let shape = DeclShape::Field { type_expr: None };
                                    return Some(self.declaration(&file, id, elem, shape));
                                }
                            }
                            "type_identifier" | "qualified_type" => {
                                embedded.push(self.type_expr(&file, elem, depth + 1));
                            }
                            "type_elem" | "constraint_elem" | "interface_type_name" => {
                                for t in named_children(elem) {
                                    embedded.push(self.type_expr(&file, t, depth + 1));
                                }
                            }
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }
        if let Some(method) = self.find_method(typ, name) {
            return Some(method);
        }
        embedded
            .iter()
            .filter(|e| !e.is_bad())
            .find_map(|e| self.find_member(e, name, depth + 1))
    }

    /// Method `name` declared with a receiver of the named type `typ`, in
    /// any file of the package declaring the type.
    fn find_method(&self, typ: &ResolvedType, name: &str) -> Option<Declaration> {
        if typ.name.is_empty() {
            return None;
        }
        let handle = typ.node?;
        let home = self.file_by_id(handle.file)?;
        if !matches!(home.node(&handle)?.kind(), "type_spec" | "type_alias") {
            return None;
        }
        for id in self.package_files(handle.file) {
            let Some(file) = self.file_by_id(id) else {
                continue;
            };
            for item in named_children(file.root()) {
                if item.kind() != "method_declaration" {
                    continue;
                }
                let Some(method_name) = item.child_by_field_name("name") else {
                    continue;
                };
                if file.text(method_name) != name {
                    continue;
                }
                let Some(receiver) = receiver_type_of(item) else {
                    continue;
                };
                if base_type_name(&file, receiver) == typ.name {
                    let shape = DeclShape::Method {
                        receiver_type: Some(file.node_ref(receiver)),
                    };
                    return Some(self.declaration(&file, method_name, item, shape));
                }
            }
        }
        None
    }

    /// The type expression a type is built from, following named types to
    /// their definitions.
    fn structure_of(&self, typ: &ResolvedType, depth: usize) -> Option<NodeRef> {
        if depth > MAX_DEPTH {
            return None;
        }
        let handle = typ.node?;
        let file = self.file_by_id(handle.file)?;
        let node = file.node(&handle)?;
        let mut inner = match node.kind() {
            "type_spec" | "type_alias" => node.child_by_field_name("type")?,
            _ => node,
        };
        while matches!(inner.kind(), "parenthesized_type" | "pointer_type") {
            inner = inner.named_child(0)?;
        }
        match inner.kind() {
            "type_identifier" | "qualified_type" | "generic_type" => {
                let next = self.type_expr(&file, inner, depth + 1);
                self.structure_of(&next, depth + 1)
            }
            _ => Some(file.node_ref(inner)),
        }
    }

    /// Type of the entity a declaration introduces.
    pub(crate) fn type_of_decl(&self, decl: &Declaration, depth: usize) -> ResolvedType {
        if depth > MAX_DEPTH {
            return ResolvedType::bad();
        }
        match &decl.shape {
            DeclShape::Type => ResolvedType::declared(decl.name.clone(), Some(decl.node)),
            DeclShape::Package { path } => ResolvedType::package(path.clone(), Some(decl.node)),
            DeclShape::Func | DeclShape::Method { .. } | DeclShape::Field { type_expr: None } => {
                func_value(decl.node)
            }
            DeclShape::Field {
                type_expr: Some(t),
            }
            | DeclShape::Var {
                type_expr: Some(t), ..
            } => self.type_expr_at(t, depth + 1).into_value(),
            DeclShape::Var {
                value: Some(v),
                index,
                range,
                ..
            } => {
                if *range {
                    let container = self.value_at(v, 0, depth + 1);
                    let which = if *index == 0 {
                        Element::RangeKey
                    } else {
                        Element::RangeValue
                    };
                    self.element_type(&container, which, depth + 1)
                } else {
                    self.value_at(v, *index, depth + 1)
                }
            }
            DeclShape::Var { .. } => ResolvedType::bad(),
            DeclShape::Const { type_expr, value } => {
                if let Some(t) = type_expr {
                    return self.type_expr_at(t, depth + 1).into_value();
                }
                if let Some(v) = value {
                    return self.value_at(v, 0, depth + 1);
                }
                self.with_node(&decl.node, |file, spec| {
                    self.inherited_const_type(file, spec, depth + 1)
                })
                .unwrap_or_else(ResolvedType::bad)
            }
        }
    }

    /// Type of a constant spec without type or value: the nearest earlier
    /// spec of the same group that has one.
    fn inherited_const_type(&self, file: &ParsedFile, spec: Node<'_>, depth: usize) -> ResolvedType {
        let mut prev = spec.prev_named_sibling();
        while let Some(p) = prev {
            if p.kind() == "const_spec" {
                if let Some(t) = p.child_by_field_name("type") {
                    return self.type_expr(file, t, depth + 1).into_value();
                }
                if let Some(v) = p.child_by_field_name("value") {
                    return named_children(v)
                        .first()
                        .map(|e| self.infer_value(file, *e, 0, depth + 1))
                        .unwrap_or_else(ResolvedType::bad);
                }
            }
            prev = p.prev_named_sibling();
        }
        ResolvedType::bad()
    }

    fn type_expr_at(&self, handle: &NodeRef, depth: usize) -> ResolvedType {
        self.with_node(handle, |file, node| self.type_expr(file, node, depth))
            .unwrap_or_else(ResolvedType::bad)
    }

    fn value_at(&self, handle: &NodeRef, index: usize, depth: usize) -> ResolvedType {
        self.with_node(handle, |file, node| self.infer_value(file, node, index, depth))
            .unwrap_or_else(ResolvedType::bad)
    }

    /// Type named by a type expression, with pointers stripped.
    pub(crate) fn type_expr(&self, file: &ParsedFile, node: Node<'_>, depth: usize) -> ResolvedType {
        if depth > MAX_DEPTH {
            return ResolvedType::bad();
        }
        match node.kind() {
            "type_identifier" | "identifier" => {
                let name = file.text(node);
                match self.lookup(file, node, name) {
                    Some(decl) if matches!(decl.shape, DeclShape::Type) => {
                        ResolvedType::declared(decl.name, Some(decl.node))
                    }
                    Some(_) => ResolvedType::bad(),
                    None if BUILTIN_TYPES.contains(&name) => ResolvedType::declared(name, None),
                    None => ResolvedType::bad(),
                }
            }
            "qualified_type" | "selector_expression" => {
                let (pkg, name) = if node.kind() == "qualified_type" {
                    (
                        node.child_by_field_name("package"),
                        node.child_by_field_name("name"),
                    )
                } else {
                    (
                        node.child_by_field_name("operand"),
                        node.child_by_field_name("field"),
                    )
                };
                let (Some(pkg), Some(name)) = (pkg, name) else {
                    return ResolvedType::bad();
                };
                let path = match self.lookup(file, pkg, file.text(pkg)) {
                    Some(Declaration {
                        shape: DeclShape::Package { path },
                        ..
                    }) => path,
                    _ => return ResolvedType::bad(),
                };
                match self.package_member(&path, file.text(name)) {
                    Some(decl) if matches!(decl.shape, DeclShape::Type) => {
                        ResolvedType::declared(decl.name, Some(decl.node))
                    }
                    _ => ResolvedType::bad(),
                }
            }
            "pointer_type" | "parenthesized_type" => match node.named_child(0) {
                Some(inner) => self.type_expr(file, inner, depth + 1),
                None => ResolvedType::bad(),
            },
            "generic_type" => match node.child_by_field_name("type") {
                Some(inner) => self.type_expr(file, inner, depth + 1),
                None => ResolvedType::bad(),
            },
            kind if is_type_node(kind) => {
                let spelled: String = file.text(node).split_whitespace().collect();
                ResolvedType::declared(spelled, Some(file.node_ref(node)))
            }
            _ => ResolvedType::bad(),
        }
    }

    /// Type of an expression used as a value. `index` selects one result of
    /// a multi-value expression.
    fn infer_value(&self, file: &ParsedFile, node: Node<'_>, index: usize, depth: usize) -> ResolvedType {
        if depth > MAX_DEPTH {
            return ResolvedType::bad();
        }
        match node.kind() {
            "parenthesized_expression" => match node.named_child(0) {
                Some(inner) => self.infer_value(file, inner, index, depth + 1),
                None => ResolvedType::bad(),
            },
            "call_expression" => self.call_type(file, node, index, depth + 1),
            "type_assertion_expression" | "index_expression" if index == 1 => value("bool"),
            "unary_expression" => {
                let operator = node
                    .child_by_field_name("operator")
                    .map(|op| file.text(op))
                    .unwrap_or("");
                let Some(operand) = node.child_by_field_name("operand") else {
                    return ResolvedType::bad();
                };
                match operator {
                    "<-" if index == 1 => value("bool"),
                    "<-" => {
                        let channel = self.infer_value(file, operand, 0, depth + 1);
                        self.element_type(&channel, Element::Receive, depth + 1)
                    }
                    "!" => value("bool"),
                    _ => self.infer_value(file, operand, 0, depth + 1),
                }
            }
            _ if index > 0 => ResolvedType::bad(),
            "composite_literal" => match node.child_by_field_name("type") {
                Some(t) => self.type_expr(file, t, depth + 1).into_value(),
                None => ResolvedType::bad(),
            },
            "func_literal" => func_value(file.node_ref(node)),
            "index_expression" => match node.child_by_field_name("operand") {
                Some(operand) => {
                    let container = self.infer_value(file, operand, 0, depth + 1);
                    self.element_type(&container, Element::Index, depth + 1)
                }
                None => ResolvedType::bad(),
            },
            "slice_expression" => match node.child_by_field_name("operand") {
                Some(operand) => self.infer_value(file, operand, 0, depth + 1),
                None => ResolvedType::bad(),
            },
            "type_assertion_expression" | "type_conversion_expression" => {
                match node.child_by_field_name("type") {
                    Some(t) => self.type_expr(file, t, depth + 1).into_value(),
                    None => ResolvedType::bad(),
                }
            }
            "binary_expression" => {
                let operator = node
                    .child_by_field_name("operator")
                    .map(|op| file.text(op))
                    .unwrap_or("");
                if matches!(operator, "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||") {
                    return value("bool");
                }
                let left = node
                    .child_by_field_name("left")
                    .map(|l| self.infer_value(file, l, 0, depth + 1))
                    .unwrap_or_else(ResolvedType::bad);
                if !left.is_bad() || matches!(operator, "<<" | ">>") {
                    return left;
                }
                node.child_by_field_name("right")
                    .map(|r| self.infer_value(file, r, 0, depth + 1))
                    .unwrap_or_else(ResolvedType::bad)
            }
            "int_literal" => value("int"),
            "float_literal" => value("float64"),
            "imaginary_literal" => value("complex128"),
            "rune_literal" => value("rune"),
            "interpreted_string_literal" | "raw_string_literal" => value("string"),
            "true" | "false" => value("bool"),
            "iota" => value("int"),
            "identifier" | "field_identifier" | "selector_expression" | "qualified_type" => {
                self.infer(file, node, depth + 1).1
            }
            _ => ResolvedType::bad(),
        }
    }

    /// Result `index` of a call, or the converted type of a conversion.
    fn call_type(&self, file: &ParsedFile, call: Node<'_>, index: usize, depth: usize) -> ResolvedType {
        let Some(function) = call.child_by_field_name("function") else {
            return ResolvedType::bad();
        };
        let args = call
            .child_by_field_name("arguments")
            .map(named_children)
            .unwrap_or_default();

        if function.kind() == "identifier" {
            let name = file.text(function);
            if self.lookup(file, function, name).is_none() {
                match name {
                    "new" | "make" => {
                        return args
                            .first()
                            .map(|a| self.type_expr(file, *a, depth + 1).into_value())
                            .unwrap_or_else(ResolvedType::bad);
                    }
                    "append" => {
                        return args
                            .first()
                            .map(|a| self.infer_value(file, *a, 0, depth + 1))
                            .unwrap_or_else(ResolvedType::bad);
                    }
                    "len" | "cap" | "copy" => return value("int"),
                    "real" | "imag" => return value("float64"),
                    "complex" => return value("complex128"),
                    _ => {}
                }
            }
        }

        let callee = self.infer(file, function, depth + 1).1;
        if callee.kind == TypeKind::Type {
            return if index == 0 {
                callee.into_value()
            } else {
                ResolvedType::bad()
            };
        }
        match callee.node {
            Some(node) => self.result_type(&node, index, depth + 1),
            None => ResolvedType::bad(),
        }
    }

    /// Result `index` of a function, method, interface method or function
    /// type.
    fn result_type(&self, handle: &NodeRef, index: usize, depth: usize) -> ResolvedType {
        self.with_node(handle, |file, node| {
            let node = match node.kind() {
                "type_spec" | "type_alias" => node.child_by_field_name("type")?,
                _ => node,
            };
            let result = node.child_by_field_name("result")?;
            if result.kind() != "parameter_list" {
                return (index == 0).then(|| self.type_expr(file, result, depth + 1).into_value());
            }
            let mut types = Vec::new();
            for param in named_children(result) {
                let Some(t) = param.child_by_field_name("type") else {
                    continue;
                };
                let count = field_children(param, "name").len().max(1);
                types.extend(std::iter::repeat(t).take(count));
            }
            types
                .get(index)
                .map(|t| self.type_expr(file, *t, depth + 1).into_value())
        })
        .flatten()
        .unwrap_or_else(ResolvedType::bad)
    }

    /// Element, key or value type of a container.
    fn element_type(&self, container: &ResolvedType, which: Element, depth: usize) -> ResolvedType {
        if container.is_bad() {
            return ResolvedType::bad();
        }
        if container.node.is_none() {
            return match (container.name.as_str(), which) {
                ("string", Element::Index) => value("byte"),
                ("string", Element::RangeKey) => value("int"),
                ("string", Element::RangeValue) => value("rune"),
                (name, Element::RangeKey) if name.starts_with("int") || name.starts_with("uint") => {
                    value(name)
                }
                _ => ResolvedType::bad(),
            };
        }
        let Some(handle) = self.structure_of(container, depth + 1) else {
            return ResolvedType::bad();
        };
        self.with_node(&handle, |file, node| {
            let field = match (node.kind(), which) {
                ("map_type", Element::RangeKey) => "key",
                ("map_type", Element::Index | Element::RangeValue) => "value",
                ("slice_type" | "array_type" | "implicit_length_array_type", Element::RangeKey) => {
                    return Some(value("int"));
                }
                ("slice_type" | "array_type" | "implicit_length_array_type", Element::Index | Element::RangeValue) => {
                    "element"
                }
                ("channel_type", Element::RangeKey | Element::Receive) => "value",
                _ => return None,
            };
            node.child_by_field_name(field)
                .map(|t| self.type_expr(file, t, depth + 1).into_value())
        })
        .flatten()
        .unwrap_or_else(ResolvedType::bad)
    }

    /// Name node of the named struct or interface type declaring a field.
    pub(crate) fn struct_owner(&self, decl: &Declaration) -> Option<NodeRef> {
        if !matches!(decl.shape, DeclShape::Field { .. }) {
            return None;
        }
        self.with_node(&decl.node, |file, node| {
            let mut current = node.parent();
            while let Some(n) = current {
                match n.kind() {
                    "field_declaration_list" => current = n.parent(),
                    "struct_type" | "interface_type" => {
                        let spec = n
                            .parent()
                            .filter(|p| matches!(p.kind(), "type_spec" | "type_alias"))?;
                        return spec.child_by_field_name("name").map(|name| file.node_ref(name));
                    }
                    _ => return None,
                }
            }
            None
        })
        .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalyzerConfig, SourceProvider};
    use std::path::Path;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Innermost named node covering the leading word of the `nth` match of
    /// `needle`.
    fn node_at<'f>(file: &'f ParsedFile, needle: &str, nth: usize) -> Node<'f> {
        let offset = file
            .source
            .match_indices(needle)
            .nth(nth)
            .map(|(i, _)| i)
            .expect("needle not found");
        let len = needle
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(needle.len());
        file.root()
            .named_descendant_for_byte_range(offset, offset + len)
            .unwrap()
    }

    fn setup(src: &str) -> (TempDir, Analyzer, Rc<ParsedFile>) {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "src/shape/shape.go", src);
        let analyzer = Analyzer::new(AnalyzerConfig::with_roots(vec![dir.path().join("src")]));
        let file = analyzer.parse(&path).unwrap();
        (dir, analyzer, file)
    }

    const SHAPES: &str = r#"package shape

type Header struct {
	Name string
	Size int
}

type Triangle struct {
	Header
	sides []int
}

func (t *Triangle) Draw() int { return 3 }

func NewTriangle() (*Triangle, error) { return &Triangle{}, nil }

func use() {
	t, err := NewTriangle()
	_ = err
	t.Draw()
	for i, side := range t.sides {
		_ = i + side
	}
	h := &Header{Name: "x"}
	_ = h.Size
	_ = t.Name
}
"#;

    #[test]
    fn test_short_var_takes_indexed_call_result() {
        let (_dir, analyzer, file) = setup(SHAPES);
        let t = node_at(&file, "t.Draw", 0);
        let (decl, typ) = analyzer.expr_type(&file, t);
        assert_eq!(decl.unwrap().name, "t");
        assert_eq!(typ.kind, TypeKind::Value);
        assert_eq!(typ.name, "Triangle");

        let err = node_at(&file, "err\n", 0);
        let typ = analyzer.expr_type(&file, err).1;
        assert_eq!(typ.name, "error");
    }

    #[test]
    fn test_method_through_pointer_receiver() {
        let (_dir, analyzer, file) = setup(SHAPES);
        let call = node_at(&file, "t.Draw", 0).parent().unwrap();
        assert_eq!(call.kind(), "selector_expression");
        let (decl, _) = analyzer.expr_type(&file, call);
        let decl = decl.unwrap();
        assert!(decl.is_method());
        assert_eq!(decl.name, "Draw");
    }

    #[test]
    fn test_range_over_slice_field() {
        let (_dir, analyzer, file) = setup(SHAPES);
        let i = node_at(&file, "i + side", 0);
        assert_eq!(analyzer.expr_type(&file, i).1.name, "int");
        let side = node_at(&file, "side\n", 0);
        assert_eq!(analyzer.expr_type(&file, side).1.name, "int");
    }

    #[test]
    fn test_promoted_field_resolves_to_embedded_struct() {
        let (_dir, analyzer, file) = setup(SHAPES);
        let access = node_at(&file, "t.Name", 0).parent().unwrap();
        let (decl, typ) = analyzer.expr_type(&file, access);
        let decl = decl.unwrap();
        assert_eq!(decl.name, "Name");
        assert_eq!(typ.name, "string");
        let owner = analyzer.field_owner(&decl).unwrap();
        assert_eq!(analyzer.type_of_node(&owner).name, "Header");
    }

    #[test]
    fn test_composite_literal_address_is_value_of_type() {
        let (_dir, analyzer, file) = setup(SHAPES);
        let h = node_at(&file, "h.Size", 0);
        let typ = analyzer.expr_type(&file, h).1;
        assert_eq!(typ.kind, TypeKind::Value);
        assert_eq!(typ.name, "Header");
    }

    #[test]
    fn test_iota_constants_inherit_type() {
        let src = "package shape\n\ntype Kind int\n\nconst (\n\tA Kind = iota\n\tB\n)\n\nvar k = B\n";
        let (_dir, analyzer, file) = setup(src);
        let b = node_at(&file, "B\n", 1);
        let (decl, typ) = analyzer.expr_type(&file, b);
        assert!(matches!(decl.unwrap().shape, DeclShape::Const { .. }));
        assert_eq!(typ.name, "Kind");
    }

    #[test]
    fn test_imported_type_resolves_through_root() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "src/pkg/shape/shape.go",
            "package shape\n\ntype Rect struct {\n\tW int\n}\n",
        );
        let main = write(
            dir.path(),
            "src/app/main.go",
            "package main\n\nimport \"pkg/shape\"\n\nfunc main() {\n\tr := shape.Rect{}\n\t_ = r.W\n}\n",
        );
        let analyzer = Analyzer::new(AnalyzerConfig::with_roots(vec![dir.path().join("src")]));
        let file = analyzer.parse(&main).unwrap();

        let r = node_at(&file, "r.W", 0);
        let typ = analyzer.expr_type(&file, r).1;
        assert_eq!(typ.name, "Rect");

        let pkg = node_at(&file, "shape.Rect", 0);
        let typ = analyzer.expr_type(&file, pkg).1;
        assert_eq!(typ.kind, TypeKind::Package);
        assert_eq!(typ.name, "pkg/shape");

        let mut owner = analyzer.expr_type(&file, r).1;
        analyzer.repair(&mut owner, &main);
        assert_eq!(owner.pkg, "pkg/shape");
    }

    #[test]
    fn test_unknown_names_are_bad() {
        let (_dir, analyzer, file) = setup("package shape\n\nvar x = missing\n");
        let missing = node_at(&file, "missing", 0);
        let (decl, typ) = analyzer.expr_type(&file, missing);
        assert!(decl.is_none());
        assert!(typ.is_bad());
    }

    #[test]
    fn test_shadowed_locals_resolve_to_nearest_declaration() {
        let src = "package shape\n\nfunc f() {\n\ts := 1\n\t{\n\t\ts := \"x\"\n\t\t_ = s\n\t}\n\t_ = s\n}\n";
        let (_dir, analyzer, file) = setup(src);
        let inner = node_at(&file, "s\n\t}", 0);
        let outer = node_at(&file, "s\n}", 0);
        let (inner_decl, inner_type) = analyzer.expr_type(&file, inner);
        let (outer_decl, outer_type) = analyzer.expr_type(&file, outer);
        assert_eq!(inner_type.name, "string");
        assert_eq!(outer_type.name, "int");
        assert_ne!(inner_decl.unwrap().position, outer_decl.unwrap().position);
    }
}
