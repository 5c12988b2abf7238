//! Identifier lookup through Go's block structure.
//!
//! Scopes are searched innermost first: statements of the enclosing blocks
//! and case clauses, statement headers (`if`, `for`, `switch`), function
//! signatures, then the package (every file of the file's package) and
//! finally the file's imports.

use super::types::{DeclShape, Declaration};
use super::Analyzer;
use crate::syntax::{field_children, named_children, statements, FileId, ParsedFile};
use tree_sitter::Node;

impl Analyzer {
    /// Declaration `name` refers to at `node`.
    pub(crate) fn lookup(&self, file: &ParsedFile, node: Node<'_>, name: &str) -> Option<Declaration> {
        let mut current = node.parent();
        while let Some(scope) = current {
            let found = match scope.kind() {
                "block" | "expression_case" | "type_case" | "default_case"
                | "communication_case" => self.lookup_in_statements(file, scope, node, name),
                "function_declaration" | "method_declaration" | "func_literal" => {
                    self.lookup_in_signature(file, scope, name)
                }
                "if_statement" | "expression_switch_statement" | "type_switch_statement"
                | "for_statement" => self.lookup_in_header(file, scope, node, name),
                "source_file" => return self.lookup_package_level(file, name),
                _ => None,
            };
            if found.is_some() {
                return found;
            }
            current = scope.parent();
        }
        None
    }

    fn lookup_in_statements(
        &self,
        file: &ParsedFile,
        scope: Node<'_>,
        target: Node<'_>,
        name: &str,
    ) -> Option<Declaration> {
        let pos = target.start_byte();
        let mut found = None;
        for stmt in statements(scope).into_iter().rev() {
            if stmt.start_byte() > pos {
                continue;
            }
            let completed = stmt.end_byte() <= pos;
            let visible = |n: Node<'_>| completed || n.id() == target.id();
            let Some(decl) = self.declared_in(file, stmt, name, &visible) else {
                continue;
            };
            found = Some(decl);
            // `:=` reuses a name already declared earlier in the same scope.
            if stmt.kind() != "short_var_declaration" {
                return found;
            }
        }
        if found.is_none() {
            return None;
        }

        // A function body shares its scope with the signature.
        let func = scope
            .parent()
            .filter(|p| matches!(p.kind(), "function_declaration" | "method_declaration" | "func_literal"))
            .filter(|p| p.child_by_field_name("body").is_some_and(|b| b.id() == scope.id()));
        match func.and_then(|f| self.lookup_in_signature(file, f, name)) {
            Some(param) => Some(param),
            None => found,
        }
    }

    fn lookup_in_header(
        &self,
        file: &ParsedFile,
        stmt: Node<'_>,
        target: Node<'_>,
        name: &str,
    ) -> Option<Declaration> {
        let pos = target.start_byte();

        let mut headers = Vec::new();
        if let Some(init) = stmt.child_by_field_name("initializer") {
            headers.push(init);
        }
        for child in named_children(stmt) {
            if child.kind() == "for_clause" {
                if let Some(init) = child.child_by_field_name("initializer") {
                    headers.push(init);
                }
            }
            if child.kind() == "range_clause" {
                if let Some(decl) = self.range_declared(file, child, target, name) {
                    return Some(decl);
                }
            }
        }
        for header in headers {
            let completed = header.end_byte() <= pos;
            let visible = |n: Node<'_>| completed || n.id() == target.id();
            if let Some(decl) = self.declared_in(file, header, name, &visible) {
                return Some(decl);
            }
        }

        if stmt.kind() == "type_switch_statement" {
            if let (Some(alias), Some(value)) = (
                stmt.child_by_field_name("alias"),
                stmt.child_by_field_name("value"),
            ) {
                let visible = alias.end_byte() <= pos || alias.start_byte() == pos;
                for id in named_children(alias) {
                    if visible && id.kind() == "identifier" && file.text(id) == name {
                        let shape = DeclShape::Var {
                            type_expr: None,
                            value: Some(file.node_ref(value)),
                            index: 0,
                            range: false,
                        };
                        return Some(self.declaration(file, id, stmt, shape));
                    }
                }
            }
        }
        None
    }

    fn range_declared(
        &self,
        file: &ParsedFile,
        clause: Node<'_>,
        target: Node<'_>,
        name: &str,
    ) -> Option<Declaration> {
        if !defines(clause) {
            return None;
        }
        let completed = clause.end_byte() <= target.start_byte();
        let left = clause.child_by_field_name("left")?;
        let right = clause.child_by_field_name("right")?;
        for (index, id) in named_children(left).into_iter().enumerate() {
            let visible = completed || id.id() == target.id();
            if visible && id.kind() == "identifier" && file.text(id) == name {
                let shape = DeclShape::Var {
                    type_expr: None,
                    value: Some(file.node_ref(right)),
                    index,
                    range: true,
                };
                return Some(self.declaration(file, id, clause, shape));
            }
        }
        None
    }

    fn lookup_in_signature(&self, file: &ParsedFile, func: Node<'_>, name: &str) -> Option<Declaration> {
        for field in ["receiver", "parameters", "result"] {
            let Some(list) = func.child_by_field_name(field) else {
                continue;
            };
            if list.kind() != "parameter_list" {
                continue;
            }
            for param in named_children(list) {
                if !matches!(
                    param.kind(),
                    "parameter_declaration" | "variadic_parameter_declaration"
                ) {
                    continue;
                }
                let type_expr = param.child_by_field_name("type").map(|t| file.node_ref(t));
                for id in field_children(param, "name") {
                    if file.text(id) == name {
                        let shape = DeclShape::Var {
                            type_expr,
                            value: None,
                            index: 0,
                            range: false,
                        };
                        return Some(self.declaration(file, id, param, shape));
                    }
                }
            }
        }
        None
    }

    fn lookup_package_level(&self, file: &ParsedFile, name: &str) -> Option<Declaration> {
        for id in self.package_files(file.id) {
            let sibling = match self.file_by_id(id) {
                Some(sibling) => sibling,
                None => continue,
            };
            if let Some(decl) = self.top_level_declaration(&sibling, name) {
                return Some(decl);
            }
        }
        self.lookup_import(file, name)
    }

    /// Package-scope declaration named `name` in one file.
    pub(crate) fn top_level_declaration(&self, file: &ParsedFile, name: &str) -> Option<Declaration> {
        let always = |_: Node<'_>| true;
        for item in named_children(file.root()) {
            if item.kind() == "function_declaration" {
                if let Some(id) = item.child_by_field_name("name") {
                    if file.text(id) == name {
                        return Some(self.declaration(file, id, item, DeclShape::Func));
                    }
                }
                continue;
            }
            if let Some(decl) = self.declared_in(file, item, name, &always) {
                return Some(decl);
            }
        }
        None
    }

    /// Package-scope declaration named `name` in any file of a package.
    pub(crate) fn lookup_in_package(&self, files: &[FileId], name: &str) -> Option<Declaration> {
        files
            .iter()
            .filter_map(|id| self.file_by_id(*id))
            .find_map(|file| self.top_level_declaration(&file, name))
    }

    /// Import of `file` whose local name is `name`.
    pub(crate) fn lookup_import(&self, file: &ParsedFile, name: &str) -> Option<Declaration> {
        for spec in import_specs(file.root()) {
            let Some(path_node) = spec.child_by_field_name("path") else {
                continue;
            };
            let path = file.text(path_node).trim_matches(['"', '`']).to_string();
            let alias = spec.child_by_field_name("name");

            let (local, name_node) = match alias {
                Some(alias) if matches!(alias.kind(), "dot" | "blank_identifier") => continue,
                Some(alias) => (file.text(alias).to_string(), alias),
                None => {
                    let last = path.rsplit('/').next().unwrap_or("").to_string();
                    if last == name {
                        (last, path_node)
                    } else {
                        let clause = self.imported_package_name(&path).unwrap_or(last);
                        (clause, path_node)
                    }
                }
            };
            if local == name {
                return Some(Declaration {
                    name: local,
                    position: file.position(name_node.start_byte()),
                    node: file.node_ref(spec),
                    shape: DeclShape::Package { path },
                });
            }
        }
        None
    }

    /// Declarations made by one statement or top-level declaration.
    fn declared_in(
        &self,
        file: &ParsedFile,
        stmt: Node<'_>,
        name: &str,
        visible: &dyn Fn(Node<'_>) -> bool,
    ) -> Option<Declaration> {
        match stmt.kind() {
            "short_var_declaration" => {
                let left = stmt.child_by_field_name("left")?;
                let right = stmt.child_by_field_name("right");
                let ids = named_children(left);
                for (i, id) in ids.iter().enumerate() {
                    if id.kind() == "identifier" && file.text(*id) == name && visible(*id) {
                        let (value, index) = pick_value(file, right, i, ids.len());
                        let shape = DeclShape::Var {
                            type_expr: None,
                            value,
                            index,
                            range: false,
                        };
                        return Some(self.declaration(file, *id, stmt, shape));
                    }
                }
                None
            }
            "receive_statement" => {
                if !defines(stmt) {
                    return None;
                }
                let left = stmt.child_by_field_name("left")?;
                let right = stmt.child_by_field_name("right")?;
                for (index, id) in named_children(left).into_iter().enumerate() {
                    if id.kind() == "identifier" && file.text(id) == name && visible(id) {
                        // `v, ok := <-ch`: index 1 is the ok flag.
                        let shape = DeclShape::Var {
                            type_expr: None,
                            value: Some(file.node_ref(right)),
                            index,
                            range: false,
                        };
                        return Some(self.declaration(file, id, stmt, shape));
                    }
                }
                None
            }
            "var_declaration" | "const_declaration" => {
                for spec in specs(stmt, &["var_spec", "const_spec"]) {
                    let ids = field_children(spec, "name");
                    let type_expr = spec.child_by_field_name("type").map(|t| file.node_ref(t));
                    let values = spec.child_by_field_name("value");
                    for (i, id) in ids.iter().enumerate() {
                        if file.text(*id) != name || !visible(*id) {
                            continue;
                        }
                        let (value, index) = pick_value(file, values, i, ids.len());
                        let shape = if spec.kind() == "const_spec" {
                            DeclShape::Const { type_expr, value }
                        } else {
                            DeclShape::Var {
                                type_expr,
                                value,
                                index,
                                range: false,
                            }
                        };
                        return Some(self.declaration(file, *id, spec, shape));
                    }
                }
                None
            }
            "type_declaration" => {
                for spec in specs(stmt, &["type_spec", "type_alias"]) {
                    let id = spec.child_by_field_name("name")?;
                    if file.text(id) == name && visible(id) {
                        return Some(self.declaration(file, id, spec, DeclShape::Type));
                    }
                }
                None
            }
            _ => None,
        }
    }

    /// Build a declaration for the name node `id` declared by `decl`.
    pub(crate) fn declaration(
        &self,
        file: &ParsedFile,
        id: Node<'_>,
        decl: Node<'_>,
        shape: DeclShape,
    ) -> Declaration {
        Declaration {
            name: file.text(id).to_string(),
            position: file.position(id.start_byte()),
            node: file.node_ref(decl),
            shape,
        }
    }
}

/// Whether a statement or clause declares with `:=`.
fn defines(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == ":=");
    found
}

/// Pick the initialiser for the `i`-th of `count` names: one value per
/// name, or a single multi-value expression indexed by `i`.
fn pick_value(
    file: &ParsedFile,
    values: Option<Node<'_>>,
    i: usize,
    count: usize,
) -> (Option<crate::syntax::NodeRef>, usize) {
    let Some(values) = values else {
        return (None, 0);
    };
    let exprs = named_children(values);
    if exprs.len() == count {
        (exprs.get(i).map(|v| file.node_ref(*v)), 0)
    } else if exprs.len() == 1 {
        (Some(file.node_ref(exprs[0])), i)
    } else {
        (None, 0)
    }
}

/// Specs of a declaration, looking through grouping lists.
fn specs<'t>(decl: Node<'t>, kinds: &[&str]) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    for child in named_children(decl) {
        if kinds.contains(&child.kind()) {
            out.push(child);
        } else if child.kind().ends_with("_list") {
            out.extend(
                named_children(child)
                    .into_iter()
                    .filter(|c| kinds.contains(&c.kind())),
            );
        }
    }
    out
}

/// All import specs of a file.
pub(crate) fn import_specs(root: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    for decl in named_children(root) {
        if decl.kind() != "import_declaration" {
            continue;
        }
        for child in named_children(decl) {
            match child.kind() {
                "import_spec" => out.push(child),
                "import_spec_list" => out.extend(
                    named_children(child)
                        .into_iter()
                        .filter(|c| c.kind() == "import_spec"),
                ),
                _ => {}
            }
        }
    }
    out
}
