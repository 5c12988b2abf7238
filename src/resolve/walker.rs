//! Syntax tree walker.
//!
//! Visits a (sub)tree depth-first, left to right, and hands every node that
//! can denote a declared entity to a caller-supplied visitor as an
//! [`Occurrence`]. Identifiers are leaves. Composite literal keys are turned
//! into synthesized member accesses on the literal's type so that struct
//! field keys can be matched like explicit `value.Field` selectors.

use crate::error::{RefError, Result};
use crate::syntax::{is_identifier, named_children, unwrap_element, ParsedFile};
use tree_sitter::Node;

/// A node that may refer to a declaration.
#[derive(Debug, Clone, Copy)]
pub enum Occurrence<'t> {
    /// A bare identifier.
    Ident(Node<'t>),
    /// `owner.member`.
    Member {
        /// Owner expression, or the literal's type node for a synthesized
        /// access.
        owner: Node<'t>,
        /// Member name node.
        member: Node<'t>,
        /// The written selector; `None` when synthesized from a literal key.
        chain: Option<Node<'t>>,
    },
}

impl<'t> Occurrence<'t> {
    /// Byte offset reported for a match: the identifier or member name.
    pub fn offset(&self) -> usize {
        match self {
            Occurrence::Ident(node) => node.start_byte(),
            Occurrence::Member { member, .. } => member.start_byte(),
        }
    }

    /// Source span the occurrence covers.
    pub fn span(&self) -> (usize, usize) {
        let node = match self {
            Occurrence::Ident(node) => node,
            Occurrence::Member {
                chain: Some(chain), ..
            } => chain,
            Occurrence::Member { member, .. } => member,
        };
        (node.start_byte(), node.end_byte())
    }

    /// Whether `offset` falls inside the occurrence, end inclusive.
    pub fn contains(&self, offset: usize) -> bool {
        let (start, end) = self.span();
        start <= offset && offset <= end
    }

    /// Name the occurrence refers by.
    pub fn name<'f>(&self, file: &'f ParsedFile) -> &'f str {
        match self {
            Occurrence::Ident(node) => file.text(*node),
            Occurrence::Member { member, .. } => file.text(*member),
        }
    }
}

/// What to do on `import . "path"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotImports {
    /// Stop walking the tree with [`RefError::UnsupportedConstruct`].
    Abort,
    /// Walk on; used when locating a node rather than matching.
    Ignore,
}

/// Depth-first occurrence walker over one file.
#[derive(Debug)]
pub struct Walker<'t> {
    file: &'t ParsedFile,
    dot_imports: DotImports,
    literal_types: Vec<Node<'t>>,
}

impl<'t> Walker<'t> {
    /// Walker that aborts on dot imports.
    pub fn new(file: &'t ParsedFile) -> Self {
        Self {
            file,
            dot_imports: DotImports::Abort,
            literal_types: Vec::new(),
        }
    }

    /// Walker that ignores dot imports.
    pub fn locating(file: &'t ParsedFile) -> Self {
        Self {
            dot_imports: DotImports::Ignore,
            ..Self::new(file)
        }
    }

    /// Walk `node` and everything below it.
    ///
    /// # Errors
    /// `UnsupportedConstruct` when a dot import is met in abort mode; the
    /// visitor has seen every occurrence before the import.
    pub fn walk<F>(&mut self, node: Node<'t>, visit: &mut F) -> Result<()>
    where
        F: FnMut(Occurrence<'t>),
    {
        if is_identifier(node.kind()) {
            visit(Occurrence::Ident(node));
            return Ok(());
        }
        match node.kind() {
            "package_clause" | "comment" => Ok(()),
            "import_declaration" => self.check_imports(node),
            "selector_expression" => self.walk_chain(node, "operand", "field", visit),
            "qualified_type" => self.walk_chain(node, "package", "name", visit),
            "keyed_element" => match keyed_parts(node).1 {
                Some(value) => self.walk(unwrap_element(value), visit),
                None => Ok(()),
            },
            "composite_literal" => self.walk_composite(node, visit),
            "literal_value" => self.walk_elided(node, visit),
            "function_declaration" | "method_declaration" => self.walk_function(node, visit),
            _ => self.walk_children(node, visit),
        }
    }

    fn walk_children<F>(&mut self, node: Node<'t>, visit: &mut F) -> Result<()>
    where
        F: FnMut(Occurrence<'t>),
    {
        for child in named_children(node) {
            self.walk(child, visit)?;
        }
        Ok(())
    }

    fn check_imports(&self, decl: Node<'t>) -> Result<()> {
        if self.dot_imports == DotImports::Ignore {
            return Ok(());
        }
        let mut specs = Vec::new();
        for child in named_children(decl) {
            match child.kind() {
                "import_spec" => specs.push(child),
                "import_spec_list" => specs.extend(named_children(child)),
                _ => {}
            }
        }
        for spec in specs {
            let is_dot = spec
                .child_by_field_name("name")
                .is_some_and(|name| name.kind() == "dot");
            if is_dot {
                let path = spec
                    .child_by_field_name("path")
                    .map(|p| self.file.text(p))
                    .unwrap_or("");
                return Err(RefError::UnsupportedConstruct {
                    file: self.file.path.clone(),
                    construct: format!("dot import {}", path),
                });
            }
        }
        Ok(())
    }

    /// Owner first, then the whole chain as one member access.
    fn walk_chain<F>(&mut self, node: Node<'t>, owner: &str, member: &str, visit: &mut F) -> Result<()>
    where
        F: FnMut(Occurrence<'t>),
    {
        let (Some(owner), Some(member)) = (
            node.child_by_field_name(owner),
            node.child_by_field_name(member),
        ) else {
            return self.walk_children(node, visit);
        };
        self.walk(owner, visit)?;
        visit(Occurrence::Member {
            owner,
            member,
            chain: Some(node),
        });
        Ok(())
    }

    fn walk_composite<F>(&mut self, node: Node<'t>, visit: &mut F) -> Result<()>
    where
        F: FnMut(Occurrence<'t>),
    {
        let literal_type = node.child_by_field_name("type");
        if let Some(t) = literal_type {
            self.walk(t, visit)?;
        }
        let Some(body) = node.child_by_field_name("body") else {
            return Ok(());
        };
        match literal_type {
            Some(t) => self.walk_literal_as(strip_pointer(t), body, visit),
            None => self.walk_literal_body(body, visit),
        }
    }

    /// A literal without a type of its own takes the element type of the
    /// enclosing literal.
    fn walk_elided<F>(&mut self, body: Node<'t>, visit: &mut F) -> Result<()>
    where
        F: FnMut(Occurrence<'t>),
    {
        match self.literal_types.last().copied() {
            Some(outer) => self.walk_literal_as(element_of(outer), body, visit),
            None => self.walk_literal_body(body, visit),
        }
    }

    fn walk_literal_as<F>(&mut self, literal_type: Node<'t>, body: Node<'t>, visit: &mut F) -> Result<()>
    where
        F: FnMut(Occurrence<'t>),
    {
        self.literal_types.push(literal_type);
        let result = self.walk_literal_body(body, visit);
        self.literal_types.pop();
        result
    }

    fn walk_literal_body<F>(&mut self, body: Node<'t>, visit: &mut F) -> Result<()>
    where
        F: FnMut(Occurrence<'t>),
    {
        let owner = self
            .literal_types
            .last()
            .copied()
            .filter(|t| !is_container(t.kind()));
        for child in named_children(body) {
            match child.kind() {
                "comment" => {}
                "keyed_element" => {
                    let (key, value) = keyed_parts(child);
                    if let (Some(owner), Some(key)) = (owner, key.map(unwrap_element)) {
                        if matches!(key.kind(), "identifier" | "field_identifier") {
                            visit(Occurrence::Member {
                                owner,
                                member: key,
                                chain: None,
                            });
                        }
                    }
                    if let Some(value) = value {
                        self.walk(unwrap_element(value), visit)?;
                    }
                }
                _ => self.walk(unwrap_element(child), visit)?,
            }
        }
        Ok(())
    }

    /// Name, receiver, signature, then body.
    fn walk_function<F>(&mut self, node: Node<'t>, visit: &mut F) -> Result<()>
    where
        F: FnMut(Occurrence<'t>),
    {
        for field in [
            "name",
            "receiver",
            "type_parameters",
            "parameters",
            "result",
            "body",
        ] {
            if let Some(child) = node.child_by_field_name(field) {
                self.walk(child, visit)?;
            }
        }
        Ok(())
    }
}

/// Key and value of a keyed literal element.
fn keyed_parts(node: Node<'_>) -> (Option<Node<'_>>, Option<Node<'_>>) {
    let key = node.child_by_field_name("key");
    let value = node.child_by_field_name("value");
    if key.is_some() || value.is_some() {
        return (key, value);
    }
    let children: Vec<_> = named_children(node)
        .into_iter()
        .filter(|c| c.kind() != "comment")
        .collect();
    match children.as_slice() {
        [key, .., value] => (Some(*key), Some(*value)),
        _ => (None, None),
    }
}

fn strip_pointer(node: Node<'_>) -> Node<'_> {
    let mut node = node;
    while matches!(node.kind(), "pointer_type" | "parenthesized_type") {
        match node.named_child(0) {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

fn is_container(kind: &str) -> bool {
    matches!(
        kind,
        "slice_type" | "array_type" | "implicit_length_array_type" | "map_type"
    )
}

/// Type of the entries of a literal of type `node`.
fn element_of(node: Node<'_>) -> Node<'_> {
    let field = match node.kind() {
        "slice_type" | "array_type" | "implicit_length_array_type" => "element",
        "map_type" => "value",
        _ => return node,
    };
    node.child_by_field_name(field)
        .map(strip_pointer)
        .unwrap_or(node)
}
