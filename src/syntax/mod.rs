//! Go syntax trees via tree-sitter-go.
//!
//! A [`ParsedFile`] owns its source text, rope and tree. Nodes are handed
//! out as borrowed `tree_sitter::Node`s; anything that has to outlive a
//! single call holds a [`NodeRef`] instead and re-finds the node later.

use crate::error::{Result, RefError};
use crate::position::SourcePosition;
use ropey::Rope;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Tree};

/// Index of a parsed file in the analyzer's file arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// Stable handle to a syntax node: file, byte span and node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    /// File the node belongs to.
    pub file: FileId,
    /// Start byte offset.
    pub start: usize,
    /// End byte offset.
    pub end: usize,
    /// tree-sitter kind id, used to pick the right node among nested ones
    /// sharing the same span.
    pub kind_id: u16,
}

/// A parsed Go source file.
#[derive(Debug)]
pub struct ParsedFile {
    /// Arena index.
    pub id: FileId,
    /// Path the file was read from.
    pub path: PathBuf,
    /// Source text.
    pub source: String,
    /// Rope for line/column conversion.
    pub rope: Rope,
    /// The syntax tree.
    pub tree: Tree,
    /// Name from the `package` clause, empty when missing.
    pub package_clause: String,
}

impl ParsedFile {
    /// Root node of the tree.
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Source text covered by `node`.
    pub fn text(&self, node: Node<'_>) -> &str {
        self.source
            .get(node.start_byte()..node.end_byte())
            .unwrap_or("")
    }

    /// Position of a byte offset in this file.
    pub fn position(&self, offset: usize) -> SourcePosition {
        SourcePosition::from_offset(&self.path, &self.rope, offset)
    }

    /// Handle for a node of this file.
    pub fn node_ref(&self, node: Node<'_>) -> NodeRef {
        NodeRef {
            file: self.id,
            start: node.start_byte(),
            end: node.end_byte(),
            kind_id: node.kind_id(),
        }
    }

    /// Find the node a handle points to.
    ///
    /// Returns `None` when the handle belongs to another file.
    pub fn node(&self, handle: &NodeRef) -> Option<Node<'_>> {
        if handle.file != self.id {
            return None;
        }
        let mut node = self
            .root()
            .descendant_for_byte_range(handle.start, handle.end)?;
        loop {
            if node.start_byte() == handle.start
                && node.end_byte() == handle.end
                && node.kind_id() == handle.kind_id
            {
                return Some(node);
            }
            if node.start_byte() < handle.start || node.end_byte() > handle.end {
                return None;
            }
            node = node.parent()?;
        }
    }

}

/// Parse Go source text into a [`ParsedFile`].
///
/// Fails when tree-sitter cannot produce a tree or the tree contains
/// syntax errors.
pub fn parse_source(id: FileId, path: &Path, source: String) -> Result<ParsedFile> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_go::language())
        .map_err(|e| RefError::Parse {
            file: path.to_path_buf(),
            message: format!("Failed to set Go language: {:?}", e),
        })?;

    let tree = parser
        .parse(source.as_bytes(), None)
        .ok_or_else(|| RefError::Parse {
            file: path.to_path_buf(),
            message: "Parse failed - no tree returned".to_string(),
        })?;

    if tree.root_node().has_error() {
        let message = first_error(tree.root_node())
            .map(|node| {
                let point = node.start_position();
                format!(
                    "syntax error at line {}, column {}",
                    point.row + 1,
                    point.column + 1
                )
            })
            .unwrap_or_else(|| "syntax error".to_string());
        return Err(RefError::Parse {
            file: path.to_path_buf(),
            message,
        });
    }

    let rope = Rope::from_str(&source);
    let package_clause = package_clause_of(tree.root_node(), &source);

    Ok(ParsedFile {
        id,
        path: path.to_path_buf(),
        source,
        rope,
        tree,
        package_clause,
    })
}

/// Read and parse a Go file from disk.
pub fn parse_path(id: FileId, path: &Path) -> Result<ParsedFile> {
    let bytes = std::fs::read(path).map_err(|e| RefError::io(path, e))?;
    let source = std::str::from_utf8(&bytes)?.to_string();
    parse_source(id, path, source)
}

/// Read only the package clause of a file.
///
/// Tolerates syntax errors later in the file; returns `None` when the file
/// cannot be read or has no clause.
pub fn read_package_clause(path: &Path) -> Option<String> {
    let source = std::fs::read_to_string(path).ok()?;
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&tree_sitter_go::language()).ok()?;
    let tree = parser.parse(source.as_bytes(), None)?;
    let name = package_clause_of(tree.root_node(), &source);
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn package_clause_of(root: Node<'_>, source: &str) -> String {
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() != "package_clause" {
            continue;
        }
        let mut inner = child.walk();
        for name in child.named_children(&mut inner) {
            if name.kind() == "package_identifier" || name.kind() == "identifier" {
                return source
                    .get(name.start_byte()..name.end_byte())
                    .unwrap_or("")
                    .to_string();
            }
        }
    }
    String::new()
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}

/// Node kinds that name something directly.
pub fn is_identifier(kind: &str) -> bool {
    matches!(
        kind,
        "identifier" | "type_identifier" | "field_identifier" | "package_identifier"
    )
}

/// Named children of `node`, in order.
pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Children of `node` stored under field `field`.
pub fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

/// Statements of a block or case clause, flattening `statement_list`
/// wrappers that some grammar versions emit.
pub fn statements(node: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    for child in named_children(node) {
        if child.kind() == "statement_list" {
            out.extend(named_children(child));
        } else {
            out.push(child);
        }
    }
    out
}

/// Strip `literal_element`/`element` wrappers around literal entries.
pub fn unwrap_element(node: Node<'_>) -> Node<'_> {
    let mut node = node;
    while matches!(node.kind(), "literal_element" | "element") {
        match node.named_child(0) {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Nearest enclosing function or method declaration.
pub fn enclosing_function(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if matches!(n.kind(), "function_declaration" | "method_declaration") {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> ParsedFile {
        parse_source(FileId(0), Path::new("/src/a/a.go"), src.to_string())
            .expect("Failed to parse source")
    }

    #[test]
    fn test_parse_reads_package_clause() {
        let file = parse("package shape\n\nfunc F() {}\n");
        assert_eq!(file.package_clause, "shape");
        assert_eq!(file.root().kind(), "source_file");
    }

    #[test]
    fn test_parse_rejects_syntax_errors() {
        let result = parse_source(
            FileId(0),
            Path::new("/src/bad.go"),
            "package a\nfunc {{{\n".to_string(),
        );
        assert!(matches!(result, Err(RefError::Parse { .. })));
    }

    #[test]
    fn test_node_ref_round_trips() {
        let file = parse("package a\n\nvar answer = 42\n");
        let offset = file.source.find("answer").unwrap();
        let node = file
            .root()
            .descendant_for_byte_range(offset, offset + 6)
            .unwrap();
        let handle = file.node_ref(node);
        let found = file.node(&handle).unwrap();
        assert_eq!(file.text(found), "answer");
        assert_eq!(found.kind(), node.kind());

        let foreign = NodeRef {
            file: FileId(7),
            ..handle
        };
        assert!(file.node(&foreign).is_none());
    }
}
