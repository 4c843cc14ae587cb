//! Syntax tree access for the extractors.
//!
//! Extractors never touch a concrete parser. They walk any tree that
//! implements [`ParseNode`], a small capability trait: kind tag, name, line
//! range, source text, and child navigation. [`TreeSitterNode`] is the
//! implementation used at runtime; tests can supply their own.

use crate::error::{Error, Result};
use crate::languages::tree_sitter_utils::{node_lines, node_text};

/// A node of a parsed syntax tree.
pub trait ParseNode: Clone {
    /// Grammar kind tag (e.g., `function_definition`).
    fn kind(&self) -> &str;

    /// 1-indexed first line.
    fn start_line(&self) -> u32;

    /// 1-indexed last line.
    fn end_line(&self) -> u32;

    /// Source text covered by this node.
    fn text(&self) -> &str;

    /// Named children, in source order.
    fn children(&self) -> Vec<Self>;

    /// The child stored under a grammar field.
    fn child_by_field(&self, field: &str) -> Option<Self>;

    /// Text of the `name` field, if the node has one.
    fn name(&self) -> Option<String> {
        self.child_by_field("name").map(|n| n.text().to_string())
    }

    /// First named child.
    fn first_child(&self) -> Option<Self> {
        self.children().into_iter().next()
    }
}

/// [`ParseNode`] over a tree-sitter node and the source it was parsed from.
#[derive(Clone, Copy)]
pub struct TreeSitterNode<'a> {
    node: tree_sitter::Node<'a>,
    source: &'a str,
}

impl<'a> TreeSitterNode<'a> {
    /// Wrap the root node of a parsed tree.
    #[must_use]
    pub fn root(tree: &'a tree_sitter::Tree, source: &'a str) -> Self {
        Self {
            node: tree.root_node(),
            source,
        }
    }

    /// Whether this subtree contains syntax errors or missing nodes.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.node.has_error()
    }

    /// Line of the first syntax error in this subtree.
    #[must_use]
    pub fn first_error_line(&self) -> Option<u32> {
        if !self.node.has_error() {
            return None;
        }
        if self.node.is_error() || self.node.is_missing() {
            return Some(self.start_line());
        }
        let mut cursor = self.node.walk();
        let children: Vec<_> = self.node.children(&mut cursor).collect();
        children
            .into_iter()
            .find_map(|child| self.wrap(child).first_error_line())
            .or_else(|| Some(self.start_line()))
    }

    fn wrap(&self, node: tree_sitter::Node<'a>) -> Self {
        Self {
            node,
            source: self.source,
        }
    }
}

impl ParseNode for TreeSitterNode<'_> {
    fn kind(&self) -> &str {
        self.node.kind()
    }

    fn start_line(&self) -> u32 {
        node_lines(&self.node).0
    }

    fn end_line(&self) -> u32 {
        node_lines(&self.node).1
    }

    fn text(&self) -> &str {
        node_text(&self.node, self.source)
    }

    fn children(&self) -> Vec<Self> {
        let mut cursor = self.node.walk();
        self.node
            .named_children(&mut cursor)
            .map(|child| self.wrap(child))
            .collect()
    }

    fn child_by_field(&self, field: &str) -> Option<Self> {
        self.node
            .child_by_field_name(field)
            .map(|child| self.wrap(child))
    }
}

impl std::fmt::Debug for TreeSitterNode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeSitterNode")
            .field("kind", &self.node.kind())
            .field("lines", &node_lines(&self.node))
            .finish()
    }
}

/// Parse `source` with the given tree-sitter grammar.
///
/// # Errors
///
/// Returns `Error::Parser` if the grammar cannot be loaded or tree-sitter
/// gives up on the input. Syntax errors are not failures here; they show up
/// as error nodes in the returned tree.
pub fn parse_source(language: &tree_sitter::Language, source: &str) -> Result<tree_sitter::Tree> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(language)
        .map_err(|e| Error::Parser(format!("failed to load grammar: {e}")))?;
    parser
        .parse(source, None)
        .ok_or_else(|| Error::Parser("parser returned no tree".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn python() -> tree_sitter::Language {
        tree_sitter_python::LANGUAGE.into()
    }

    #[test]
    fn wraps_named_children_with_lines() {
        let source = "def first():\n    pass\n\n\nclass Second:\n    pass\n";
        let tree = parse_source(&python(), source).unwrap();
        let root = TreeSitterNode::root(&tree, source);

        assert_eq!(root.kind(), "module");
        let children = root.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].kind(), "function_definition");
        assert_eq!(children[0].name().as_deref(), Some("first"));
        assert_eq!((children[0].start_line(), children[0].end_line()), (1, 2));
        assert_eq!(children[1].name().as_deref(), Some("Second"));
        assert_eq!(children[1].start_line(), 5);
    }

    #[test]
    fn syntax_errors_are_reported_not_raised() {
        let source = "def ok():\n    pass\n\ndef broken(:\n";
        let tree = parse_source(&python(), source).unwrap();
        let root = TreeSitterNode::root(&tree, source);

        assert!(root.has_error());
        assert!(root.first_error_line().is_some());
    }

    #[test]
    fn clean_source_has_no_error() {
        let source = "x = 1\n";
        let tree = parse_source(&python(), source).unwrap();
        let root = TreeSitterNode::root(&tree, source);

        assert!(!root.has_error());
        assert_eq!(root.first_error_line(), None);
    }
}
