//! Shared tree-sitter utilities for language support modules.
//!
//! Provides common functions for extracting text and positions from tree-sitter nodes.

// Tree-sitter returns usize for positions, but we store u32 for compactness.
// This is safe for practical source files (no file has 4 billion lines).
#![allow(clippy::cast_possible_truncation)]

/// Get the text content of a tree-sitter node.
///
/// Returns an empty string if the node's byte range does not fall on
/// character boundaries of `source`.
pub fn node_text<'a>(node: &tree_sitter::Node<'_>, source: &'a str) -> &'a str {
    match source.get(node.byte_range()) {
        Some(text) => text,
        None => {
            tracing::trace!(
                byte_range = ?node.byte_range(),
                node_kind = %node.kind(),
                "Node byte range is not a valid slice of the source"
            );
            ""
        }
    }
}

/// 1-indexed (start, end) lines of a tree-sitter node.
///
/// Tree-sitter rows are 0-indexed.
pub fn node_lines(node: &tree_sitter::Node<'_>) -> (u32, u32) {
    let start = node.start_position().row as u32 + 1;
    let end = node.end_position().row as u32 + 1;
    (start, end.max(start))
}
