//! Language-specific entity extraction.
//!
//! Each supported language implements the `LanguageSupport` trait, which turns
//! a parsed syntax tree into a [`FileAnalysis`](common::FileAnalysis).
//!
//! ## Adding a New Language
//!
//! 1. Add the variant to `Language` enum in `types.rs`
//! 2. Create a new module (e.g., `javascript.rs`)
//! 3. Implement `LanguageSupport` trait
//! 4. Register in `get_language_support()`

pub mod common;
pub mod python;
pub mod tree_sitter_utils;

use crate::parser::TreeSitterNode;
use crate::types::Language;
use common::FileAnalysis;

/// Per-file inputs to extraction.
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext<'a> {
    /// Project-relative path of the file
    pub rel_path: &'a str,
    /// SHA-256 of the file contents
    pub content_hash: &'a str,
    /// Keep source excerpts of functions and classes
    pub include_source: bool,
}

/// Get the language support implementation for a language.
#[must_use]
pub fn get_language_support(lang: Language) -> &'static dyn LanguageSupport {
    match lang {
        Language::Python => &python::PythonLanguage,
    }
}

/// Trait for language-specific entity extraction.
pub trait LanguageSupport: Send + Sync {
    /// The language this implementation handles.
    fn language(&self) -> Language;

    /// File extensions this language handles.
    fn extensions(&self) -> &[&str];

    /// Get the tree-sitter language for parsing.
    fn tree_sitter_language(&self) -> tree_sitter::Language;

    /// Extract every entity of a syntax tree that parsed without errors.
    fn extract(&self, root: &TreeSitterNode<'_>, ctx: &ExtractContext<'_>) -> FileAnalysis;
}
