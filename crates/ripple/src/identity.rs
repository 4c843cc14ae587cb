//! Content-addressed identifiers for graph entities.
//!
//! Every node except `File` is keyed by an ID derived purely from its stable
//! key tuple:
//!
//! ```text
//! {prefix}{hex(sha256("{relative_path}::{name}::{line}[::{extra}]"))[..len]}
//! ```
//!
//! e.g. `fn_3fa1c09b27de5e40`. Re-deriving a node from unchanged source always
//! yields the same ID, and paths are made project-relative before hashing, so
//! IDs are identical across machines and checkouts.
//!
//! # Collision Risk
//!
//! IDs are truncated hashes, so collisions follow the birthday bound: with
//! `b` bits of hash, a collision becomes ~50% likely at about `1.18 * 2^(b/2)`
//! items of one kind.
//!
//! | Hex chars | Bits | ~50% collision at |
//! |-----------|------|-------------------|
//! | 8         | 32   | ~77,000 items     |
//! | 12        | 48   | ~20 million items |
//! | 16        | 64   | ~5 billion items  |
//!
//! The default is 16 hex chars. Fewer than 12 is rejected.

use std::fmt::Write as _;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Default hex length of the hash part of an ID (64 bits).
pub const DEFAULT_HEX_LEN: usize = 16;

/// Smallest accepted hex length (48 bits).
pub const MIN_HEX_LEN: usize = 12;

/// Largest possible hex length (the full SHA-256 digest).
pub const MAX_HEX_LEN: usize = 64;

/// Entity kinds that carry a content-addressed ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    /// `fn_`
    Function,
    /// `cls_`
    Class,
    /// `var_`
    Variable,
    /// `imp_`
    Import,
    /// `dec_`
    Decorator,
    /// `attr_`
    Attribute,
    /// `exc_`
    Exception,
    /// `mod_`
    Module,
}

impl IdKind {
    /// The prefix prepended to IDs of this kind.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Function => "fn_",
            Self::Class => "cls_",
            Self::Variable => "var_",
            Self::Import => "imp_",
            Self::Decorator => "dec_",
            Self::Attribute => "attr_",
            Self::Exception => "exc_",
            Self::Module => "mod_",
        }
    }
}

/// Compute the ID for an entity whose file path is already project-relative.
///
/// `extra` disambiguates kinds whose `(file, name, line)` is not unique on its
/// own (a variable's scope, an exception's context and enclosing function).
///
/// `hex_len` is clamped to the digest length.
#[must_use]
pub fn make_id(
    kind: IdKind,
    rel_path: &str,
    name: &str,
    start_line: u32,
    extra: Option<&str>,
    hex_len: usize,
) -> String {
    let mut content = format!("{rel_path}::{name}::{start_line}");
    if let Some(extra) = extra {
        content.push_str("::");
        content.push_str(extra);
    }

    let digest = Sha256::digest(content.as_bytes());
    let hex_len = hex_len.min(MAX_HEX_LEN);

    let prefix = kind.prefix();
    let mut id = String::with_capacity(prefix.len() + hex_len);
    id.push_str(prefix);
    for byte in digest.iter().take(hex_len.div_ceil(2)) {
        // Writing to a String cannot fail
        let _ = write!(id, "{byte:02x}");
    }
    id.truncate(prefix.len() + hex_len);
    id
}

/// Lexically normalize `file` to a `/`-separated path relative to `root`.
///
/// Paths outside `root` are kept as given (normalized separators only). No
/// filesystem access happens here.
#[must_use]
pub fn relative_path(root: &Path, file: &Path) -> String {
    let rel = file.strip_prefix(root).unwrap_or(file);
    normalize_separators(&rel.to_string_lossy())
}

/// Normalize a path string that is already project-relative.
#[must_use]
pub fn normalize_separators(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    let mut trimmed = replaced.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.trim_start_matches('/').to_string()
}

/// ID scheme with a validated hash length.
#[derive(Debug, Clone)]
pub struct IdScheme {
    hex_len: usize,
}

impl IdScheme {
    /// Create a scheme with the given hex length.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `hex_len` is outside `12..=64`.
    pub fn new(hex_len: usize) -> Result<Self> {
        if !(MIN_HEX_LEN..=MAX_HEX_LEN).contains(&hex_len) {
            return Err(Error::Config(format!(
                "id hex length must be between {MIN_HEX_LEN} and {MAX_HEX_LEN}, got {hex_len}"
            )));
        }
        Ok(Self { hex_len })
    }

    /// Hex length of the hash part of IDs produced by this scheme.
    #[must_use]
    pub fn hex_len(&self) -> usize {
        self.hex_len
    }

    /// Compute an ID for an entity in a project-relative file.
    #[must_use]
    pub fn id(
        &self,
        kind: IdKind,
        rel_path: &str,
        name: &str,
        line: u32,
        extra: Option<&str>,
    ) -> String {
        make_id(kind, rel_path, name, line, extra, self.hex_len)
    }

    /// ID of a function definition.
    #[must_use]
    pub fn function_id(&self, rel_path: &str, name: &str, start_line: u32) -> String {
        self.id(IdKind::Function, rel_path, name, start_line, None)
    }
}

impl Default for IdScheme {
    fn default() -> Self {
        Self {
            hex_len: DEFAULT_HEX_LEN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::path::PathBuf;

    #[test]
    fn same_inputs_same_id() {
        let a = make_id(IdKind::Function, "app/db.py", "connect", 12, None, 16);
        let b = make_id(IdKind::Function, "app/db.py", "connect", 12, None, 16);
        assert_eq!(a, b);
    }

    #[test]
    fn different_line_different_id() {
        let a = make_id(IdKind::Function, "app/db.py", "connect", 12, None, 16);
        let b = make_id(IdKind::Function, "app/db.py", "connect", 13, None, 16);
        assert_ne!(a, b);
    }

    #[test]
    fn extra_disambiguates_same_position() {
        let module = make_id(IdKind::Variable, "a.py", "x", 3, Some("module"), 16);
        let local = make_id(IdKind::Variable, "a.py", "x", 3, Some("function:f"), 16);
        let none = make_id(IdKind::Variable, "a.py", "x", 3, None, 16);
        assert_ne!(module, local);
        assert_ne!(module, none);
    }

    #[test]
    fn hashes_the_documented_content_string() {
        // sha256("a.py::f::1")
        let digest = Sha256::digest(b"a.py::f::1");
        let expected: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();

        assert_eq!(
            make_id(IdKind::Function, "a.py", "f", 1, None, 16),
            format!("fn_{expected}")
        );
    }

    #[rstest]
    #[case(IdKind::Function, "fn_")]
    #[case(IdKind::Class, "cls_")]
    #[case(IdKind::Variable, "var_")]
    #[case(IdKind::Import, "imp_")]
    #[case(IdKind::Decorator, "dec_")]
    #[case(IdKind::Attribute, "attr_")]
    #[case(IdKind::Exception, "exc_")]
    #[case(IdKind::Module, "mod_")]
    fn ids_carry_kind_prefix(#[case] kind: IdKind, #[case] prefix: &str) {
        let id = make_id(kind, "m.py", "thing", 1, None, 16);
        assert!(id.starts_with(prefix), "{id} should start with {prefix}");
        assert_eq!(id.len(), prefix.len() + 16);
    }

    #[rstest]
    #[case(12)]
    #[case(13)]
    #[case(64)]
    fn hex_length_is_exact(#[case] len: usize) {
        let id = make_id(IdKind::Class, "m.py", "C", 1, None, len);
        assert_eq!(id.len(), "cls_".len() + len);
        assert!(id["cls_".len()..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[rstest]
    #[case(8)]
    #[case(11)]
    #[case(65)]
    fn scheme_rejects_out_of_range_lengths(#[case] len: usize) {
        assert!(matches!(IdScheme::new(len), Err(Error::Config(_))));
    }

    #[test]
    fn relative_path_strips_root_and_normalizes() {
        let root = PathBuf::from("/work/project");
        assert_eq!(
            relative_path(&root, Path::new("/work/project/pkg/mod.py")),
            "pkg/mod.py"
        );
        assert_eq!(relative_path(&root, Path::new("pkg/mod.py")), "pkg/mod.py");
        assert_eq!(normalize_separators(".\\pkg\\mod.py"), "pkg/mod.py");
    }

    #[test]
    fn ids_are_portable_across_roots() {
        let a = relative_path(Path::new("/home/a/repo"), Path::new("/home/a/repo/x/y.py"));
        let b = relative_path(Path::new("/srv/ci/repo"), Path::new("/srv/ci/repo/x/y.py"));
        assert_eq!(
            make_id(IdKind::Function, &a, "f", 1, None, 16),
            make_id(IdKind::Function, &b, "f", 1, None, 16)
        );
    }

    proptest! {
        #[test]
        fn make_id_is_deterministic(name in "[a-zA-Z_][a-zA-Z0-9_]{0,20}", line in 1u32..100_000) {
            let a = make_id(IdKind::Function, "src/x.py", &name, line, None, 16);
            let b = make_id(IdKind::Function, "src/x.py", &name, line, None, 16);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn start_line_changes_the_id(name in "[a-z_]{1,12}", line in 1u32..100_000) {
            let a = make_id(IdKind::Function, "src/x.py", &name, line, None, 16);
            let b = make_id(IdKind::Function, "src/x.py", &name, line + 1, None, 16);
            prop_assert_ne!(a, b);
        }
    }
}
