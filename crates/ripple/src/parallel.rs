//! Parallel per-file analysis.
//!
//! Each file is read, hashed, parsed, and extracted by a single rayon task
//! with no shared mutable state. Results are merged afterwards and sorted by
//! path so output never depends on scheduling.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          index                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Phase 1 (Parallel):    rayon::par_iter() analyze_file      │
//! │  Phase 2 (Sequential):  normalize, skip unchanged files      │
//! │  Phase 3 (Single writer): incremental or bulk graph build    │
//! │  Phase 4 (Sequential):  INHERITS + CALLS over the full set   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::error::AnalysisError;
use crate::identity::relative_path;
use crate::languages::common::FileAnalysis;
use crate::languages::{ExtractContext, get_language_support};
use crate::parser::{TreeSitterNode, parse_source};
use crate::types::Language;

/// SHA-256 of file contents, hex encoded.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        // Writing to a String cannot fail
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Analyze one source file.
///
/// A file with syntax errors still yields a `FileAnalysis`: it carries the
/// error and no entities. The accompanying `AnalysisError` is returned in
/// the error slot only when the file could not be analyzed at all.
///
/// # Errors
///
/// Returns an `AnalysisError` if the file cannot be read, is not UTF-8, has
/// an unsupported extension, or the parser fails outright.
pub fn analyze_file(
    root: &Path,
    path: &Path,
    include_source: bool,
) -> std::result::Result<FileAnalysis, AnalysisError> {
    let language = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(Language::from_extension)
        .ok_or_else(|| AnalysisError::unsupported_language(path.to_path_buf()))?;

    let bytes = std::fs::read(path).map_err(|e| AnalysisError::io_error(path.to_path_buf(), &e))?;
    let source =
        std::str::from_utf8(&bytes).map_err(|_| AnalysisError::encoding_error(path.to_path_buf()))?;
    let hash = content_hash(&bytes);
    let rel = relative_path(root, path);

    analyze_source(&rel, language, source, &hash, include_source)
        .map_err(|message| AnalysisError::parse_failed(path.to_path_buf(), message))
}

/// Analyze source text already in memory.
///
/// # Errors
///
/// Returns a message if the parser fails outright.
pub fn analyze_source(
    rel_path: &str,
    language: Language,
    source: &str,
    content_hash: &str,
    include_source: bool,
) -> std::result::Result<FileAnalysis, String> {
    let support = get_language_support(language);
    let tree = parse_source(&support.tree_sitter_language(), source).map_err(|e| e.to_string())?;
    let root = TreeSitterNode::root(&tree, source);

    if root.has_error() {
        let line = root.first_error_line().unwrap_or(1);
        trace!(file = rel_path, line, "Syntax error, no entities extracted");
        let mut analysis = FileAnalysis::new(rel_path, language, content_hash);
        analysis.errors.push(format!("syntax error near line {line}"));
        return Ok(analysis);
    }

    let ctx = ExtractContext {
        rel_path,
        content_hash,
        include_source,
    };
    Ok(support.extract(&root, &ctx))
}

/// Analyze many files in parallel.
///
/// Returns analyses sorted by path, and the files that failed outright.
/// Files with syntax errors appear in both: as an analysis carrying the
/// error, and as a `ParseFailed` error for the run summary.
#[must_use]
pub fn analyze_files(
    root: &Path,
    paths: &[PathBuf],
    include_source: bool,
) -> (Vec<FileAnalysis>, Vec<AnalysisError>) {
    let results: Vec<std::result::Result<FileAnalysis, AnalysisError>> = paths
        .par_iter()
        .map(|path| analyze_file(root, path, include_source))
        .collect();

    let mut analyses = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(analysis) => {
                if let Some(message) = analysis.errors.first() {
                    errors.push(AnalysisError::parse_failed(
                        root.join(&analysis.path),
                        message.clone(),
                    ));
                }
                analyses.push(analysis);
            }
            Err(e) => errors.push(e),
        }
    }

    analyses.sort_by(|a, b| a.path.cmp(&b.path));
    errors.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(
        files = paths.len(),
        analyzed = analyses.len(),
        errors = errors.len(),
        "Parallel analysis complete"
    );
    (analyses, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisErrorKind;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn content_hash_is_hex_sha256() {
        let hash = content_hash(b"");
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn analyzes_files_sorted_by_path() {
        let dir = TempDir::new().unwrap();
        let b = write(dir.path(), "pkg/b.py", b"def b():\n    return 1\n");
        let a = write(dir.path(), "a.py", b"def a():\n    b()\n");

        let (analyses, errors) = analyze_files(dir.path(), &[b, a], false);

        assert!(errors.is_empty());
        let paths: Vec<&str> = analyses.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, vec!["a.py", "pkg/b.py"]);
        assert_eq!(analyses[0].calls.len(), 1);
    }

    #[test]
    fn syntax_errors_yield_empty_analysis_and_error() {
        let dir = TempDir::new().unwrap();
        let broken = write(dir.path(), "broken.py", b"def broken(:\n    pass\n");

        let (analyses, errors) = analyze_files(dir.path(), &[broken], false);

        assert_eq!(analyses.len(), 1);
        assert!(analyses[0].has_errors());
        assert!(analyses[0].functions.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, AnalysisErrorKind::ParseFailed);
    }

    #[test]
    fn non_utf8_is_an_encoding_error() {
        let dir = TempDir::new().unwrap();
        let bad = write(dir.path(), "latin.py", &[0x78, 0x20, 0x3d, 0x20, 0xff, 0x0a]);

        let err = analyze_file(dir.path(), &bad, false).unwrap_err();

        assert_eq!(err.kind, AnalysisErrorKind::EncodingError);
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let other = write(dir.path(), "notes.txt", b"hello");

        let err = analyze_file(dir.path(), &other, false).unwrap_err();

        assert_eq!(err.kind, AnalysisErrorKind::UnsupportedLanguage);
    }
}
