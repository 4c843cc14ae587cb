//! Error types for Ripple operations.
//!
//! Errors are categorized into two main types:
//!
//! - **`Error`**: Top-level errors that halt operations (database failures,
//!   contract violations, bad configuration)
//! - **`AnalysisError`**: File-level errors that are collected but don't halt indexing
//!
//! ## Error Philosophy
//!
//! Ripple follows a "best effort" approach for graph construction:
//! - A single malformed file shouldn't prevent indexing the rest
//! - An edge whose endpoint can't be resolved is skipped and counted
//! - A single failed node or edge write is logged and the batch continues
//! - Only infrastructure failures and contract violations (writing to a
//!   read-only store, invalid configuration) cause early termination
//!
//! ## Error Categorization
//!
//! `AnalysisErrorKind` uses a 4xx/5xx style categorization:
//! - Input problems (user's fault): parse errors, unsupported languages
//! - Internal problems (our fault): I/O errors, store errors

use std::path::PathBuf;
use thiserror::Error;

/// Result type for Ripple operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for Ripple operations.
///
/// These errors represent failures that prevent the operation from completing.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration could not be read or written
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Tree-sitter parsing infrastructure failed
    #[error("parser error: {0}")]
    Parser(String),

    /// Invalid configuration or arguments
    #[error("configuration error: {0}")]
    Config(String),

    /// A write was attempted against a store opened read-only
    #[error("store is read-only: refused to {0}")]
    ReadOnly(&'static str),

    /// A requested entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal invariant violated
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns `true` for contract violations that must never be retried.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ReadOnly(_) | Self::Config(_))
    }
}

/// Error encountered while analyzing a specific file.
///
/// These errors are collected during analysis but don't halt the operation.
/// The driver continues with remaining files and reports all errors at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisError {
    /// Path to the file that failed
    pub path: PathBuf,
    /// Category of the error
    pub kind: AnalysisErrorKind,
    /// Human-readable error message
    pub message: String,
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} ({})",
            self.path.display(),
            self.message,
            self.kind
        )
    }
}

impl std::error::Error for AnalysisError {}

/// Categorization of analysis errors.
///
/// Uses a 4xx/5xx style pattern:
/// - Input problems are issues with the source files (user can fix)
/// - Internal problems are issues with Ripple itself (we need to fix)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisErrorKind {
    // === Input Problems (analogous to HTTP 4xx) ===
    /// Source file has syntax errors that prevent parsing
    ParseFailed,

    /// File type is not supported (unknown extension)
    UnsupportedLanguage,

    /// File content is not valid UTF-8
    EncodingError,

    // === Internal Problems (analogous to HTTP 5xx) ===
    /// Could not read the file from disk
    IoError,

    /// Store operation failed for this file
    StoreError,
}

impl std::fmt::Display for AnalysisErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParseFailed => write!(f, "parse failed"),
            Self::UnsupportedLanguage => write!(f, "unsupported language"),
            Self::EncodingError => write!(f, "encoding error"),
            Self::IoError => write!(f, "I/O error"),
            Self::StoreError => write!(f, "store error"),
        }
    }
}

impl AnalysisErrorKind {
    /// Returns `true` if this is an input problem (4xx-style).
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::ParseFailed | Self::UnsupportedLanguage | Self::EncodingError
        )
    }

    /// Returns `true` if this is an internal problem (5xx-style).
    #[must_use]
    pub fn is_internal_error(&self) -> bool {
        matches!(self, Self::IoError | Self::StoreError)
    }
}

impl AnalysisError {
    /// Create a new analysis error.
    #[must_use]
    pub fn new(path: PathBuf, kind: AnalysisErrorKind, message: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            message: message.into(),
        }
    }

    /// Create a parse error for a file.
    #[must_use]
    pub fn parse_failed(path: PathBuf, message: impl Into<String>) -> Self {
        Self::new(path, AnalysisErrorKind::ParseFailed, message)
    }

    /// Create an unsupported language error.
    #[must_use]
    pub fn unsupported_language(path: PathBuf) -> Self {
        let ext = path
            .extension()
            .map_or_else(|| "none".to_string(), |e| e.to_string_lossy().to_string());
        Self::new(
            path,
            AnalysisErrorKind::UnsupportedLanguage,
            format!("unsupported extension: {ext}"),
        )
    }

    /// Create an encoding error for a file.
    #[must_use]
    pub fn encoding_error(path: PathBuf) -> Self {
        Self::new(
            path,
            AnalysisErrorKind::EncodingError,
            "file is not valid UTF-8",
        )
    }

    /// Create an I/O error for a file.
    #[must_use]
    pub fn io_error(path: PathBuf, error: &std::io::Error) -> Self {
        Self::new(path, AnalysisErrorKind::IoError, error.to_string())
    }
}
