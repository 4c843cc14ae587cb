//! Per-file extraction records shared across language implementations.
//!
//! These types are the output contract of extraction: one [`FileAnalysis`]
//! per source file, holding raw entity records exactly as found. They are
//! not deduplicated and carry no IDs; the entity normalizer does both before
//! graph derivation. All lines are 1-indexed.

use serde::{Deserialize, Serialize};

use crate::types::Language;

/// A function or method definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// Function name
    pub name: String,
    /// First line of the definition
    pub start_line: u32,
    /// Last line of the definition
    pub end_line: u32,
    /// False when the name starts with `_`
    pub is_public: bool,
    /// Source text, when `analysis.include-source` is set
    pub source_excerpt: Option<String>,
    /// Name of the directly enclosing class, for methods
    pub parent_class: Option<String>,
}

/// A class definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    /// Class name
    pub name: String,
    /// First line of the definition
    pub start_line: u32,
    /// Last line of the definition
    pub end_line: u32,
    /// Base class names, final segment only
    pub bases: Vec<String>,
    /// False when the name starts with `_`
    pub is_public: bool,
    /// Source text, when `analysis.include-source` is set
    pub source_excerpt: Option<String>,
}

/// A call expression inside a function body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSite {
    /// Name of the enclosing function
    pub caller: String,
    /// Called name as written (last segment for attribute calls)
    pub called_name: String,
    /// Line of the call expression
    pub call_line: u32,
}

/// A variable definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRecord {
    /// Variable name
    pub name: String,
    /// Line of the assignment
    pub definition_line: u32,
    /// `module` or `function:<name>`
    pub scope: String,
}

/// A read of a known variable inside a function body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableUsageSite {
    /// Variable read
    pub variable_name: String,
    /// Function containing the read
    pub function_name: String,
    /// Line of the read
    pub usage_line: u32,
}

/// An imported name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Imported module or name
    pub imported_name: String,
    /// `module`, `name`, or `*`
    pub import_type: String,
    /// `as` alias
    pub alias: Option<String>,
    /// Line of the import statement
    pub line: u32,
    /// Whether the source module starts with `.`
    pub is_relative: bool,
    /// Source module of a `from X import Y` statement
    pub module: Option<String>,
}

/// What a decorator is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoratorTarget {
    /// A function or method
    Function,
    /// A class
    Class,
}

/// A decorator application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratorRecord {
    /// Decorator name without arguments
    pub name: String,
    /// Line of the decorator
    pub line: u32,
    /// JSON array of argument source texts
    pub arguments: String,
    /// Name of the decorated function or class
    pub target_name: String,
    /// Kind of the decorated definition
    pub target_type: DecoratorTarget,
}

/// A class or instance attribute definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    /// Attribute name
    pub name: String,
    /// Owning class
    pub class_name: String,
    /// Line of the defining assignment
    pub definition_line: u32,
    /// Annotation text, if annotated
    pub type_hint: Option<String>,
    /// True for class-body assignments, false for `self.x = ...`
    pub is_class_attribute: bool,
}

/// Whether an attribute access reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// The attribute is read
    Read,
    /// The attribute is an assignment target
    Write,
}

impl AccessType {
    /// Convert to the edge property representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// An attribute access (`self.x`) inside a method body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeAccessSite {
    /// Method containing the access
    pub function_name: String,
    /// Class enclosing the method
    pub class_name: String,
    /// Attribute accessed
    pub attribute_name: String,
    /// Line of the access
    pub line: u32,
    /// Read or write
    pub access_type: AccessType,
}

/// Whether an exception is raised or caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionContext {
    /// `raise X`
    Raise,
    /// `except X`
    Catch,
}

impl ExceptionContext {
    /// Convert to the edge property representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raise => "raise",
            Self::Catch => "catch",
        }
    }
}

/// An exception raised or caught.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionRecord {
    /// Exception name as written
    pub name: String,
    /// Line of the raise or except clause
    pub line: u32,
    /// Raised or caught
    pub context: ExceptionContext,
    /// Enclosing function, if any
    pub function_name: Option<String>,
}

/// Module-level information derived from the file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    /// Dotted module name
    pub name: String,
    /// True for `__init__.py`
    pub is_package: bool,
    /// First statement of the file, if it is a string
    pub docstring: Option<String>,
}

/// Complete extraction output for a single file.
///
/// `path` may be absolute or project-relative; the normalizer relativizes it.
/// A non-empty `errors` list marks a parse failure and excludes the file from
/// graph derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAnalysis {
    /// Source path
    pub path: String,
    /// Source language
    pub language: Language,
    /// SHA-256 of the contents, hex encoded
    pub content_hash: String,
    /// Function and method definitions
    #[serde(default)]
    pub functions: Vec<FunctionRecord>,
    /// Class definitions
    #[serde(default)]
    pub classes: Vec<ClassRecord>,
    /// Call expressions inside functions
    #[serde(default)]
    pub calls: Vec<CallSite>,
    /// Variable definitions
    #[serde(default)]
    pub variables: Vec<VariableRecord>,
    /// Reads of defined variables inside functions
    #[serde(default)]
    pub variable_usages: Vec<VariableUsageSite>,
    /// Imported names
    #[serde(default)]
    pub imports: Vec<ImportRecord>,
    /// Decorator applications
    #[serde(default)]
    pub decorators: Vec<DecoratorRecord>,
    /// Class and instance attributes
    #[serde(default)]
    pub attributes: Vec<AttributeRecord>,
    /// `self.x` accesses inside methods
    #[serde(default)]
    pub attribute_accesses: Vec<AttributeAccessSite>,
    /// Raised and caught exceptions
    #[serde(default)]
    pub exceptions: Vec<ExceptionRecord>,
    /// Module info, if derived
    #[serde(default)]
    pub module: Option<ModuleRecord>,
    /// Parse errors; non-empty means the file is excluded
    #[serde(default)]
    pub errors: Vec<String>,
}

impl FileAnalysis {
    /// Create an empty analysis for a file.
    #[must_use]
    pub fn new(path: impl Into<String>, language: Language, content_hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language,
            content_hash: content_hash.into(),
            functions: Vec::new(),
            classes: Vec::new(),
            calls: Vec::new(),
            variables: Vec::new(),
            variable_usages: Vec::new(),
            imports: Vec::new(),
            decorators: Vec::new(),
            attributes: Vec::new(),
            attribute_accesses: Vec::new(),
            exceptions: Vec::new(),
            module: None,
            errors: Vec::new(),
        }
    }

    /// Whether the file failed to parse.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
