//! Domain types for the Ripple dependency graph.
//!
//! These types represent the graph domain model:
//! - **Kinds**: `NodeKind`, `EdgeKind` (the closed vocabulary of the graph)
//! - **Nodes**: one row struct per node kind, wrapped by the `Node` enum
//! - **Edges**: `Edge`, a directed link between two node keys with optional properties
//! - **Results**: `ImpactEntry`, `VariableUse`, `GraphStats`, `IndexReport`
//!
//! ## Design Decisions
//!
//! | Decision | Choice | Rationale |
//! |----------|--------|-----------|
//! | Node rows | One struct per kind | The bulk tables need a fixed column set per kind |
//! | Node keys | ID string, path for files | Edges reference endpoints by natural key |
//! | Edge identity | (kind, from, to, line, context) | Multiple call lines between two functions stay distinct |
//! | File paths | Project-relative, `/`-separated | Identical graphs across checkouts |

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Error};

// ============================================================================
// Enums
// ============================================================================

/// Supported source languages.
///
/// Adding a new language requires implementing the `LanguageSupport` trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Python source files (`.py`)
    Python,
}

impl Language {
    /// File extensions handled by this language.
    #[must_use]
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Python => &["py"],
        }
    }

    /// Detect language from file extension.
    ///
    /// # Returns
    ///
    /// `None` if the extension is not recognized.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "py" => Some(Self::Python),
            _ => None,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
        }
    }
}

/// Node kinds stored in the graph.
///
/// The declaration order is the bulk-load order: files first, so every
/// containment edge finds its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A source file, keyed by its project-relative path
    File,
    /// A function or method definition
    Function,
    /// A class definition
    Class,
    /// A module- or function-scoped variable
    Variable,
    /// An imported name
    Import,
    /// A decorator application
    Decorator,
    /// A class or instance attribute
    Attribute,
    /// An exception raised or caught
    Exception,
    /// The module a file declares
    Module,
}

impl NodeKind {
    /// Every node kind, in bulk-load order.
    pub const LOAD_ORDER: [Self; 9] = [
        Self::File,
        Self::Function,
        Self::Class,
        Self::Variable,
        Self::Import,
        Self::Decorator,
        Self::Attribute,
        Self::Exception,
        Self::Module,
    ];

    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Function => "function",
            Self::Class => "class",
            Self::Variable => "variable",
            Self::Import => "import",
            Self::Decorator => "decorator",
            Self::Attribute => "attribute",
            Self::Exception => "exception",
            Self::Module => "module",
        }
    }

    /// Name of this kind's bulk interchange table.
    #[must_use]
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::File => "files",
            Self::Function => "functions",
            Self::Class => "classes",
            Self::Variable => "variables",
            Self::Import => "imports",
            Self::Decorator => "decorators",
            Self::Attribute => "attributes",
            Self::Exception => "exceptions",
            Self::Module => "modules",
        }
    }

    /// Parse the database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::LOAD_ORDER.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge kinds stored in the graph.
///
/// The declaration order is the bulk-load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// File contains a function
    ContainsFunction,
    /// File contains a class
    ContainsClass,
    /// File contains a variable
    ContainsVariable,
    /// Function is a method of a class
    MethodOf,
    /// File has an import
    HasImport,
    /// Class has an attribute
    HasAttribute,
    /// Function or class is decorated by a decorator (`position`)
    DecoratedBy,
    /// Function references a variable (`line`, `context`)
    References,
    /// Function accesses an attribute (`line`, `access_type`)
    Accesses,
    /// Function raises or catches an exception (`line`, `context`)
    HandlesException,
    /// File declares a module
    ModuleOf,
    /// Class inherits from a class
    Inherits,
    /// Function calls a function (`call_line`)
    Calls,
}

impl EdgeKind {
    /// Every edge kind, in bulk-load order.
    pub const LOAD_ORDER: [Self; 13] = [
        Self::ContainsFunction,
        Self::ContainsClass,
        Self::ContainsVariable,
        Self::MethodOf,
        Self::HasImport,
        Self::HasAttribute,
        Self::DecoratedBy,
        Self::References,
        Self::Accesses,
        Self::HandlesException,
        Self::ModuleOf,
        Self::Inherits,
        Self::Calls,
    ];

    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContainsFunction => "CONTAINS_FUNCTION",
            Self::ContainsClass => "CONTAINS_CLASS",
            Self::ContainsVariable => "CONTAINS_VARIABLE",
            Self::MethodOf => "METHOD_OF",
            Self::HasImport => "HAS_IMPORT",
            Self::HasAttribute => "HAS_ATTRIBUTE",
            Self::DecoratedBy => "DECORATED_BY",
            Self::References => "REFERENCES",
            Self::Accesses => "ACCESSES",
            Self::HandlesException => "HANDLES_EXCEPTION",
            Self::ModuleOf => "MODULE_OF",
            Self::Inherits => "INHERITS",
            Self::Calls => "CALLS",
        }
    }

    /// Name of this kind's bulk interchange table.
    #[must_use]
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::ContainsFunction => "contains_function",
            Self::ContainsClass => "contains_class",
            Self::ContainsVariable => "contains_variable",
            Self::MethodOf => "method_of",
            Self::HasImport => "has_import",
            Self::HasAttribute => "has_attribute",
            Self::DecoratedBy => "decorated_by",
            Self::References => "references",
            Self::Accesses => "accesses",
            Self::HandlesException => "handles_exception",
            Self::ModuleOf => "module_of",
            Self::Inherits => "inherits",
            Self::Calls => "calls",
        }
    }

    /// Parse the database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::LOAD_ORDER.into_iter().find(|k| k.as_str() == s)
    }

    /// Shape of this kind's property columns.
    #[must_use]
    pub fn properties(&self) -> EdgeProperties {
        match self {
            Self::DecoratedBy => EdgeProperties::Position,
            Self::References | Self::HandlesException => EdgeProperties::LineContext("context"),
            Self::Accesses => EdgeProperties::LineContext("access_type"),
            Self::Calls => EdgeProperties::CallLine,
            _ => EdgeProperties::None,
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Property columns carried by an edge kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeProperties {
    /// Endpoints only
    None,
    /// `position`
    Position,
    /// `line` plus a named context column
    LineContext(&'static str),
    /// `call_line`
    CallLine,
}

/// Direction of an impact query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Callers of the target (who breaks if it changes)
    Upstream,
    /// Callees of the target (what it depends on)
    Downstream,
    /// Both directions, tagged per entry
    Both,
}

impl Direction {
    /// Convert to the CLI string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upstream => "upstream",
            Self::Downstream => "downstream",
            Self::Both => "both",
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upstream" => Ok(Self::Upstream),
            "downstream" => Ok(Self::Downstream),
            "both" => Ok(Self::Both),
            other => Err(Error::Config(format!(
                "invalid direction: {other}; must be 'upstream', 'downstream', or 'both'"
            ))),
        }
    }
}

/// How an impact entry relates to the query target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactType {
    /// Reached over an inverse CALLS edge
    Caller,
    /// Reached over a CALLS edge
    Callee,
}

impl ImpactType {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Caller => "caller",
            Self::Callee => "callee",
        }
    }
}

/// How graph derivation reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// One file at a time through keyed upserts
    #[default]
    Incremental,
    /// All files at once through the bulk tables
    Bulk,
}

// ============================================================================
// Node rows
// ============================================================================

/// A source file node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    /// Project-relative path (the node key)
    pub path: String,
    /// Source language
    pub language: Language,
    /// SHA-256 of the file contents, hex encoded
    pub content_hash: String,
}

/// A function or method definition node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionNode {
    /// Content-addressed ID (the node key)
    pub id: String,
    /// Function name
    pub name: String,
    /// Project-relative path
    pub file: String,
    /// First line
    pub start_line: u32,
    /// Last line
    pub end_line: u32,
    /// False when the name starts with `_`
    pub is_public: bool,
    /// Source text, if captured
    pub source_excerpt: Option<String>,
}

/// A class definition node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNode {
    /// Content-addressed ID (the node key)
    pub id: String,
    /// Class name
    pub name: String,
    /// Project-relative path
    pub file: String,
    /// First line
    pub start_line: u32,
    /// Last line
    pub end_line: u32,
    /// Base class names as written (name-only)
    pub base_names: Vec<String>,
    /// False when the name starts with `_`
    pub is_public: bool,
    /// Source text, if captured
    pub source_excerpt: Option<String>,
}

/// A variable definition node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableNode {
    /// Content-addressed ID (the node key)
    pub id: String,
    /// Variable name
    pub name: String,
    /// Project-relative path
    pub file: String,
    /// Line of the assignment
    pub definition_line: u32,
    /// `module` or `function:<name>`
    pub scope: String,
}

/// An imported-name node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportNode {
    /// Content-addressed ID (the node key)
    pub id: String,
    /// Imported module or name
    pub imported_name: String,
    /// `module`, `name`, or `*`
    pub import_type: String,
    /// `as` alias
    pub alias: Option<String>,
    /// Line of the import statement
    pub line: u32,
    /// Whether the import is relative
    pub is_relative: bool,
    /// Project-relative path of the importing file
    pub file: String,
}

/// A decorator application node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoratorNode {
    /// Content-addressed ID (the node key)
    pub id: String,
    /// Decorator name
    pub name: String,
    /// Project-relative path
    pub file: String,
    /// Line of the decorator
    pub line: u32,
    /// JSON array of argument source texts
    pub arguments: String,
}

/// A class or instance attribute node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeNode {
    /// Content-addressed ID (the node key)
    pub id: String,
    /// Attribute name
    pub name: String,
    /// Owning class
    pub class_name: String,
    /// Project-relative path
    pub file: String,
    /// Line of the defining assignment
    pub definition_line: u32,
    /// Annotation text, if any
    pub type_hint: Option<String>,
    /// Class-body attribute rather than instance attribute
    pub is_class_attribute: bool,
}

/// An exception node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionNode {
    /// Content-addressed ID (the node key)
    pub id: String,
    /// Exception name
    pub name: String,
    /// Project-relative path
    pub file: String,
    /// Line of the raise or except clause
    pub line: u32,
}

/// A module node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleNode {
    /// Content-addressed ID (the node key)
    pub id: String,
    /// Dotted module name (e.g., `pkg.util`)
    pub name: String,
    /// Project-relative path of the declaring file
    pub file: String,
    /// True for `__init__.py`
    pub is_package: bool,
    /// Module docstring
    pub docstring: Option<String>,
}

/// Any graph node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A source file
    File(FileNode),
    /// A function or method
    Function(FunctionNode),
    /// A class
    Class(ClassNode),
    /// A variable
    Variable(VariableNode),
    /// An imported name
    Import(ImportNode),
    /// A decorator application
    Decorator(DecoratorNode),
    /// A class or instance attribute
    Attribute(AttributeNode),
    /// An exception raised or caught
    Exception(ExceptionNode),
    /// A module
    Module(ModuleNode),
}

impl Node {
    /// The kind of this node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::File(_) => NodeKind::File,
            Self::Function(_) => NodeKind::Function,
            Self::Class(_) => NodeKind::Class,
            Self::Variable(_) => NodeKind::Variable,
            Self::Import(_) => NodeKind::Import,
            Self::Decorator(_) => NodeKind::Decorator,
            Self::Attribute(_) => NodeKind::Attribute,
            Self::Exception(_) => NodeKind::Exception,
            Self::Module(_) => NodeKind::Module,
        }
    }

    /// The natural key edges use to reference this node.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::File(n) => &n.path,
            Self::Function(n) => &n.id,
            Self::Class(n) => &n.id,
            Self::Variable(n) => &n.id,
            Self::Import(n) => &n.id,
            Self::Decorator(n) => &n.id,
            Self::Attribute(n) => &n.id,
            Self::Exception(n) => &n.id,
            Self::Module(n) => &n.id,
        }
    }

    /// Project-relative path of the file this node belongs to.
    #[must_use]
    pub fn file(&self) -> &str {
        match self {
            Self::File(n) => &n.path,
            Self::Function(n) => &n.file,
            Self::Class(n) => &n.file,
            Self::Variable(n) => &n.file,
            Self::Import(n) => &n.file,
            Self::Decorator(n) => &n.file,
            Self::Attribute(n) => &n.file,
            Self::Exception(n) => &n.file,
            Self::Module(n) => &n.file,
        }
    }

    /// Display name of this node.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::File(n) => &n.path,
            Self::Function(n) => &n.name,
            Self::Class(n) => &n.name,
            Self::Variable(n) => &n.name,
            Self::Import(n) => &n.imported_name,
            Self::Decorator(n) => &n.name,
            Self::Attribute(n) => &n.name,
            Self::Exception(n) => &n.name,
            Self::Module(n) => &n.name,
        }
    }

    /// Line the node starts on (0 for files and modules).
    #[must_use]
    pub fn line(&self) -> u32 {
        match self {
            Self::File(_) | Self::Module(_) => 0,
            Self::Function(n) => n.start_line,
            Self::Class(n) => n.start_line,
            Self::Variable(n) => n.definition_line,
            Self::Import(n) => n.line,
            Self::Decorator(n) => n.line,
            Self::Attribute(n) => n.definition_line,
            Self::Exception(n) => n.line,
        }
    }

    /// Serialize the row columns of this node as a JSON object.
    pub fn to_row(&self) -> serde_json::Result<String> {
        match self {
            Self::File(n) => serde_json::to_string(n),
            Self::Function(n) => serde_json::to_string(n),
            Self::Class(n) => serde_json::to_string(n),
            Self::Variable(n) => serde_json::to_string(n),
            Self::Import(n) => serde_json::to_string(n),
            Self::Decorator(n) => serde_json::to_string(n),
            Self::Attribute(n) => serde_json::to_string(n),
            Self::Exception(n) => serde_json::to_string(n),
            Self::Module(n) => serde_json::to_string(n),
        }
    }

    /// Deserialize a row of the given kind.
    pub fn from_row(kind: NodeKind, row: &str) -> serde_json::Result<Self> {
        Ok(match kind {
            NodeKind::File => Self::File(serde_json::from_str(row)?),
            NodeKind::Function => Self::Function(serde_json::from_str(row)?),
            NodeKind::Class => Self::Class(serde_json::from_str(row)?),
            NodeKind::Variable => Self::Variable(serde_json::from_str(row)?),
            NodeKind::Import => Self::Import(serde_json::from_str(row)?),
            NodeKind::Decorator => Self::Decorator(serde_json::from_str(row)?),
            NodeKind::Attribute => Self::Attribute(serde_json::from_str(row)?),
            NodeKind::Exception => Self::Exception(serde_json::from_str(row)?),
            NodeKind::Module => Self::Module(serde_json::from_str(row)?),
        })
    }
}

// ============================================================================
// Edges
// ============================================================================

/// A directed edge between two node keys.
///
/// Unused properties are `None`. Which properties a kind carries is fixed by
/// [`EdgeKind::properties`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    /// Relationship type
    pub kind: EdgeKind,
    /// Source node key
    pub from: String,
    /// Target node key
    pub to: String,
    /// `line` or `call_line`
    pub line: Option<u32>,
    /// `context` or `access_type`
    pub context: Option<String>,
    /// `position` (DECORATED_BY only)
    pub position: Option<u32>,
}

impl Edge {
    /// Create an edge with no properties.
    #[must_use]
    pub fn new(kind: EdgeKind, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            kind,
            from: from.into(),
            to: to.into(),
            line: None,
            context: None,
            position: None,
        }
    }

    /// Set the line property.
    #[must_use]
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    /// Set the context property.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the position property.
    #[must_use]
    pub fn with_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }
}

// ============================================================================
// Query results
// ============================================================================

/// One function reached by an impact query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactEntry {
    /// Affected function
    pub function_name: String,
    /// File of the affected function
    pub file: String,
    /// Call line of the edge that first reached this function
    pub line: u32,
    /// Caller or callee
    pub impact_type: ImpactType,
    /// Hops from the query target (>= 1)
    pub depth: u32,
}

/// A function that reads a variable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableUse {
    /// File of the reading function
    pub file: String,
    /// Reading function
    pub function: String,
    /// Line of the read
    pub line: u32,
}

/// A function that writes a class attribute.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeWrite {
    /// File of the writing function
    pub file: String,
    /// Name of the writing function
    pub function: String,
    /// Line of the write
    pub line: u32,
}

/// A frequently called function, for statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalledFunction {
    /// File of the function
    pub file: String,
    /// Function name
    pub name: String,
    /// Incoming CALLS edges
    pub call_count: usize,
}

/// Statistics about the stored graph.
#[derive(Debug, Clone, Default)]
pub struct GraphStats {
    /// Node counts by kind
    pub nodes_by_kind: BTreeMap<NodeKind, usize>,
    /// Edge counts by kind
    pub edges_by_kind: BTreeMap<EdgeKind, usize>,
    /// Functions with the most incoming CALLS edges, most called first
    pub most_called: Vec<CalledFunction>,
}

impl GraphStats {
    /// Total number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes_by_kind.values().sum()
    }

    /// Total number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges_by_kind.values().sum()
    }
}

/// A set of functions that call each other in a loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallCycle {
    /// (file, function) members, sorted
    pub functions: Vec<(String, String)>,
}

/// Summary of an indexing run.
#[derive(Debug, Default)]
pub struct IndexReport {
    /// Files discovered in the workspace
    pub files_discovered: usize,
    /// Files analyzed and written to the graph
    pub files_indexed: usize,
    /// Files skipped because their content hash was unchanged
    pub files_unchanged: usize,
    /// Files no longer in the workspace whose data was deleted
    pub files_removed: usize,
    /// Previously indexed files that now fail to analyze; their data was deleted
    pub files_invalidated: usize,
    /// Entity normalization counts
    pub normalize: crate::normalize::NormalizeStats,
    /// Node/edge derivation and write counts
    pub build: crate::builder::BuildStats,
    /// Call resolution counts
    pub calls: crate::resolver::ResolutionStats,
    /// Files that failed to analyze
    pub errors: Vec<AnalysisError>,
    /// Wall-clock duration of the run
    pub duration: std::time::Duration,
}
