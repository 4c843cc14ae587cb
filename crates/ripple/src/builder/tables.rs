//! Bulk interchange tables.
//!
//! The bulk path materializes the whole graph as one table per node kind and
//! one per edge kind. On disk a table set is a directory:
//!
//! ```text
//! manifest.json            {"format":"ripple-graph-tables","version":1,...}
//! nodes/<table>.jsonl      one node row per line, fixed columns per kind
//! edges/<table>.jsonl      {"from":..,"to":..} plus the kind's property columns
//! ```
//!
//! Reading is resilient: a missing table or a malformed line becomes a
//! [`LoadWarning`] and the rest still loads. A manifest from another format
//! version is fatal.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{Edge, EdgeKind, EdgeProperties, Node, NodeKind};

/// Identifies the interchange format in the manifest.
pub const TABLES_FORMAT: &str = "ripple-graph-tables";

/// Interchange format version written and accepted.
pub const TABLES_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    format: String,
    version: u32,
    #[serde(default)]
    node_tables: Vec<String>,
    #[serde(default)]
    edge_tables: Vec<String>,
}

/// A complete node/edge table set, keyed by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkTables {
    /// Node rows per kind
    pub nodes: BTreeMap<NodeKind, Vec<Node>>,
    /// Edge rows per kind
    pub edges: BTreeMap<EdgeKind, Vec<Edge>>,
}

/// A recoverable problem found while reading a table directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// A table named by the format has no file; it is treated as empty
    MissingTable { table: String },

    /// A line that could not be decoded into a row; it is skipped
    MalformedRow {
        table: String,
        line_number: usize,
        error: String,
    },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTable { table } => write!(f, "table {table} is missing"),
            Self::MalformedRow {
                table,
                line_number,
                error,
            } => write!(f, "{table} line {line_number}: {error}"),
        }
    }
}

impl BulkTables {
    /// Add a node to its kind's table.
    pub fn push_node(&mut self, node: Node) {
        self.nodes.entry(node.kind()).or_default().push(node);
    }

    /// Add an edge to its kind's table.
    pub fn push_edge(&mut self, edge: Edge) {
        self.edges.entry(edge.kind).or_default().push(edge);
    }

    /// Total rows across node tables.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.values().map(Vec::len).sum()
    }

    /// Total rows across edge tables.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Sort every table and drop duplicate rows.
    ///
    /// Nodes are unique by key within a kind (the last row wins); edges are
    /// unique by value.
    pub fn canonicalize(&mut self) {
        for rows in self.nodes.values_mut() {
            let mut by_key: BTreeMap<String, Node> = BTreeMap::new();
            for node in rows.drain(..) {
                by_key.insert(node.key().to_string(), node);
            }
            rows.extend(by_key.into_values());
        }
        for rows in self.edges.values_mut() {
            let unique: BTreeSet<Edge> = rows.drain(..).collect();
            rows.extend(unique);
        }
    }

    /// Write the table set to `dir`, creating it if needed.
    ///
    /// Every kind gets a table file, empty or not.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be written or a row cannot be
    /// serialized.
    pub fn write_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir.join("nodes"))?;
        fs::create_dir_all(dir.join("edges"))?;

        for kind in NodeKind::LOAD_ORDER {
            let path = dir.join("nodes").join(format!("{}.jsonl", kind.table_name()));
            let mut out = BufWriter::new(File::create(&path)?);
            for node in self.nodes.get(&kind).into_iter().flatten() {
                writeln!(out, "{}", node.to_row()?)?;
            }
            out.flush()?;
        }

        for kind in EdgeKind::LOAD_ORDER {
            let path = dir.join("edges").join(format!("{}.jsonl", kind.table_name()));
            let mut out = BufWriter::new(File::create(&path)?);
            for edge in self.edges.get(&kind).into_iter().flatten() {
                writeln!(out, "{}", serde_json::to_string(&edge_to_row(edge))?)?;
            }
            out.flush()?;
        }

        let manifest = Manifest {
            format: TABLES_FORMAT.to_string(),
            version: TABLES_VERSION,
            node_tables: NodeKind::LOAD_ORDER
                .iter()
                .map(|k| k.table_name().to_string())
                .collect(),
            edge_tables: EdgeKind::LOAD_ORDER
                .iter()
                .map(|k| k.table_name().to_string())
                .collect(),
        };
        fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest)?,
        )?;

        debug!(
            dir = %dir.display(),
            nodes = self.node_count(),
            edges = self.edge_count(),
            "Wrote graph tables"
        );
        Ok(())
    }

    /// Read a table set written by [`BulkTables::write_dir`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the manifest is missing, names another
    /// format, or carries another version. I/O failures other than a missing
    /// table file are returned as errors.
    pub fn read_dir(dir: &Path) -> Result<(Self, Vec<LoadWarning>)> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest_text = match fs::read_to_string(&manifest_path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::Config(format!(
                    "no table manifest at {}",
                    manifest_path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let manifest: Manifest = serde_json::from_str(&manifest_text)?;
        if manifest.format != TABLES_FORMAT || manifest.version != TABLES_VERSION {
            return Err(Error::Config(format!(
                "unsupported table format {} version {} (expected {TABLES_FORMAT} version {TABLES_VERSION})",
                manifest.format, manifest.version
            )));
        }

        let mut tables = Self::default();
        let mut warnings = Vec::new();

        for kind in NodeKind::LOAD_ORDER {
            let table = kind.table_name();
            let path = dir.join("nodes").join(format!("{table}.jsonl"));
            read_table(&path, table, &mut warnings, |line| {
                Node::from_row(kind, line).map_err(|e| e.to_string())
            })?
            .into_iter()
            .for_each(|node| tables.push_node(node));
        }

        for kind in EdgeKind::LOAD_ORDER {
            let table = kind.table_name();
            let path = dir.join("edges").join(format!("{table}.jsonl"));
            read_table(&path, table, &mut warnings, |line| edge_from_row(kind, line))?
                .into_iter()
                .for_each(|edge| tables.push_edge(edge));
        }

        for warning in &warnings {
            warn!(dir = %dir.display(), "{warning}");
        }
        Ok((tables, warnings))
    }
}

/// Read one JSONL table, skipping blank lines and collecting warnings.
fn read_table<T>(
    path: &Path,
    table: &str,
    warnings: &mut Vec<LoadWarning>,
    parse: impl Fn(&str) -> std::result::Result<T, String>,
) -> Result<Vec<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warnings.push(LoadWarning::MissingTable {
                table: table.to_string(),
            });
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut rows = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parse(&line) {
            Ok(row) => rows.push(row),
            Err(error) => warnings.push(LoadWarning::MalformedRow {
                table: table.to_string(),
                line_number: index + 1,
                error,
            }),
        }
    }
    Ok(rows)
}

/// Encode an edge as a row with its kind's column set.
#[must_use]
pub fn edge_to_row(edge: &Edge) -> Value {
    let mut row = Map::new();
    row.insert("from".to_string(), Value::from(edge.from.as_str()));
    row.insert("to".to_string(), Value::from(edge.to.as_str()));

    match edge.kind.properties() {
        EdgeProperties::None => {}
        EdgeProperties::Position => {
            row.insert("position".to_string(), Value::from(edge.position.unwrap_or(0)));
        }
        EdgeProperties::LineContext(column) => {
            row.insert("line".to_string(), Value::from(edge.line.unwrap_or(0)));
            row.insert(
                column.to_string(),
                Value::from(edge.context.clone().unwrap_or_default()),
            );
        }
        EdgeProperties::CallLine => {
            row.insert("call_line".to_string(), Value::from(edge.line.unwrap_or(0)));
        }
    }
    Value::Object(row)
}

/// Decode an edge row of the given kind.
///
/// # Errors
///
/// Returns a description of the first missing or mistyped column.
pub fn edge_from_row(kind: EdgeKind, line: &str) -> std::result::Result<Edge, String> {
    let value: Value = serde_json::from_str(line).map_err(|e| e.to_string())?;
    let row = value
        .as_object()
        .ok_or_else(|| "row is not a JSON object".to_string())?;

    let text = |column: &str| -> std::result::Result<String, String> {
        row.get(column)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| format!("missing string column '{column}'"))
    };
    let number = |column: &str| -> std::result::Result<u32, String> {
        row.get(column)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| format!("missing numeric column '{column}'"))
    };

    let edge = Edge::new(kind, text("from")?, text("to")?);
    Ok(match kind.properties() {
        EdgeProperties::None => edge,
        EdgeProperties::Position => edge.with_position(number("position")?),
        EdgeProperties::LineContext(column) => {
            edge.with_line(number("line")?).with_context(text(column)?)
        }
        EdgeProperties::CallLine => edge.with_line(number("call_line")?),
    })
}
