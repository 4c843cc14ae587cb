//! Helper functions for database row conversion and parsing.
//!
//! These utilities convert between database representations and domain types.
//! Also provides SQL column list constants to reduce duplication across query modules.

// SQLite stores integers as i64. Line numbers and positions fit in u32.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::types::{Edge, EdgeKind, EdgeProperties, Node, NodeKind};

/// SQL column list for the nodes table.
///
/// Use with `row_to_node` for consistent column ordering.
pub(crate) const NODE_COLUMNS: &str = "kind, props";

/// SQL column list for the edges table.
///
/// Use with `row_to_edge` for consistent column ordering.
pub(crate) const EDGE_COLUMNS: &str = "kind, from_key, to_key, line, context, position";

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        message.into(),
    )
}

/// Parse a node kind string from the database.
///
/// Returns an error for unrecognized values, indicating possible database corruption.
pub(crate) fn parse_node_kind(s: &str) -> rusqlite::Result<NodeKind> {
    NodeKind::parse(s).ok_or_else(|| {
        conversion_error(
            0,
            format!("Unknown node kind '{s}' in database. Database may be corrupted or from a newer version."),
        )
    })
}

/// Parse an edge kind string from the database.
///
/// Returns an error for unrecognized values, indicating possible database corruption.
pub(crate) fn parse_edge_kind(s: &str) -> rusqlite::Result<EdgeKind> {
    EdgeKind::parse(s).ok_or_else(|| {
        conversion_error(
            0,
            format!("Unknown edge kind '{s}' in database. Database may be corrupted or from a newer version."),
        )
    })
}

/// Convert a row selected with `NODE_COLUMNS` to a `Node`.
pub(crate) fn row_to_node(row: &rusqlite::Row) -> rusqlite::Result<Node> {
    let kind: String = row.get(0)?;
    let props: String = row.get(1)?;
    let kind = parse_node_kind(&kind)?;
    Node::from_row(kind, &props).map_err(|e| conversion_error(1, e.to_string()))
}

/// Convert a row selected with `EDGE_COLUMNS` to an `Edge`.
///
/// Only the properties the kind carries are set, so a stored edge compares
/// equal to the edge that was written.
pub(crate) fn row_to_edge(row: &rusqlite::Row) -> rusqlite::Result<Edge> {
    let kind: String = row.get(0)?;
    let kind = parse_edge_kind(&kind)?;
    let from: String = row.get(1)?;
    let to: String = row.get(2)?;
    let line: i64 = row.get(3)?;
    let context: String = row.get(4)?;
    let position: Option<i64> = row.get(5)?;

    let edge = Edge::new(kind, from, to);
    Ok(match kind.properties() {
        EdgeProperties::None => edge,
        EdgeProperties::Position => edge.with_position(position.unwrap_or(0) as u32),
        EdgeProperties::LineContext(_) => edge.with_line(line as u32).with_context(context),
        EdgeProperties::CallLine => edge.with_line(line as u32),
    })
}
