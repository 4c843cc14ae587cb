//! Database schema definition for Ripple.

/// Database schema definition.
///
/// One row per node, keyed by (kind, natural key). The `props` column holds
/// the node's full JSON row; `file`, `name` and `line` are copied out of it
/// for indexed lookups.
pub(crate) const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS nodes (
    kind TEXT NOT NULL,
    key TEXT NOT NULL,
    file TEXT NOT NULL,
    name TEXT NOT NULL,
    line INTEGER NOT NULL,
    props TEXT NOT NULL,
    PRIMARY KEY (kind, key)
);

CREATE INDEX IF NOT EXISTS idx_nodes_key ON nodes(key);
CREATE INDEX IF NOT EXISTS idx_nodes_name ON nodes(kind, name);
CREATE INDEX IF NOT EXISTS idx_nodes_file ON nodes(file);

-- Edges reference nodes by natural key. Missing line/context are stored as
-- 0 and '' so they take part in the primary key.
CREATE TABLE IF NOT EXISTS edges (
    kind TEXT NOT NULL,
    from_key TEXT NOT NULL,
    to_key TEXT NOT NULL,
    line INTEGER NOT NULL DEFAULT 0,
    context TEXT NOT NULL DEFAULT '',
    position INTEGER,
    PRIMARY KEY (kind, from_key, to_key, line, context)
);

CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_key, kind);
CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_key, kind);
";
