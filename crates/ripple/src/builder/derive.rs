//! Per-file graph derivation shared by both construction paths.
//!
//! `derive_file` turns one normalized file into its nodes and same-file edges.
//! Same-file links resolve through name dictionaries built once per file;
//! where a name has several candidates the first in record order wins and the
//! lookup is counted as ambiguous. A link whose endpoint cannot be found is
//! dropped and counted per edge kind.
//!
//! INHERITS is the only cross-file relation. Its target is chosen by
//! [`canonical_class`], which both paths call with the same candidate set.

use std::collections::{BTreeMap, HashMap};

use crate::languages::common::DecoratorTarget;
use crate::normalize::NormalizedFile;
use crate::types::{
    AttributeNode, ClassNode, DecoratorNode, Edge, EdgeKind, ExceptionNode, FileNode,
    FunctionNode, ImportNode, ModuleNode, Node, VariableNode,
};

/// Nodes and edges derived from one file.
#[derive(Debug, Clone, Default)]
pub struct DerivedFile {
    /// Nodes owned by the file, the file node first
    pub nodes: Vec<Node>,
    /// Same-file edges
    pub edges: Vec<Edge>,
    /// Unresolved and ambiguous lookups
    pub counts: DeriveCounts,
}

/// Lookup outcomes recorded while deriving edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeriveCounts {
    /// Links dropped because an endpoint could not be resolved, per kind
    pub unresolved: BTreeMap<EdgeKind, usize>,
    /// Lookups that had more than one candidate, per kind
    pub ambiguous: BTreeMap<EdgeKind, usize>,
}

impl DeriveCounts {
    pub(crate) fn miss(&mut self, kind: EdgeKind) {
        *self.unresolved.entry(kind).or_default() += 1;
    }

    pub(crate) fn ambiguity(&mut self, kind: EdgeKind) {
        *self.ambiguous.entry(kind).or_default() += 1;
    }

    /// Add another set of counts into this one.
    pub fn merge(&mut self, other: &DeriveCounts) {
        for (kind, n) in &other.unresolved {
            *self.unresolved.entry(*kind).or_default() += n;
        }
        for (kind, n) in &other.ambiguous {
            *self.ambiguous.entry(*kind).or_default() += n;
        }
    }
}

/// Name-to-ID dictionaries for one file, in normalized record order.
struct FileLookup<'a> {
    functions: HashMap<&'a str, Vec<&'a str>>,
    classes: HashMap<&'a str, Vec<&'a str>>,
    variables: HashMap<&'a str, Vec<&'a str>>,
    attributes: HashMap<(&'a str, &'a str), Vec<&'a str>>,
}

impl<'a> FileLookup<'a> {
    fn new(file: &'a NormalizedFile) -> Self {
        let mut functions: HashMap<&str, Vec<&str>> = HashMap::new();
        for f in &file.functions {
            functions
                .entry(f.record.name.as_str())
                .or_default()
                .push(f.id.as_str());
        }
        let mut classes: HashMap<&str, Vec<&str>> = HashMap::new();
        for c in &file.classes {
            classes
                .entry(c.record.name.as_str())
                .or_default()
                .push(c.id.as_str());
        }
        let mut variables: HashMap<&str, Vec<&str>> = HashMap::new();
        for v in &file.variables {
            variables
                .entry(v.record.name.as_str())
                .or_default()
                .push(v.id.as_str());
        }
        let mut attributes: HashMap<(&str, &str), Vec<&str>> = HashMap::new();
        for a in &file.attributes {
            attributes
                .entry((a.record.class_name.as_str(), a.record.name.as_str()))
                .or_default()
                .push(a.id.as_str());
        }
        Self {
            functions,
            classes,
            variables,
            attributes,
        }
    }
}

/// First candidate of a lookup, counting ambiguity and misses under `kind`.
fn first<'a>(
    candidates: Option<&Vec<&'a str>>,
    kind: EdgeKind,
    counts: &mut DeriveCounts,
) -> Option<&'a str> {
    match candidates.map(Vec::as_slice) {
        Some([only]) => Some(*only),
        Some([head, ..]) => {
            counts.ambiguity(kind);
            Some(*head)
        }
        _ => {
            counts.miss(kind);
            None
        }
    }
}

/// Derive the nodes and same-file edges of one normalized file.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn derive_file(file: &NormalizedFile) -> DerivedFile {
    let path = file.path.as_str();
    let lookup = FileLookup::new(file);
    let mut out = DerivedFile::default();
    let counts = &mut out.counts;

    out.nodes.push(Node::File(FileNode {
        path: file.path.clone(),
        language: file.language,
        content_hash: file.content_hash.clone(),
    }));

    for f in &file.functions {
        let r = &f.record;
        out.nodes.push(Node::Function(FunctionNode {
            id: f.id.clone(),
            name: r.name.clone(),
            file: file.path.clone(),
            start_line: r.start_line,
            end_line: r.end_line,
            is_public: r.is_public,
            source_excerpt: r.source_excerpt.clone(),
        }));
        out.edges
            .push(Edge::new(EdgeKind::ContainsFunction, path, f.id.as_str()));

        if let Some(class) = &r.parent_class {
            if let Some(class_id) = first(
                lookup.classes.get(class.as_str()),
                EdgeKind::MethodOf,
                counts,
            ) {
                out.edges
                    .push(Edge::new(EdgeKind::MethodOf, f.id.as_str(), class_id));
            }
        }
    }

    for c in &file.classes {
        let r = &c.record;
        out.nodes.push(Node::Class(ClassNode {
            id: c.id.clone(),
            name: r.name.clone(),
            file: file.path.clone(),
            start_line: r.start_line,
            end_line: r.end_line,
            base_names: r.bases.clone(),
            is_public: r.is_public,
            source_excerpt: r.source_excerpt.clone(),
        }));
        out.edges
            .push(Edge::new(EdgeKind::ContainsClass, path, c.id.as_str()));
    }

    for v in &file.variables {
        let r = &v.record;
        out.nodes.push(Node::Variable(VariableNode {
            id: v.id.clone(),
            name: r.name.clone(),
            file: file.path.clone(),
            definition_line: r.definition_line,
            scope: r.scope.clone(),
        }));
        out.edges
            .push(Edge::new(EdgeKind::ContainsVariable, path, v.id.as_str()));

        if let Some(function) = r.scope.strip_prefix("function:") {
            if let Some(function_id) = first(
                lookup.functions.get(function),
                EdgeKind::References,
                counts,
            ) {
                out.edges.push(
                    Edge::new(EdgeKind::References, function_id, v.id.as_str())
                        .with_line(r.definition_line)
                        .with_context("define"),
                );
            }
        }
    }

    for i in &file.imports {
        let r = &i.record;
        out.nodes.push(Node::Import(ImportNode {
            id: i.id.clone(),
            imported_name: r.imported_name.clone(),
            import_type: r.import_type.clone(),
            alias: r.alias.clone(),
            line: r.line,
            is_relative: r.is_relative,
            file: file.path.clone(),
        }));
        out.edges
            .push(Edge::new(EdgeKind::HasImport, path, i.id.as_str()));
    }

    // Position is the rank by line among decorators of the same target
    let mut by_target: HashMap<(DecoratorTarget, &str), Vec<(u32, usize)>> = HashMap::new();
    for (index, d) in file.decorators.iter().enumerate() {
        by_target
            .entry((d.record.target_type, d.record.target_name.as_str()))
            .or_default()
            .push((d.record.line, index));
    }
    let mut positions = vec![0u32; file.decorators.len()];
    for group in by_target.values_mut() {
        group.sort_unstable();
        for (rank, (_, index)) in group.iter().enumerate() {
            positions[*index] = u32::try_from(rank).unwrap_or(u32::MAX);
        }
    }

    for (d, position) in file.decorators.iter().zip(positions) {
        let r = &d.record;
        out.nodes.push(Node::Decorator(DecoratorNode {
            id: d.id.clone(),
            name: r.name.clone(),
            file: file.path.clone(),
            line: r.line,
            arguments: r.arguments.clone(),
        }));

        let targets = match r.target_type {
            DecoratorTarget::Function => lookup.functions.get(r.target_name.as_str()),
            DecoratorTarget::Class => lookup.classes.get(r.target_name.as_str()),
        };
        if let Some(target_id) = first(targets, EdgeKind::DecoratedBy, counts) {
            out.edges.push(
                Edge::new(EdgeKind::DecoratedBy, target_id, d.id.as_str()).with_position(position),
            );
        }
    }

    for a in &file.attributes {
        let r = &a.record;
        out.nodes.push(Node::Attribute(AttributeNode {
            id: a.id.clone(),
            name: r.name.clone(),
            class_name: r.class_name.clone(),
            file: file.path.clone(),
            definition_line: r.definition_line,
            type_hint: r.type_hint.clone(),
            is_class_attribute: r.is_class_attribute,
        }));

        if let Some(class_id) = first(
            lookup.classes.get(r.class_name.as_str()),
            EdgeKind::HasAttribute,
            counts,
        ) {
            out.edges
                .push(Edge::new(EdgeKind::HasAttribute, class_id, a.id.as_str()));
        }
    }

    for e in &file.exceptions {
        let r = &e.record;
        out.nodes.push(Node::Exception(ExceptionNode {
            id: e.id.clone(),
            name: r.name.clone(),
            file: file.path.clone(),
            line: r.line,
        }));

        let Some(function) = &r.function_name else {
            continue;
        };
        if let Some(function_id) = first(
            lookup.functions.get(function.as_str()),
            EdgeKind::HandlesException,
            counts,
        ) {
            out.edges.push(
                Edge::new(EdgeKind::HandlesException, function_id, e.id.as_str())
                    .with_line(r.line)
                    .with_context(r.context.as_str()),
            );
        }
    }

    if let Some(m) = &file.module {
        out.nodes.push(Node::Module(ModuleNode {
            id: m.id.clone(),
            name: m.record.name.clone(),
            file: file.path.clone(),
            is_package: m.record.is_package,
            docstring: m.record.docstring.clone(),
        }));
        out.edges.push(Edge::new(EdgeKind::ModuleOf, path, m.id.as_str()));
    }

    for site in &file.variable_usages {
        let Some(function_id) = first(
            lookup.functions.get(site.function_name.as_str()),
            EdgeKind::References,
            counts,
        ) else {
            continue;
        };
        if let Some(variable_id) = first(
            lookup.variables.get(site.variable_name.as_str()),
            EdgeKind::References,
            counts,
        ) {
            out.edges.push(
                Edge::new(EdgeKind::References, function_id, variable_id)
                    .with_line(site.usage_line)
                    .with_context("use"),
            );
        }
    }

    for site in &file.attribute_accesses {
        let Some(function_id) = first(
            lookup.functions.get(site.function_name.as_str()),
            EdgeKind::Accesses,
            counts,
        ) else {
            continue;
        };
        let key = (site.class_name.as_str(), site.attribute_name.as_str());
        if let Some(attribute_id) = first(lookup.attributes.get(&key), EdgeKind::Accesses, counts)
        {
            out.edges.push(
                Edge::new(EdgeKind::Accesses, function_id, attribute_id)
                    .with_line(site.line)
                    .with_context(site.access_type.as_str()),
            );
        }
    }

    out
}

/// A class that an INHERITS base name may resolve to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClassCandidate {
    /// Defining file
    pub file: String,
    /// First line of the class
    pub start_line: u32,
    /// Class ID
    pub id: String,
}

/// Pick the INHERITS target among classes sharing a base name.
///
/// The winner is the smallest `(file, start_line, id)`, excluding the
/// inheriting class itself, so the choice never depends on input order.
/// Returns the winner and whether the lookup was ambiguous.
#[must_use]
pub fn canonical_class<'a>(
    candidates: &'a [ClassCandidate],
    inheriting_id: &str,
) -> Option<(&'a ClassCandidate, bool)> {
    let mut eligible = candidates.iter().filter(|c| c.id != inheriting_id);
    let mut best = eligible.next()?;
    let mut ambiguous = false;
    for candidate in eligible {
        ambiguous = true;
        if candidate < best {
            best = candidate;
        }
    }
    Some((best, ambiguous))
}

/// Index of every class across a file set, by name.
#[must_use]
pub fn class_index(files: &[NormalizedFile]) -> HashMap<&str, Vec<ClassCandidate>> {
    let mut index: HashMap<&str, Vec<ClassCandidate>> = HashMap::new();
    for file in files {
        for class in &file.classes {
            index
                .entry(class.record.name.as_str())
                .or_default()
                .push(ClassCandidate {
                    file: file.path.clone(),
                    start_line: class.record.start_line,
                    id: class.id.clone(),
                });
        }
    }
    index
}
