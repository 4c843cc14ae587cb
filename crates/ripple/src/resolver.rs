//! Cross-file call resolution.
//!
//! Links call-sites to function definitions by name, without comparing every
//! site to every definition. Two hash-join passes over flat rows do the work:
//!
//! 1. `(caller_file, caller_name)` to the caller's definition lines
//! 2. `called_name` to every definition with that name, in any file
//!
//! Each (caller definition, callee definition) pair is one resolved row and
//! becomes one CALLS edge carrying the call line. Resolution is name-only: a
//! call to a name defined in several places links to all of them and the site
//! is counted as ambiguous.

use std::collections::HashMap;

use tracing::debug;

use crate::identity::IdScheme;
use crate::normalize::NormalizedFile;
use crate::types::{Edge, EdgeKind};

/// A flattened call-site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSiteRow<'a> {
    /// File containing the call
    pub caller_file: &'a str,
    /// Enclosing function
    pub caller_name: &'a str,
    /// Name being called
    pub called_name: &'a str,
    /// Line of the call
    pub call_line: u32,
}

/// A flattened function definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefinitionRow<'a> {
    /// Defining file
    pub file: &'a str,
    /// Function name
    pub name: &'a str,
    /// First line of the definition
    pub start_line: u32,
}

/// One caller/callee pair produced by resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResolvedCall<'a> {
    /// Caller file
    pub caller_file: &'a str,
    /// Caller name
    pub caller_name: &'a str,
    /// Caller start line
    pub caller_line: u32,
    /// Callee file
    pub callee_file: &'a str,
    /// Callee name
    pub callee_name: &'a str,
    /// Callee start line
    pub callee_line: u32,
    /// Line of the call
    pub call_line: u32,
}

impl ResolvedCall<'_> {
    /// The CALLS edge for this pair.
    #[must_use]
    pub fn to_edge(&self, ids: &IdScheme) -> Edge {
        Edge::new(
            EdgeKind::Calls,
            ids.function_id(self.caller_file, self.caller_name, self.caller_line),
            ids.function_id(self.callee_file, self.callee_name, self.callee_line),
        )
        .with_line(self.call_line)
    }
}

/// Counts collected during resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Call-sites considered
    pub call_sites: usize,
    /// Caller/callee rows emitted
    pub resolved: usize,
    /// Sites whose enclosing function has no definition
    pub unresolved_callers: usize,
    /// Sites whose called name matches no definition
    pub unresolved_callees: usize,
    /// Sites whose called name matches more than one definition
    pub ambiguous_sites: usize,
}

/// Hash-join index over function definitions.
#[derive(Debug, Default)]
pub struct CallResolver<'a> {
    by_location: HashMap<(&'a str, &'a str), Vec<u32>>,
    by_name: HashMap<&'a str, Vec<(&'a str, u32)>>,
}

impl<'a> CallResolver<'a> {
    /// Index a set of definitions.
    #[must_use]
    pub fn new(definitions: &[DefinitionRow<'a>]) -> Self {
        let mut resolver = Self::default();
        for def in definitions {
            resolver
                .by_location
                .entry((def.file, def.name))
                .or_default()
                .push(def.start_line);
            resolver
                .by_name
                .entry(def.name)
                .or_default()
                .push((def.file, def.start_line));
        }
        resolver
    }

    /// Resolve call-sites against the indexed definitions.
    ///
    /// Rows come out in site order, then definition order.
    #[must_use]
    pub fn resolve(&self, sites: &[CallSiteRow<'a>]) -> (Vec<ResolvedCall<'a>>, ResolutionStats) {
        let mut stats = ResolutionStats {
            call_sites: sites.len(),
            ..ResolutionStats::default()
        };
        let mut rows = Vec::new();

        for site in sites {
            let Some(caller_lines) = self.by_location.get(&(site.caller_file, site.caller_name))
            else {
                stats.unresolved_callers += 1;
                continue;
            };
            let Some(callees) = self.by_name.get(site.called_name) else {
                stats.unresolved_callees += 1;
                continue;
            };
            if callees.len() > 1 {
                stats.ambiguous_sites += 1;
            }

            for &caller_line in caller_lines {
                for &(callee_file, callee_line) in callees {
                    rows.push(ResolvedCall {
                        caller_file: site.caller_file,
                        caller_name: site.caller_name,
                        caller_line,
                        callee_file,
                        callee_name: site.called_name,
                        callee_line,
                        call_line: site.call_line,
                    });
                }
            }
        }

        stats.resolved = rows.len();
        (rows, stats)
    }
}

/// Flatten normalized files into call-site and definition rows.
#[must_use]
pub fn flatten(files: &[NormalizedFile]) -> (Vec<CallSiteRow<'_>>, Vec<DefinitionRow<'_>>) {
    let mut sites = Vec::new();
    let mut definitions = Vec::new();
    for file in files {
        sites.extend(file.calls.iter().map(|call| CallSiteRow {
            caller_file: file.path.as_str(),
            caller_name: call.caller.as_str(),
            called_name: call.called_name.as_str(),
            call_line: call.call_line,
        }));
        definitions.extend(file.functions.iter().map(|f| DefinitionRow {
            file: file.path.as_str(),
            name: f.record.name.as_str(),
            start_line: f.record.start_line,
        }));
    }
    (sites, definitions)
}

/// Resolve every call in a file set into CALLS edges.
#[must_use]
pub fn resolve_calls(files: &[NormalizedFile], ids: &IdScheme) -> (Vec<Edge>, ResolutionStats) {
    let (sites, definitions) = flatten(files);
    let resolver = CallResolver::new(&definitions);
    let (rows, stats) = resolver.resolve(&sites);
    let edges = rows.iter().map(|row| row.to_edge(ids)).collect();

    debug!(
        call_sites = stats.call_sites,
        resolved = stats.resolved,
        unresolved_callers = stats.unresolved_callers,
        unresolved_callees = stats.unresolved_callees,
        ambiguous = stats.ambiguous_sites,
        "Resolved call-sites"
    );
    (edges, stats)
}
