//! Impact analysis over the CALLS relation.
//!
//! Every query is a fresh breadth-first search bounded by `max_depth`; nothing
//! is cached between queries. The search keeps two sets:
//!
//! - **visited**: functions whose neighbors have been looked up, so cycles
//!   terminate
//! - **reported**: functions already emitted (seeded with the origin), so each
//!   function appears once, at its shortest depth, and the origin never does
//!
//! Results are sorted by `(depth, file, function_name, line, impact_type)`, so
//! output never depends on store iteration order.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use super::CallGraphOps;
use crate::error::Result;
use crate::types::{Direction, ImpactEntry, ImpactType, VariableUse};

/// Answers "what breaks if this changes" queries against a call graph.
pub struct ImpactAnalyzer<'a, S: CallGraphOps + ?Sized> {
    graph: &'a S,
}

impl<'a, S: CallGraphOps + ?Sized> ImpactAnalyzer<'a, S> {
    /// Create an analyzer reading from `graph`.
    pub fn new(graph: &'a S) -> Self {
        Self { graph }
    }

    /// Functions affected by a change to `function` in `file`.
    ///
    /// Upstream follows callers, downstream follows callees, and both runs
    /// each direction and tags the entries. `max_depth` 0 yields nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub fn analyze(
        &self,
        file: &str,
        function: &str,
        direction: Direction,
        max_depth: u32,
    ) -> Result<Vec<ImpactEntry>> {
        let mut entries = match direction {
            Direction::Upstream => self.traverse(file, function, ImpactType::Caller, max_depth)?,
            Direction::Downstream => {
                self.traverse(file, function, ImpactType::Callee, max_depth)?
            }
            Direction::Both => {
                let mut entries = self.traverse(file, function, ImpactType::Caller, max_depth)?;
                entries.extend(self.traverse(file, function, ImpactType::Callee, max_depth)?);
                entries
            }
        };

        entries.sort_by(|a, b| {
            (a.depth, &a.file, &a.function_name, a.line, a.impact_type).cmp(&(
                b.depth,
                &b.file,
                &b.function_name,
                b.line,
                b.impact_type,
            ))
        });

        debug!(
            file,
            function,
            direction = direction.as_str(),
            max_depth,
            affected = entries.len(),
            "Impact analysis complete"
        );
        Ok(entries)
    }

    fn traverse(
        &self,
        file: &str,
        function: &str,
        impact_type: ImpactType,
        max_depth: u32,
    ) -> Result<Vec<ImpactEntry>> {
        let origin = (file.to_string(), function.to_string());
        let mut queue = VecDeque::from([(origin.clone(), 0u32)]);
        let mut visited: HashSet<(String, String)> = HashSet::new();
        let mut reported: HashSet<(String, String)> = HashSet::from([origin]);
        let mut entries = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth || !visited.insert(current.clone()) {
                continue;
            }

            let neighbors = match impact_type {
                ImpactType::Caller => self.graph.callers_of(&current.0, &current.1)?,
                ImpactType::Callee => self.graph.callees_of(&current.0, &current.1)?,
            };

            for neighbor in neighbors {
                let key = (neighbor.file, neighbor.function_name);
                if !reported.insert(key.clone()) {
                    continue;
                }

                entries.push(ImpactEntry {
                    function_name: key.1.clone(),
                    file: key.0.clone(),
                    line: neighbor.call_line,
                    impact_type,
                    depth: depth + 1,
                });
                if depth + 1 < max_depth {
                    queue.push_back((key, depth + 1));
                }
            }
        }

        Ok(entries)
    }

    /// Functions that read the variable defined at `(file, name, line)`,
    /// sorted by `(file, function, line)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub fn variable_usage(&self, file: &str, name: &str, line: u32) -> Result<Vec<VariableUse>> {
        let mut uses = self.graph.variable_uses(file, name, line)?;
        uses.sort();
        uses.dedup();
        Ok(uses)
    }
}
