//! # Ripple: Dependency Graph Construction and Impact Analysis
//!
//! Ripple parses Python sources with tree-sitter, turns the extracted
//! entities into a property graph stored in `SQLite`, and answers "what is
//! affected if this function changes" by walking the CALLS relation.
//!
//! ## Pipeline
//!
//! 1. **Analyze**: each file is parsed and extracted in parallel into a
//!    [`FileAnalysis`].
//! 2. **Normalize**: entities get deterministic, content-addressed IDs and
//!    duplicates are dropped.
//! 3. **Build**: nodes and edges are written incrementally through a single
//!    background writer, or materialized as tables and bulk loaded.
//! 4. **Resolve calls**: call-sites are matched to function definitions with
//!    two hash indexes.
//! 5. **Query**: depth-bounded impact analysis, variable usage, statistics.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ripple::{BuildMode, Direction, Ripple};
//! use std::path::Path;
//!
//! let ripple = Ripple::new(Path::new("/path/to/workspace"))?;
//!
//! let report = ripple.index(BuildMode::Incremental)?;
//! println!("Indexed {} files", report.files_indexed);
//!
//! for entry in ripple.impact("app/service.py", "handle", Direction::Upstream, None)? {
//!     println!("{} {}:{} (depth {})", entry.function_name, entry.file, entry.line, entry.depth);
//! }
//! # Ok::<(), ripple::Error>(())
//! ```

pub mod batch_writer;
pub mod builder;
pub mod config;
pub mod db;
mod error;
pub mod graph;
pub mod identity;
pub mod languages;
pub mod normalize;
pub mod parallel;
pub mod parser;
pub mod resolver;
mod types;

pub use builder::{BuildStats, BulkTables, LoadWarning};
pub use config::RippleConfig;
pub use db::SqliteStore;
pub use error::{AnalysisError, AnalysisErrorKind, Error, Result};
pub use graph::{CallGraphOps, GraphStore, ImpactAnalyzer, LoadStats};
pub use identity::IdScheme;
pub use languages::common::FileAnalysis;
pub use normalize::{EntityNormalizer, NormalizeStats, NormalizedFile};
pub use resolver::{CallResolver, ResolutionStats};
pub use types::*;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use batch_writer::BatchWriter;
use builder::GraphBuilder;
use graph::find_call_cycles;
use resolver::resolve_calls;

/// A Python workspace and its dependency graph.
///
/// `Ripple` is the main entry point. It owns the workspace configuration and
/// the graph store, and drives analysis, graph construction, and queries.
pub struct Ripple {
    workspace_root: PathBuf,
    config: RippleConfig,
    ids: IdScheme,
    db_path: PathBuf,
    store: SqliteStore,
}

impl Ripple {
    /// Open a workspace for indexing and queries.
    ///
    /// Loads `.ripple/config.yaml` if present and opens (or creates) the
    /// graph database at the configured path.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace does not exist, the config is
    /// invalid, or the database cannot be opened.
    pub fn new(workspace_root: &Path) -> Result<Self> {
        let (workspace_root, config, ids, db_path) = Self::prepare(workspace_root)?;
        let store = SqliteStore::open(&db_path)?;
        Ok(Self {
            workspace_root,
            config,
            ids,
            db_path,
            store,
        })
    }

    /// Open a workspace for queries only.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the workspace has not been indexed, or
    /// the same errors as [`Ripple::new`].
    pub fn open_read_only(workspace_root: &Path) -> Result<Self> {
        let (workspace_root, config, ids, db_path) = Self::prepare(workspace_root)?;
        let store = SqliteStore::open_read_only(&db_path)?;
        Ok(Self {
            workspace_root,
            config,
            ids,
            db_path,
            store,
        })
    }

    fn prepare(workspace_root: &Path) -> Result<(PathBuf, RippleConfig, IdScheme, PathBuf)> {
        let workspace_root = workspace_root.canonicalize().map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("workspace root not found: {}", workspace_root.display()),
            ))
        })?;
        let config = RippleConfig::load_or_default(&workspace_root)?;
        let ids = config.id_scheme()?;
        let db_path = workspace_root.join(&config.storage.database);
        Ok((workspace_root, config, ids, db_path))
    }

    /// Workspace root (canonicalized).
    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RippleConfig {
        &self.config
    }

    /// Path of the graph database.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// The underlying graph store.
    #[must_use]
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    // === Analysis ===

    /// Find every source file with a configured extension, sorted.
    ///
    /// Hidden directories and `analysis.exclude-dirs` are skipped. Unreadable
    /// directories are logged and skipped.
    #[must_use]
    pub fn discover_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        self.walk_dir(&self.workspace_root, &mut files);
        files.sort();
        files
    }

    fn walk_dir(&self, dir: &Path, files: &mut Vec<PathBuf>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(
                    directory = %dir.display(),
                    error = %e,
                    "Cannot read directory, skipping"
                );
                return;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(
                        directory = %dir.display(),
                        error = %e,
                        "Failed to read directory entry, skipping"
                    );
                    continue;
                }
            };

            let path = entry.path();
            if path.is_dir() {
                let excluded = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| self.config.excludes_dir(name));
                if !excluded {
                    self.walk_dir(&path, files);
                }
            } else if path.is_file() {
                let analyzed = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|ext| self.config.analyzes_extension(ext));
                if analyzed {
                    files.push(path);
                }
            }
        }
    }

    /// Analyze every discovered file in parallel.
    ///
    /// Returns analyses sorted by path, plus the files that failed.
    #[must_use]
    pub fn analyze(&self) -> (Vec<FileAnalysis>, Vec<AnalysisError>) {
        let files = self.discover_files();
        parallel::analyze_files(
            &self.workspace_root,
            &files,
            self.config.analysis.include_source,
        )
    }

    fn normalize(&self, analyses: &[FileAnalysis]) -> (Vec<NormalizedFile>, NormalizeStats) {
        EntityNormalizer::new(&self.workspace_root, self.ids.clone()).normalize_all(analyses)
    }

    // === Indexing ===

    /// Bring the graph up to date with the workspace.
    ///
    /// Unchanged files (same content hash) are not rewritten, but they are
    /// still analyzed so INHERITS and CALLS are linked over the full set.
    /// `BuildMode::Bulk` rebuilds the whole graph from in-memory tables.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReadOnly` on a read-only workspace, or an error if the
    /// store fails as a whole. Per-file problems are reported, not raised.
    pub fn index(&self, mode: BuildMode) -> Result<IndexReport> {
        if self.store.is_read_only() {
            return Err(Error::ReadOnly("index"));
        }
        let start = Instant::now();

        let files = self.discover_files();
        let (analyses, errors) = parallel::analyze_files(
            &self.workspace_root,
            &files,
            self.config.analysis.include_source,
        );
        let (normalized, normalize) = self.normalize(&analyses);

        let mut report = IndexReport {
            files_discovered: files.len(),
            normalize,
            errors,
            ..IndexReport::default()
        };

        match mode {
            BuildMode::Incremental => self.index_incremental(&normalized, &mut report)?,
            BuildMode::Bulk => self.index_bulk(&normalized, &mut report)?,
        }

        self.store.analyze()?;
        report.duration = start.elapsed();
        info!(
            mode = ?mode,
            discovered = report.files_discovered,
            indexed = report.files_indexed,
            unchanged = report.files_unchanged,
            removed = report.files_removed,
            invalidated = report.files_invalidated,
            errors = report.errors.len(),
            elapsed_ms = report.duration.as_millis(),
            "Index complete"
        );
        Ok(report)
    }

    /// Project-relative paths of the files that failed to analyze.
    fn failed_paths(&self, report: &IndexReport) -> BTreeSet<String> {
        report
            .errors
            .iter()
            .map(|e| identity::relative_path(&self.workspace_root, &e.path))
            .collect()
    }

    /// Count a stored file that is not in the current set as removed from
    /// disk or as invalidated by an analysis failure.
    fn count_stale(failed: &BTreeSet<String>, path: &str, report: &mut IndexReport) {
        if failed.contains(path) {
            report.files_invalidated += 1;
        } else {
            report.files_removed += 1;
        }
    }

    fn index_incremental(&self, files: &[NormalizedFile], report: &mut IndexReport) -> Result<()> {
        let current: BTreeSet<&str> = files.iter().map(|f| f.path.as_str()).collect();
        let failed = self.failed_paths(report);
        for stale in self.store.file_paths()? {
            if !current.contains(stale.as_str()) {
                let removed = self.store.delete_file_data(&stale)?;
                debug!(file = %stale, nodes = removed, "Removed data for stale file");
                Self::count_stale(&failed, &stale, report);
            }
        }

        let mut changed = Vec::new();
        for file in files {
            if self.store.file_unchanged(&file.path, &file.content_hash)? {
                report.files_unchanged += 1;
                continue;
            }
            match self.store.delete_file_data(&file.path) {
                Ok(_) => changed.push(file),
                Err(e) if e.is_contract_violation() => return Err(e),
                Err(e) => {
                    warn!(file = %file.path, error = %e, "Failed to clear stale data, file skipped");
                    report.errors.push(AnalysisError::new(
                        self.workspace_root.join(&file.path),
                        AnalysisErrorKind::StoreError,
                        e.to_string(),
                    ));
                }
            }
        }

        // Deletes are done before the writer takes the write lock
        let writer = BatchWriter::new(self.db_path.clone(), self.config.analysis.batch_size);
        for file in changed {
            writer.send(file.clone());
            report.files_indexed += 1;
        }
        let written = writer.finish()?;
        debug!(batches = written.batches_committed, "Batch writes committed");

        // Cross-file links need every node, changed or not
        let mut builder = GraphBuilder::with_stats(&self.store, written.stats);
        builder.link_inheritance(files)?;
        let (calls, resolution) = resolve_calls(files, &self.ids);
        builder.write_edges(&calls)?;

        report.build = builder.into_stats();
        report.calls = resolution;
        Ok(())
    }

    fn index_bulk(&self, files: &[NormalizedFile], report: &mut IndexReport) -> Result<()> {
        let current: BTreeSet<&str> = files.iter().map(|f| f.path.as_str()).collect();
        let failed = self.failed_paths(report);
        for stale in self.store.file_paths()? {
            if !current.contains(stale.as_str()) {
                Self::count_stale(&failed, &stale, report);
            }
        }
        self.store.clear()?;
        let (build, resolution) = builder::build_bulk(&self.store, files, &self.ids)?;
        report.files_indexed = build.files;
        report.build = build;
        report.calls = resolution;
        Ok(())
    }

    /// Clear the graph and index everything from scratch.
    ///
    /// # Errors
    ///
    /// Same as [`Ripple::index`].
    pub fn rebuild(&self, mode: BuildMode) -> Result<IndexReport> {
        if self.store.is_read_only() {
            return Err(Error::ReadOnly("rebuild"));
        }
        self.store.clear()?;
        self.index(mode)
    }

    // === Bulk interchange ===

    /// Analyze the workspace and write its graph tables to `dir`.
    ///
    /// Returns the build counts; the store is not touched.
    ///
    /// # Errors
    ///
    /// Returns an error if the tables cannot be written.
    pub fn export_tables(&self, dir: &Path) -> Result<BuildStats> {
        let (analyses, errors) = self.analyze();
        if !errors.is_empty() {
            warn!(count = errors.len(), "Some files failed to analyze and are not exported");
        }
        let (normalized, _) = self.normalize(&analyses);
        let build = builder::build_tables(&normalized, &self.ids);
        build.tables.write_dir(dir)?;
        info!(
            dir = %dir.display(),
            nodes = build.tables.node_count(),
            edges = build.tables.edge_count(),
            "Exported graph tables"
        );
        Ok(build.stats)
    }

    /// Bulk load graph tables from `dir` into the store.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for a missing or incompatible manifest,
    /// `Error::ReadOnly` on a read-only workspace, or a database error.
    pub fn load_tables(&self, dir: &Path) -> Result<(LoadStats, Vec<LoadWarning>)> {
        let (tables, warnings) = BulkTables::read_dir(dir)?;
        let stats = self.store.bulk_load(&tables)?;
        Ok((stats, warnings))
    }

    // === Queries ===

    /// Functions affected by a change to `function` in `file`.
    ///
    /// `max_depth` defaults to `impact.default-max-depth`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub fn impact(
        &self,
        file: &str,
        function: &str,
        direction: Direction,
        max_depth: Option<u32>,
    ) -> Result<Vec<ImpactEntry>> {
        let depth = max_depth.unwrap_or(self.config.impact.default_max_depth);
        ImpactAnalyzer::new(&self.store).analyze(file, function, direction, depth)
    }

    /// Functions that read the variable defined at `file:line`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub fn variable_usage(&self, file: &str, name: &str, line: u32) -> Result<Vec<VariableUse>> {
        ImpactAnalyzer::new(&self.store).variable_usage(file, name, line)
    }

    /// Node and edge counts plus the most-called functions.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub fn stats(&self) -> Result<GraphStats> {
        self.store.stats()
    }

    /// Groups of functions that call each other in a loop.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub fn call_cycles(&self) -> Result<Vec<CallCycle>> {
        Ok(find_call_cycles(&self.store.call_pairs()?))
    }

    /// Functions defined in a file, by start line.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub fn functions_in_file(&self, path: &str) -> Result<Vec<FunctionNode>> {
        self.store.functions_in_file(path)
    }

    /// Imports of a file, by line.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub fn imports_for_file(&self, path: &str) -> Result<Vec<ImportNode>> {
        self.store.imports_for_file(path)
    }

    /// Decorators applied to a function or class, with their positions.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub fn decorators_of(&self, target_id: &str) -> Result<Vec<(DecoratorNode, u32)>> {
        self.store.decorators_of(target_id)
    }

    /// Attributes of a class.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub fn attributes_of(&self, class_id: &str) -> Result<Vec<AttributeNode>> {
        self.store.attributes_of(class_id)
    }

    /// The class named `name` in a file.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub fn find_class(&self, path: &str, name: &str) -> Result<Option<ClassNode>> {
        self.store.find_class(path, name)
    }

    /// Classes defined in a file, by start line.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub fn classes_in_file(&self, path: &str) -> Result<Vec<ClassNode>> {
        self.store.classes_in_file(path)
    }

    /// (file, function) pairs that raise `exception`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub fn functions_raising(&self, exception: &str) -> Result<Vec<graph::FunctionRef>> {
        self.store.functions_raising(exception)
    }

    /// Functions that write `class_name.attribute`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub fn attribute_modifiers(
        &self,
        class_name: &str,
        attribute: &str,
    ) -> Result<Vec<AttributeWrite>> {
        self.store.attribute_modifiers(class_name, attribute)
    }

    /// Where `name` is imported across the workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub fn import_usages(&self, name: &str) -> Result<Vec<ImportNode>> {
        self.store.import_usages(name)
    }

    /// Every module in the workspace, by dotted name.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub fn module_hierarchy(&self) -> Result<Vec<ModuleNode>> {
        self.store.module_hierarchy()
    }
}
