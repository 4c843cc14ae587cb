//! Entity normalization: per-file deduplication and ID assignment.
//!
//! Extraction may emit the same entity more than once (overlapping visitor
//! passes, a file analyzed twice in one run). Normalization collapses exact
//! key-tuple duplicates within a file and assigns every survivor its
//! content-addressed ID. Nothing else is ever dropped: a near-duplicate such
//! as the same name on a different line is a distinct entity.
//!
//! | Kind      | Key tuple                              |
//! |-----------|----------------------------------------|
//! | function  | (name, start_line)                     |
//! | class     | (name, start_line)                     |
//! | variable  | (name, definition_line, scope)         |
//! | import    | (imported_name, line)                  |
//! | decorator | (name, line)                           |
//! | attribute | (class_name, name, definition_line)    |
//! | exception | (name, line, context, function)        |

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;
use std::path::Path;

use tracing::{debug, trace};

use crate::identity::{IdKind, IdScheme, normalize_separators, relative_path};
use crate::languages::common::{
    AttributeAccessSite, AttributeRecord, CallSite, ClassRecord, DecoratorRecord,
    ExceptionRecord, FileAnalysis, FunctionRecord, ImportRecord, ModuleRecord, VariableRecord,
    VariableUsageSite,
};
use crate::types::Language;

/// A record together with its assigned ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized<T> {
    /// Assigned ID
    pub id: String,
    /// The record as extracted
    pub record: T,
}

/// Deduplicated, ID-carrying entities of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFile {
    /// Project-relative path
    pub path: String,
    /// Source language
    pub language: Language,
    /// SHA-256 of the contents
    pub content_hash: String,
    /// Functions, deduplicated by (name, start line)
    pub functions: Vec<Normalized<FunctionRecord>>,
    /// Classes, deduplicated by (name, start line)
    pub classes: Vec<Normalized<ClassRecord>>,
    /// Variables, deduplicated by (name, line, scope)
    pub variables: Vec<Normalized<VariableRecord>>,
    /// Imports, deduplicated by (name, line)
    pub imports: Vec<Normalized<ImportRecord>>,
    /// Decorators, deduplicated by (name, line)
    pub decorators: Vec<Normalized<DecoratorRecord>>,
    /// Attributes, deduplicated by (class, name, line)
    pub attributes: Vec<Normalized<AttributeRecord>>,
    /// Exceptions, deduplicated by (name, line, context, function)
    pub exceptions: Vec<Normalized<ExceptionRecord>>,
    /// Module info
    pub module: Option<Normalized<ModuleRecord>>,
    /// Distinct call-sites
    pub calls: Vec<CallSite>,
    /// Distinct variable reads
    pub variable_usages: Vec<VariableUsageSite>,
    /// Distinct attribute accesses
    pub attribute_accesses: Vec<AttributeAccessSite>,
}

impl NormalizedFile {
    /// Number of entities (nodes other than the file itself).
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.functions.len()
            + self.classes.len()
            + self.variables.len()
            + self.imports.len()
            + self.decorators.len()
            + self.attributes.len()
            + self.exceptions.len()
            + usize::from(self.module.is_some())
    }
}

/// Counts collected while normalizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    /// Files that produced a normalized record set
    pub files: usize,
    /// Files excluded because their analysis carried parse errors
    pub files_excluded: usize,
    /// Entities kept after deduplication
    pub entities: usize,
    /// Entity records dropped as exact key-tuple duplicates
    pub duplicates_dropped: usize,
}

/// Deduplicates extraction records and assigns IDs.
#[derive(Debug, Clone)]
pub struct EntityNormalizer {
    root: std::path::PathBuf,
    ids: IdScheme,
}

impl EntityNormalizer {
    /// Create a normalizer relativizing paths against `root`.
    #[must_use]
    pub fn new(root: &Path, ids: IdScheme) -> Self {
        Self {
            root: root.to_path_buf(),
            ids,
        }
    }

    /// The ID scheme used for assignment.
    #[must_use]
    pub fn ids(&self) -> &IdScheme {
        &self.ids
    }

    /// Project-relative form of an analysis path.
    #[must_use]
    pub fn relative(&self, path: &str) -> String {
        let p = Path::new(path);
        if p.is_absolute() {
            relative_path(&self.root, p)
        } else {
            normalize_separators(path)
        }
    }

    /// Normalize every analysis, merging records that name the same file.
    ///
    /// Output is sorted by path. Analyses with parse errors are excluded and
    /// counted.
    #[must_use]
    pub fn normalize_all(&self, analyses: &[FileAnalysis]) -> (Vec<NormalizedFile>, NormalizeStats) {
        let mut stats = NormalizeStats::default();
        let mut by_path: BTreeMap<String, Vec<&FileAnalysis>> = BTreeMap::new();

        for analysis in analyses {
            if analysis.has_errors() {
                debug!(
                    file = %analysis.path,
                    errors = analysis.errors.len(),
                    "Excluding file with parse errors from graph derivation"
                );
                stats.files_excluded += 1;
                continue;
            }
            by_path
                .entry(self.relative(&analysis.path))
                .or_default()
                .push(analysis);
        }

        let files: Vec<NormalizedFile> = by_path
            .into_iter()
            .map(|(path, parts)| self.normalize_parts(path, &parts, &mut stats))
            .collect();

        debug!(
            files = stats.files,
            entities = stats.entities,
            duplicates = stats.duplicates_dropped,
            excluded = stats.files_excluded,
            "Normalized extraction records"
        );
        (files, stats)
    }

    /// Normalize a single analysis.
    ///
    /// Returns `None` if the analysis carries parse errors.
    #[must_use]
    pub fn normalize_file(
        &self,
        analysis: &FileAnalysis,
        stats: &mut NormalizeStats,
    ) -> Option<NormalizedFile> {
        if analysis.has_errors() {
            stats.files_excluded += 1;
            return None;
        }
        let path = self.relative(&analysis.path);
        Some(self.normalize_parts(path, &[analysis], stats))
    }

    fn normalize_parts(
        &self,
        path: String,
        parts: &[&FileAnalysis],
        stats: &mut NormalizeStats,
    ) -> NormalizedFile {
        let ids = &self.ids;
        let mut dropped = 0;

        // The last analysis wins for file-level properties
        let head = parts[parts.len() - 1];

        let functions = dedup(
            parts.iter().flat_map(|a| a.functions.iter()),
            |f| (f.name.clone(), f.start_line),
            |f| ids.id(IdKind::Function, &path, &f.name, f.start_line, None),
            &mut dropped,
        );
        let classes = dedup(
            parts.iter().flat_map(|a| a.classes.iter()),
            |c| (c.name.clone(), c.start_line),
            |c| ids.id(IdKind::Class, &path, &c.name, c.start_line, None),
            &mut dropped,
        );
        let variables = dedup(
            parts.iter().flat_map(|a| a.variables.iter()),
            |v| (v.name.clone(), v.definition_line, v.scope.clone()),
            |v| ids.id(IdKind::Variable, &path, &v.name, v.definition_line, Some(&v.scope)),
            &mut dropped,
        );
        let imports = dedup(
            parts.iter().flat_map(|a| a.imports.iter()),
            |i| (i.imported_name.clone(), i.line),
            |i| ids.id(IdKind::Import, &path, &i.imported_name, i.line, None),
            &mut dropped,
        );
        let decorators = dedup(
            parts.iter().flat_map(|a| a.decorators.iter()),
            |d| (d.name.clone(), d.line),
            |d| ids.id(IdKind::Decorator, &path, &d.name, d.line, None),
            &mut dropped,
        );
        let attributes = dedup(
            parts.iter().flat_map(|a| a.attributes.iter()),
            |a| (a.class_name.clone(), a.name.clone(), a.definition_line),
            |a| {
                ids.id(
                    IdKind::Attribute,
                    &path,
                    &a.name,
                    a.definition_line,
                    Some(&a.class_name),
                )
            },
            &mut dropped,
        );
        let exceptions = dedup(
            parts.iter().flat_map(|a| a.exceptions.iter()),
            |e| (e.name.clone(), e.line, e.context, e.function_name.clone()),
            |e| {
                let extra = match &e.function_name {
                    Some(func) => format!("{}::{func}", e.context.as_str()),
                    None => e.context.as_str().to_string(),
                };
                ids.id(IdKind::Exception, &path, &e.name, e.line, Some(&extra))
            },
            &mut dropped,
        );
        let module = parts
            .iter()
            .rev()
            .find_map(|a| a.module.as_ref())
            .map(|m| Normalized {
                id: ids.id(IdKind::Module, &path, &m.name, 0, None),
                record: m.clone(),
            });

        let calls = unique_sites(parts.iter().flat_map(|a| a.calls.iter()));
        let variable_usages = unique_sites(parts.iter().flat_map(|a| a.variable_usages.iter()));
        let attribute_accesses =
            unique_sites(parts.iter().flat_map(|a| a.attribute_accesses.iter()));

        let file = NormalizedFile {
            path,
            language: head.language,
            content_hash: head.content_hash.clone(),
            functions,
            classes,
            variables,
            imports,
            decorators,
            attributes,
            exceptions,
            module,
            calls,
            variable_usages,
            attribute_accesses,
        };

        trace!(
            file = %file.path,
            entities = file.entity_count(),
            duplicates = dropped,
            "Normalized file"
        );
        stats.files += 1;
        stats.entities += file.entity_count();
        stats.duplicates_dropped += dropped;
        file
    }
}

/// Keep the first record of every key tuple, in input order, and assign IDs.
fn dedup<'a, T, K, KF, IF>(
    records: impl Iterator<Item = &'a T>,
    key: KF,
    id: IF,
    dropped: &mut usize,
) -> Vec<Normalized<T>>
where
    T: Clone + 'a,
    K: Eq + Hash,
    KF: Fn(&T) -> K,
    IF: Fn(&T) -> String,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for record in records {
        if seen.insert(key(record)) {
            out.push(Normalized {
                id: id(record),
                record: record.clone(),
            });
        } else {
            *dropped += 1;
        }
    }
    out
}

/// Collapse exact duplicate sites, preserving first-seen order.
fn unique_sites<'a, T>(sites: impl Iterator<Item = &'a T>) -> Vec<T>
where
    T: Clone + Eq + Hash + 'a,
{
    let mut seen = HashSet::new();
    sites.filter(|s| seen.insert(*s)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::common::{ExceptionContext, FunctionRecord};

    fn function(name: &str, line: u32) -> FunctionRecord {
        FunctionRecord {
            name: name.to_string(),
            start_line: line,
            end_line: line + 2,
            is_public: true,
            source_excerpt: None,
            parent_class: None,
        }
    }

    fn normalizer() -> EntityNormalizer {
        EntityNormalizer::new(Path::new("/repo"), IdScheme::default())
    }

    #[test]
    fn identical_function_records_collapse_to_one() {
        let mut analysis = FileAnalysis::new("/repo/app.py", Language::Python, "h");
        analysis.functions.push(function("run", 3));
        analysis.functions.push(function("run", 3));

        let mut stats = NormalizeStats::default();
        let file = normalizer().normalize_file(&analysis, &mut stats).unwrap();

        assert_eq!(file.functions.len(), 1);
        assert_eq!(stats.duplicates_dropped, 1);
        assert_eq!(file.path, "app.py");
    }

    #[test]
    fn same_name_on_different_line_is_kept() {
        let mut analysis = FileAnalysis::new("app.py", Language::Python, "h");
        analysis.functions.push(function("run", 3));
        analysis.functions.push(function("run", 30));

        let mut stats = NormalizeStats::default();
        let file = normalizer().normalize_file(&analysis, &mut stats).unwrap();

        assert_eq!(file.functions.len(), 2);
        assert_ne!(file.functions[0].id, file.functions[1].id);
        assert_eq!(stats.duplicates_dropped, 0);
    }

    #[test]
    fn variable_scope_is_part_of_the_key() {
        let mut analysis = FileAnalysis::new("app.py", Language::Python, "h");
        for scope in ["module", "function:main", "module"] {
            analysis.variables.push(VariableRecord {
                name: "x".to_string(),
                definition_line: 1,
                scope: scope.to_string(),
            });
        }

        let mut stats = NormalizeStats::default();
        let file = normalizer().normalize_file(&analysis, &mut stats).unwrap();

        assert_eq!(file.variables.len(), 2);
        assert_eq!(stats.duplicates_dropped, 1);
    }

    #[test]
    fn exception_key_includes_context_and_function() {
        let mut analysis = FileAnalysis::new("app.py", Language::Python, "h");
        for (context, func) in [
            (ExceptionContext::Raise, Some("a")),
            (ExceptionContext::Catch, Some("a")),
            (ExceptionContext::Raise, None),
            (ExceptionContext::Raise, Some("a")),
        ] {
            analysis.exceptions.push(ExceptionRecord {
                name: "ValueError".to_string(),
                line: 7,
                context,
                function_name: func.map(str::to_string),
            });
        }

        let mut stats = NormalizeStats::default();
        let file = normalizer().normalize_file(&analysis, &mut stats).unwrap();

        assert_eq!(file.exceptions.len(), 3);
        let ids: HashSet<_> = file.exceptions.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids.len(), 3, "distinct key tuples must get distinct IDs");
    }

    #[test]
    fn repeated_analyses_of_one_path_merge() {
        let mut first = FileAnalysis::new("/repo/app.py", Language::Python, "h");
        first.functions.push(function("run", 3));
        first.calls.push(CallSite {
            caller: "run".to_string(),
            called_name: "go".to_string(),
            call_line: 4,
        });
        let second = first.clone();

        let (files, stats) = normalizer().normalize_all(&[first, second]);

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].functions.len(), 1);
        assert_eq!(files[0].calls.len(), 1);
        assert_eq!(stats.duplicates_dropped, 1);
    }

    #[test]
    fn files_with_parse_errors_are_excluded() {
        let mut bad = FileAnalysis::new("bad.py", Language::Python, "h");
        bad.functions.push(function("f", 1));
        bad.errors.push("syntax error at line 1".to_string());
        let good = FileAnalysis::new("good.py", Language::Python, "h");

        let (files, stats) = normalizer().normalize_all(&[bad, good]);

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "good.py");
        assert_eq!(stats.files_excluded, 1);
    }

    #[test]
    fn ids_match_the_identity_function() {
        let mut analysis = FileAnalysis::new("/repo/pkg/app.py", Language::Python, "h");
        analysis.functions.push(function("run", 3));

        let mut stats = NormalizeStats::default();
        let file = normalizer().normalize_file(&analysis, &mut stats).unwrap();

        assert_eq!(
            file.functions[0].id,
            IdScheme::default().function_id("pkg/app.py", "run", 3)
        );
    }
}
