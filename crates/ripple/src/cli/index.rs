//! `ripple index` command implementation.

use std::path::Path;

use colored::Colorize;
use ripple::{AnalysisError, BuildMode, Ripple};

use super::display::print_list;

/// Run the index command.
pub fn run(workspace: &Path, rebuild: bool, bulk: bool) -> Result<(), ripple::Error> {
    println!("{} {}...", "Indexing".cyan().bold(), workspace.display());

    let ripple = Ripple::new(workspace)?;
    let mode = if bulk {
        BuildMode::Bulk
    } else {
        BuildMode::Incremental
    };

    let report = if rebuild {
        println!("{}", "Rebuilding graph from scratch".yellow());
        ripple.rebuild(mode)?
    } else {
        ripple.index(mode)?
    };

    println!();
    println!(
        "{} {} files ({} unchanged, {} removed, {} invalidated), {} nodes, {} edges",
        "Indexed".green().bold(),
        report.files_indexed,
        report.files_unchanged,
        report.files_removed,
        report.files_invalidated,
        report.build.nodes_inserted + report.build.nodes_updated,
        report.build.edges_created,
    );
    println!(
        "{} {} of {} call-sites ({} ambiguous)",
        "Resolved".green().bold(),
        report.calls.resolved,
        report.calls.call_sites,
        report.calls.ambiguous_sites,
    );
    println!("{}: {:.2?}", "Duration".dimmed(), report.duration);

    let skipped = report.build.skipped_count() + report.build.unresolved_count();
    if skipped > 0 {
        println!(
            "{}: {} links (target not found)",
            "Skipped".yellow(),
            skipped
        );
    }
    if report.build.nodes_failed + report.build.edges_failed > 0 {
        println!(
            "{}: {} nodes, {} edges (see log)",
            "Write failures".yellow(),
            report.build.nodes_failed,
            report.build.edges_failed
        );
    }
    for (table, cause) in &report.build.table_errors {
        println!("{}: table {table}: {cause}", "Load failure".red());
    }

    if !report.errors.is_empty() {
        let (input, internal) = error_split(&report.errors);
        println!();
        println!(
            "{} ({} in source files, {} internal):",
            "Errors".red().bold(),
            input,
            internal
        );
        print_list(&report.errors, "", |err| {
            format!("{}: {}: {}", err.path.display(), err.kind, err.message)
        });
    }

    Ok(())
}

/// Count errors caused by the source files versus by Ripple itself.
fn error_split(errors: &[AnalysisError]) -> (usize, usize) {
    let input = errors.iter().filter(|e| e.kind.is_input_error()).count();
    let internal = errors.iter().filter(|e| e.kind.is_internal_error()).count();
    (input, internal)
}
