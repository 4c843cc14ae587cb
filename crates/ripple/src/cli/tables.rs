//! `ripple export` and `ripple load` command implementations.

use std::path::Path;

use colored::Colorize;
use ripple::Ripple;

use super::display::{print_count, print_list};

/// Run the export command.
pub fn export(workspace: &Path, dir: Option<&Path>) -> Result<(), ripple::Error> {
    let ripple = Ripple::new(workspace)?;
    let dir = dir.map_or_else(
        || ripple.workspace_root().join(&ripple.config().storage.tables_dir),
        Path::to_path_buf,
    );

    let stats = ripple.export_tables(&dir)?;

    println!("{} {}", "Exported".green().bold(), dir.display());
    print_count("Files", stats.files);
    if stats.unresolved_count() > 0 {
        print_count("Unresolved links", stats.unresolved_count());
    }
    Ok(())
}

/// Run the load command.
pub fn load(workspace: &Path, dir: &Path) -> Result<(), ripple::Error> {
    let ripple = Ripple::new(workspace)?;
    let (stats, warnings) = ripple.load_tables(dir)?;

    println!("{} {}", "Loaded".green().bold(), dir.display());
    print_count("Nodes", stats.node_count());
    print_count("Edges", stats.edge_count());
    if stats.skipped_count() > 0 {
        print_count("Edges skipped (missing endpoint)", stats.skipped_count());
    }

    if !warnings.is_empty() {
        println!();
        println!("{} ({}):", "Warnings".yellow().bold(), warnings.len());
        print_list(&warnings, "", ToString::to_string);
    }
    if !stats.table_errors.is_empty() {
        println!();
        println!("{} ({}):", "Failed tables".red().bold(), stats.table_errors.len());
        print_list(&stats.table_errors, "", |(table, cause)| format!("{table}: {cause}"));
    }
    Ok(())
}
