//! `ripple stats` command implementation.

use std::path::Path;

use colored::Colorize;
use ripple::Ripple;

use super::display::{print_count, print_list};

/// Run the stats command.
pub fn run(workspace: &Path) -> Result<(), ripple::Error> {
    let ripple = Ripple::open_read_only(workspace)?;

    let db_path = ripple.db_path();
    let db_size_str = match std::fs::metadata(db_path) {
        Ok(meta) => format_size(meta.len()),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to get database file size");
            "size unknown".to_string()
        }
    };

    let stats = ripple.stats()?;
    let cycles = ripple.call_cycles()?;

    println!("{}", "Ripple Graph Statistics".cyan().bold());
    println!();
    println!(
        "  {}: {} ({})",
        "Database".white().bold(),
        db_path.display(),
        db_size_str
    );
    println!();

    print_count("Nodes", stats.node_count());
    for (kind, count) in &stats.nodes_by_kind {
        println!("    {}: {}", kind.table_name().dimmed(), count);
    }
    println!();

    print_count("Edges", stats.edge_count());
    for (kind, count) in &stats.edges_by_kind {
        println!("    {}: {}", kind.as_str().dimmed(), count);
    }
    println!();

    println!("  {}:", "Most called".white().bold());
    print_list(&stats.most_called, "(no calls)", |f| {
        format!("{} {} ({} calls)", f.name, f.file.dimmed(), f.call_count)
    });
    println!();

    print_count("Call cycles", cycles.len());
    print_list(&cycles, "(none)", |cycle| {
        cycle
            .functions
            .iter()
            .map(|(file, name)| format!("{file}::{name}"))
            .collect::<Vec<_>>()
            .join(" ↔ ")
    });

    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
