//! `ripple impact` command implementation.

use std::path::Path;

use colored::Colorize;
use ripple::{Direction, ImpactEntry, ImpactType, Ripple};

use super::display::print_list;

/// Run the impact command.
pub fn run(
    workspace: &Path,
    file: &str,
    function: &str,
    direction: Direction,
    depth: Option<u32>,
) -> Result<(), ripple::Error> {
    let ripple = Ripple::open_read_only(workspace)?;
    let entries = ripple.impact(file, function, direction, depth)?;

    println!(
        "Impact of {} in {} ({}):",
        function.cyan().bold(),
        file.cyan(),
        direction.as_str()
    );

    if matches!(direction, Direction::Upstream | Direction::Both) {
        print_section("Callers", &entries, ImpactType::Caller);
    }
    if matches!(direction, Direction::Downstream | Direction::Both) {
        print_section("Callees", &entries, ImpactType::Callee);
    }

    Ok(())
}

fn print_section(title: &str, entries: &[ImpactEntry], impact_type: ImpactType) {
    let section: Vec<&ImpactEntry> = entries
        .iter()
        .filter(|e| e.impact_type == impact_type)
        .collect();

    println!();
    println!(
        "  {} ({} functions):",
        title.white().bold(),
        section.len().to_string().green()
    );
    print_list(&section, "(none)", |e| {
        format!(
            "{} {}:{} {}",
            e.function_name,
            e.file,
            e.line,
            format!("depth {}", e.depth).dimmed()
        )
    });
}
