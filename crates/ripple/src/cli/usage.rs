//! `ripple usage` command implementation.

use std::path::Path;

use colored::Colorize;
use ripple::Ripple;

use super::display::print_list;

/// Run the usage command.
pub fn run(workspace: &Path, file: &str, variable: &str, line: u32) -> Result<(), ripple::Error> {
    let ripple = Ripple::open_read_only(workspace)?;
    let uses = ripple.variable_usage(file, variable, line)?;

    println!(
        "Uses of {} ({}:{}):",
        variable.cyan().bold(),
        file,
        line
    );
    print_list(&uses, "(none)", |u| {
        format!("{} {}:{}", u.function, u.file, u.line)
    });
    Ok(())
}
