//! `ripple init` command implementation.

use std::path::Path;

use colored::Colorize;

/// Run the init command.
pub fn run(workspace: &Path) -> Result<(), ripple::Error> {
    let path = ripple::config::init(workspace)?;
    println!("{} {}", "Created".green().bold(), path.display());
    Ok(())
}
