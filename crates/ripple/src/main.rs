//! Ripple CLI - dependency graphs and change impact from the command line.
//!
//! Ripple indexes Python sources with tree-sitter into a property graph and
//! answers which functions are affected when one of them changes.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use ripple::Direction;
use tracing_subscriber::EnvFilter;

mod cli;

/// Ripple: dependency graph construction and change impact analysis.
#[derive(Parser)]
#[command(name = "ripple")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Workspace root directory (defaults to current directory)
    #[arg(short, long, global = true)]
    workspace: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration to .ripple/config.yaml
    Init,

    /// Index Python files in the workspace
    Index {
        /// Rebuild the graph from scratch (clears existing data)
        #[arg(long)]
        rebuild: bool,

        /// Build the whole graph in memory and bulk load it
        #[arg(long)]
        bulk: bool,
    },

    /// Show functions affected by a change to a function
    Impact {
        /// File containing the function, relative to the workspace
        file: String,

        /// Function name
        function: String,

        /// Follow callers (upstream), callees (downstream), or both
        #[arg(short = 'D', long, default_value = "upstream")]
        direction: Direction,

        /// Maximum number of call hops (defaults to impact.default-max-depth)
        #[arg(short, long)]
        depth: Option<u32>,
    },

    /// Show functions that read a variable
    Usage {
        /// File defining the variable, relative to the workspace
        file: String,

        /// Variable name
        variable: String,

        /// Line of the definition
        line: u32,
    },

    /// Show graph statistics
    Stats,

    /// Write the workspace graph as interchange tables
    Export {
        /// Output directory (defaults to storage.tables-dir)
        dir: Option<PathBuf>,
    },

    /// Bulk load interchange tables into the graph
    Load {
        /// Directory holding manifest.json
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let workspace = match cli.workspace {
        Some(w) => w,
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!(
                    "{}: failed to get current directory: {e}",
                    "error".red().bold()
                );
                return ExitCode::FAILURE;
            }
        },
    };

    let result = match cli.command {
        Commands::Init => cli::init::run(&workspace),
        Commands::Index { rebuild, bulk } => cli::index::run(&workspace, rebuild, bulk),
        Commands::Impact {
            file,
            function,
            direction,
            depth,
        } => cli::impact::run(&workspace, &file, &function, direction, depth),
        Commands::Usage {
            file,
            variable,
            line,
        } => cli::usage::run(&workspace, &file, &variable, line),
        Commands::Stats => cli::stats::run(&workspace),
        Commands::Export { dir } => cli::tables::export(&workspace, dir.as_deref()),
        Commands::Load { dir } => cli::tables::load(&workspace, &dir),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            // Show cause chain for nested errors
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  {}: {cause}", "caused by".dimmed());
                source = std::error::Error::source(cause);
            }
            ExitCode::FAILURE
        }
    }
}
