//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Configuration file to use
//! - `--debug`: Per-commit detail
//! - `--quiet` / `-q`: Minimal output
//! - `--json`: Machine-readable result

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// monosplit - split a monorepo into history-preserving repositories
#[derive(Parser, Debug)]
#[command(name = "monosplit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: $MONOSPLIT_CONFIG, ./monosplit.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Show per-commit detail
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print the result as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split the source repository into derived repositories
    #[command(
        long_about = "Split the source repository into derived repositories.\n\n\
            Shared components are split first, then every project. Each derived \
            repository is written to <output>/<name> with its own history, tags, \
            submodules and large-file objects.",
        after_help = "\
EXAMPLES:
    # Split everything described by ./monosplit.toml
    monosplit split

    # Start over in an existing output directory
    monosplit split --clean

    # Only project A (and the shared components it mounts)
    monosplit split --only A"
    )]
    Split {
        /// Output root (overrides the configuration file)
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Remove existing output first
        #[arg(long)]
        clean: bool,

        /// Maximum concurrent splits
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,

        /// Split only these projects
        #[arg(long, value_name = "NAME")]
        only: Vec<String>,
    },

    /// Show discovered projects and the execution order without writing
    Plan {
        /// Plan only these projects
        #[arg(long, value_name = "NAME")]
        only: Vec<String>,
    },

    /// Copy large-file objects into an existing derived repository
    Lfs {
        /// Working directory of the derived repository
        repo: PathBuf,

        /// Object caches to copy from, searched in order
        #[arg(long = "source", value_name = "DIR", required = true)]
        sources: Vec<PathBuf>,
    },
}
