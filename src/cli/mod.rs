//! cli
//!
//! Command-line interface layer for monosplit.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration
//! - Delegate to command handlers
//!
//! The CLI layer is thin; all splitting happens in [`crate::engine`].

pub mod args;
pub mod commands;

pub use args::Cli;

use crate::ui::output::{Format, Verbosity};
use anyhow::Result;

/// Global settings shared by every command handler.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Option<std::path::PathBuf>,
    pub verbosity: Verbosity,
    pub format: Format,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let ctx = Context {
        config: cli.config.clone(),
        // JSON output keeps stdout clean for the document.
        verbosity: if cli.json {
            Verbosity::from_flags(true, false)
        } else {
            Verbosity::from_flags(cli.quiet, cli.debug)
        },
        format: Format::from_flag(cli.json),
    };
    commands::dispatch(cli.command, &ctx)
}
