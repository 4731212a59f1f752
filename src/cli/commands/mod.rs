//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! Each handler loads what it needs, calls the engine and formats the
//! result. The engine's split runner is async; handlers are synchronous and
//! drive it on a runtime they create.

mod lfs;
mod plan;
mod split;

pub use lfs::lfs;
pub use plan::plan;
pub use split::split;

use super::args::Command;
use super::Context;
use crate::core::config::Config;
use anyhow::{Context as _, Result};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Split {
            output,
            clean,
            jobs,
            only,
        } => split(ctx, output, clean, jobs, &only),
        Command::Plan { only } => plan(ctx, &only),
        Command::Lfs { repo, sources } => lfs(ctx, &repo, sources),
    }
}

/// Load the configuration named by `--config` or found by lookup.
fn load_config(ctx: &Context) -> Result<Config> {
    Config::load(ctx.config.as_deref()).context("failed to load configuration")
}
