//! plan command - show the execution plan without writing anything

use anyhow::{Context as _, Result};

use super::load_config;
use crate::cli::Context;
use crate::engine::plan::Plan;
use crate::ui::output::{self, Format};

/// Print discovered projects, shared components and the execution order.
pub fn plan(ctx: &Context, only: &[String]) -> Result<()> {
    let config = load_config(ctx)?.config;
    let plan = Plan::build(&config, only).context("failed to plan the split")?;

    match ctx.format {
        Format::Json => output::result(serde_json::to_string_pretty(&plan)?),
        Format::Text => output::result(plan.render(&config).trim_end()),
    }
    Ok(())
}
