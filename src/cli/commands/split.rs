//! split command - split the source repository

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};

use super::load_config;
use crate::cli::Context;
use crate::engine::plan::Plan;
use crate::engine::runner::{self, RunOptions};
use crate::engine::{CancelToken, Observer};
use crate::ui::output::{self, Format};

/// Run the whole pipeline and print the run report.
pub fn split(
    ctx: &Context,
    output_dir: Option<PathBuf>,
    clean: bool,
    jobs: Option<usize>,
    only: &[String],
) -> Result<()> {
    let mut config = load_config(ctx)?.config;
    if let Some(dir) = output_dir {
        config.output = dir;
    }
    if jobs.is_some() {
        config.jobs = jobs;
    }
    config.validate().context("invalid configuration")?;

    let plan = Plan::build(&config, only).context("failed to plan the split")?;
    output::print(
        format!(
            "splitting {} shared components and {} projects from {} commits",
            plan.components.len(),
            plan.projects.len(),
            plan.commits
        ),
        ctx.verbosity,
    );

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(runner::run(
        &config,
        plan,
        RunOptions { clean },
        Observer::new(ctx.verbosity),
        CancelToken::new(),
    ))?;

    match ctx.format {
        Format::Json => output::result(report.render_json()?),
        Format::Text => output::result(report.render_text()),
    }

    if report.cancelled {
        bail!("run cancelled; output under '{}' is unusable", config.output.display());
    }
    if !report.is_success() {
        bail!("{} repositories failed", report.failures.len());
    }
    Ok(())
}
