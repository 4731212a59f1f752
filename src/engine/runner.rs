//! engine::runner
//!
//! Concurrent execution of a [`Plan`].
//!
//! # Lifecycle
//!
//! ```text
//! Lock -> Check output -> Read baseline -> Stage 1 (components) -> Stage 2 (projects) -> Report
//! ```
//!
//! Every split runs on the blocking pool; a semaphore caps how many run at
//! once. Stage 2 starts only after every stage 1 split has returned, and a
//! project whose mounted component failed is not started at all.
//!
//! # Errors
//!
//! Problems that make the whole run pointless (lock held, output not
//! empty, baseline missing) are returned as [`RunError`]. Per-repository
//! errors are recorded as failures in the [`RunReport`] and never stop the
//! other splits.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use super::maintenance::{self, Maintenance};
use super::plan::Plan;
use super::report::{Failure, RepoKind, RunReport};
use super::splitter::{Baseline, HistorySplitter, Mount, SplitError, SplitJob, SplitOutcome};
use super::{CancelToken, Observer};
use crate::core::config::SplitConfig;
use crate::core::correlation::CorrelationTable;
use crate::core::ops::{LockError, OutputLock};
use crate::core::paths::OutputLayout;
use crate::core::types::{Oid, RepoName, ScopePath};

/// Errors that stop a run before any repository is split.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("output directory '{0}' is not empty (use --clean to start over)")]
    OutputNotEmpty(PathBuf),

    #[error("failed to prepare output directory '{path}': {source}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Baseline(SplitError),
}

/// Knobs of one run that do not belong in the configuration file.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Remove existing output before splitting
    pub clean: bool,
}

/// Shared, read-only state handed to every split.
struct Context {
    config: Arc<SplitConfig>,
    baseline: Arc<Baseline>,
    log: Arc<Vec<Oid>>,
    maintenance: Arc<dyn Maintenance>,
    semaphore: Arc<Semaphore>,
    observer: Observer,
    cancel: CancelToken,
}

/// Execute `plan`.
///
/// # Errors
///
/// See [`RunError`]; everything else ends up in the report.
pub async fn run(
    config: &SplitConfig,
    plan: Plan,
    options: RunOptions,
    observer: Observer,
    cancel: CancelToken,
) -> Result<RunReport, RunError> {
    let mut report = RunReport::start();

    let layout = OutputLayout::new(&config.output);
    let _lock = OutputLock::acquire(&layout)?;
    prepare_output(&layout, options)?;
    let baseline = Baseline::read(&config.main_repo).map_err(RunError::Baseline)?;

    let ctx = Context {
        config: Arc::new(config.clone()),
        baseline: Arc::new(baseline),
        log: Arc::clone(&plan.log),
        maintenance: Arc::from(maintenance::for_mode(config.maintenance)),
        semaphore: Arc::new(Semaphore::new(config.jobs().max(1))),
        observer,
        cancel: cancel.clone(),
    };

    let signal = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    // Stage 1: shared components
    let jobs = plan
        .components
        .iter()
        .map(|component| SplitJob {
            name: component.name.clone(),
            kind: RepoKind::Shared,
            scope: component.source.clone(),
            mounts: Vec::new(),
            merges: Vec::new(),
            workdir: layout.repo_dir(&component.name),
        })
        .collect();
    let mut tables: HashMap<RepoName, Arc<CorrelationTable>> = HashMap::new();
    for (name, outcome) in run_stage(&ctx, jobs).await {
        if let Some(correlation) = record(&mut report, &name, outcome) {
            tables.insert(name, Arc::new(correlation));
        }
    }

    // Stage 2: projects
    let mut jobs = Vec::new();
    for project in &plan.projects {
        match project_job(config, &layout, project, &tables) {
            Ok(job) => jobs.push(job),
            Err(reason) => report.failures.push(Failure {
                repo: project.name.to_string(),
                error: reason,
            }),
        }
    }
    for (name, outcome) in run_stage(&ctx, jobs).await {
        record(&mut report, &name, outcome);
    }

    signal.abort();
    report.cancelled = cancel.is_cancelled();
    report.finish();
    Ok(report)
}

fn prepare_output(layout: &OutputLayout, options: RunOptions) -> Result<(), RunError> {
    let io = |source| RunError::Output {
        path: layout.root().to_path_buf(),
        source,
    };
    if options.clean {
        layout.clean().map_err(io)?;
    } else if layout.has_content().map_err(io)? {
        return Err(RunError::OutputNotEmpty(layout.root().to_path_buf()));
    }
    Ok(())
}

fn project_job(
    config: &SplitConfig,
    layout: &OutputLayout,
    project: &super::plan::ProjectPlan,
    tables: &HashMap<RepoName, Arc<CorrelationTable>>,
) -> Result<SplitJob, String> {
    let mut mounts = Vec::with_capacity(project.mounts.len());
    for mount in &project.mounts {
        let correlation = tables
            .get(&mount.component)
            .ok_or_else(|| format!("shared component {} did not finish", mount.component))?;
        mounts.push(Mount {
            component: mount.component.clone(),
            local: mount.local.clone(),
            correlation: Arc::clone(correlation),
        });
    }
    Ok(SplitJob {
        name: project.name.clone(),
        kind: RepoKind::Project,
        scope: ScopePath::new(project.name.as_str()).map_err(|e| e.to_string())?,
        mounts,
        merges: project
            .merges
            .iter()
            .map(|&i| config.merge[i].clone())
            .collect(),
        workdir: layout.repo_dir(&project.name),
    })
}

/// Run `jobs` on the blocking pool and wait for all of them, in job order.
async fn run_stage(
    ctx: &Context,
    jobs: Vec<SplitJob>,
) -> Vec<(RepoName, Result<SplitOutcome, String>)> {
    let mut handles: Vec<(RepoName, JoinHandle<Result<SplitOutcome, SplitError>>)> = Vec::new();
    for job in jobs {
        let Ok(permit) = Arc::clone(&ctx.semaphore).acquire_owned().await else {
            break;
        };
        let config = Arc::clone(&ctx.config);
        let baseline = Arc::clone(&ctx.baseline);
        let log = Arc::clone(&ctx.log);
        let maintenance = Arc::clone(&ctx.maintenance);
        let observer = ctx.observer;
        let cancel = ctx.cancel.clone();
        let name = job.name.clone();
        ctx.observer.progress(&name, "starting");

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            HistorySplitter::new(
                &config,
                &job,
                &baseline,
                &log,
                maintenance.as_ref(),
                observer,
                &cancel,
            )
            .run()
        });
        handles.push((name, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        let outcome = match handle.await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(e) => Err(format!("split task aborted: {}", e)),
        };
        results.push((name, outcome));
    }
    results
}

/// Fold one finished split into the report, handing back its table.
fn record(
    report: &mut RunReport,
    name: &RepoName,
    outcome: Result<SplitOutcome, String>,
) -> Option<CorrelationTable> {
    match outcome {
        Ok(outcome) => {
            report.repositories.push(outcome.report);
            report.warnings.extend(outcome.warnings);
            Some(outcome.correlation)
        }
        Err(error) => {
            report.failures.push(Failure {
                repo: name.to_string(),
                error,
            });
            None
        }
    }
}
