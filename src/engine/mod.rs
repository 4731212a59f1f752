//! engine
//!
//! Splits a monorepo into derived repositories.
//!
//! # Architecture
//!
//! One forward pass over the source commit log per derived repository,
//! built from small components:
//!
//! - [`tree_diff`] - PathTreeDiff: scoped file-level changes per commit
//! - [`tree_merge`] - TreeMerger: fold a subtree into a target index
//! - [`splitter`] - HistorySplitter: the per-repository state machine
//! - [`tags`] - TagPropagator: retarget tags through the correlation table
//! - [`lfs`] - LfsObjectRelocator: populate the large-file object cache
//! - [`maintenance`] - Finalize capability (object packing)
//! - [`plan`] - Project discovery and the two-stage execution plan
//! - [`runner`] - Concurrent execution of the plan
//! - [`report`] - Run report and warnings
//!
//! # Invariants
//!
//! - Within one derived repository commits are emitted strictly in source
//!   log order, each on top of the previous one
//! - Shared components finish before any project that mounts them starts
//! - Derived repositories never share mutable state; the only cross-split
//!   artifact is a frozen correlation table
//!
//! # Example
//!
//! ```no_run
//! use monosplit::core::config::Config;
//! use monosplit::engine::runner::{self, RunOptions};
//! use monosplit::engine::{plan::Plan, CancelToken, Observer};
//!
//! let config = Config::load(None).unwrap().config;
//! let plan = Plan::build(&config, &[]).unwrap();
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let report = rt
//!     .block_on(runner::run(
//!         &config,
//!         plan,
//!         RunOptions::default(),
//!         Observer::silent(),
//!         CancelToken::new(),
//!     ))
//!     .unwrap();
//! assert!(report.is_success());
//! ```

pub mod lfs;
pub mod maintenance;
pub mod plan;
pub mod report;
pub mod runner;
pub mod splitter;
pub mod tags;
pub mod tree_diff;
pub mod tree_merge;

pub use report::{RepoKind, RepoReport, RunReport, Warning};
pub use splitter::{HistorySplitter, SplitError, SplitJob};

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::types::RepoName;
use crate::ui::output::{self, Verbosity};

/// Progress sink for the engine.
///
/// The engine never prints directly; everything user-visible flows through
/// an `Observer` so library callers can run silently.
#[derive(Debug, Clone, Copy)]
pub struct Observer {
    verbosity: Verbosity,
}

impl Observer {
    /// Create an observer printing at `verbosity`.
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// An observer that prints nothing.
    pub fn silent() -> Self {
        Self::new(Verbosity::Quiet)
    }

    /// The configured verbosity.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Progress for one repository.
    pub fn progress(&self, repo: &RepoName, message: impl Display) {
        output::print(format!("[{}] {}", repo, message), self.verbosity);
    }

    /// Per-commit detail, shown with `--debug`.
    pub fn debug(&self, repo: &RepoName, message: impl Display) {
        output::debug(format!("[{}] {}", repo, message), self.verbosity);
    }

    /// A recoverable condition, reported as it happens.
    pub fn warn(&self, warning: &Warning) {
        output::warn(warning, self.verbosity);
    }
}

/// Cooperative cancellation flag shared between the signal handler and
/// every running split.
///
/// Checked between source commits; a split that observes it stops with
/// [`SplitError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
