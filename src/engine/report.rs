//! engine::report
//!
//! Run report and recoverable warnings.
//!
//! Warnings are collected per repository while it is split and merged into
//! the [`RunReport`] afterwards. They never change the exit status on their
//! own; policies escalate them into failures where configured.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A recoverable condition observed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Warning {
    /// No mapped ancestor was found for a tag; the tag was not created.
    TagDropped { repo: String, tag: String },

    /// A tag with the same name already exists in the derived repository.
    TagConflict { repo: String, tag: String },

    /// A merge mapping or shared component never resolved.
    CorrelationGap { repo: String, detail: String },

    /// A pointer's object was in no candidate cache (policy `warn`).
    LfsObjectMissing {
        repo: String,
        path: String,
        digest: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::TagDropped { repo, tag } => {
                write!(f, "[{}] no commit for tag {}", repo, tag)
            }
            Warning::TagConflict { repo, tag } => {
                write!(f, "[{}] tag {} already exists, left untouched", repo, tag)
            }
            Warning::CorrelationGap { repo, detail } => write!(f, "[{}] {}", repo, detail),
            Warning::LfsObjectMissing { repo, path, digest } => write!(
                f,
                "[{}] large-file object {} for {} not found in any source",
                repo, digest, path
            ),
        }
    }
}

/// Whether a derived repository is a shared component or a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoKind {
    Shared,
    Project,
}

impl fmt::Display for RepoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoKind::Shared => write!(f, "shared"),
            RepoKind::Project => write!(f, "project"),
        }
    }
}

/// Tag propagation counts for one repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TagSummary {
    /// Tags whose target was mapped directly
    pub converted: usize,
    /// Tags retargeted to a mapped ancestor
    pub via_ancestor: usize,
    /// Tags with no mapped ancestor
    pub dropped: usize,
    /// Tags that already existed in the derived repository
    pub conflicts: usize,
}

/// Outcome of one finished repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoReport {
    pub name: String,
    pub kind: RepoKind,
    /// Commits emitted by the main pass
    pub commits: usize,
    /// Commits emitted by merge-source passes
    pub merged_commits: usize,
    pub tags: TagSummary,
    /// Large-file objects copied into the derived cache
    pub lfs_copied: usize,
}

/// A repository whose split did not finish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub repo: String,
    pub error: String,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cancelled: bool,
    pub repositories: Vec<RepoReport>,
    pub warnings: Vec<Warning>,
    pub failures: Vec<Failure>,
}

impl RunReport {
    /// Start an empty report stamped with the current time.
    pub fn start() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            cancelled: false,
            repositories: Vec::new(),
            warnings: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Stamp the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    /// True when every repository finished and the run was not cancelled.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    /// Render as human-readable text.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for repo in &self.repositories {
            out.push_str(&format!(
                "{} ({}): {} commits",
                repo.name, repo.kind, repo.commits
            ));
            if repo.merged_commits > 0 {
                out.push_str(&format!(", {} merged", repo.merged_commits));
            }
            if repo.kind == RepoKind::Project {
                out.push_str(&format!(
                    ", tags {} converted / {} via ancestor / {} dropped",
                    repo.tags.converted, repo.tags.via_ancestor, repo.tags.dropped
                ));
            }
            out.push_str(&format!(", {} lfs objects\n", repo.lfs_copied));
        }
        for failure in &self.failures {
            out.push_str(&format!("FAILED {}: {}\n", failure.repo, failure.error));
        }
        if self.cancelled {
            out.push_str("run cancelled; output is incomplete\n");
        }
        let elapsed = self.finished_at - self.started_at;
        out.push_str(&format!(
            "{} repositories, {} warnings, {} failures in {}s",
            self.repositories.len(),
            self.warnings.len(),
            self.failures.len(),
            elapsed.num_seconds()
        ));
        out
    }

    /// Render as pretty JSON.
    pub fn render_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
