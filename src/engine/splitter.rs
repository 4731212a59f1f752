//! engine::splitter
//!
//! HistorySplitter: builds one derived repository from the source log.
//!
//! # Phases
//!
//! ```text
//! Initializing -> MergingSources -> Splitting -> Finalizing -> Done
//! ```
//!
//! - **Initializing**: the repository is created and the baseline files
//!   (`.gitignore`, `.gitattributes` from the source root) are staged.
//! - **MergingSources**: each merge source's history is folded in commit by
//!   commit; the index is reset to the baseline after every source.
//! - **Splitting**: one pass over the source log, oldest first. Commits
//!   without the scope are skipped and gitlinks of mounted components are
//!   refreshed. A commit is emitted when its first-parent diff reaches a
//!   path outside the mounts or a gitlink moved; changes that only touch
//!   mounted paths emit nothing.
//! - **Finalizing**: origin remote, tags (projects only), large-file
//!   objects, working-tree checkout and maintenance.
//!
//! No phase is retried; any error abandons the repository.
//!
//! # Index state
//!
//! The derived index always holds the baseline files, the manifest, the
//! current gitlinks and the content of the last applied scoped tree. When
//! the first parent's scoped tree is that last applied tree the
//! first-parent diff is replayed; otherwise (interleaved branches, a scope
//! that reappears) the index is reconciled with [`TreeMerger`] so every
//! emitted commit matches its source commit under the scope.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::core::config::{MergeConfig, Policy, SplitConfig};
use crate::core::correlation::{CorrelationError, CorrelationTable};
use crate::core::types::{FileMode, Oid, RepoName, ScopePath};
use crate::engine::lfs::{LfsError, LfsObjectRelocator};
use crate::engine::maintenance::{Maintenance, MaintenanceError};
use crate::engine::report::{RepoKind, RepoReport, TagSummary, Warning};
use crate::engine::tags::{self, TagOutcome, TagPropagator};
use crate::engine::tree_diff::{PathTreeDiff, ScopedDiff};
use crate::engine::tree_merge::{PathFilter, TreeMerger};
use crate::engine::{CancelToken, Observer};
use crate::git::{FileChange, Git, GitError, Identity, SourceCommit, TreeEntry};

/// Files copied from the source root into every derived repository.
pub const BASELINE_FILES: [&str; 2] = [".gitignore", ".gitattributes"];

/// Name of the submodule manifest.
pub const MANIFEST_FILE: &str = ".gitmodules";

/// Errors that abandon one repository's split.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("required file '{file}' is missing from '{root}'")]
    MissingBaseline { file: String, root: PathBuf },

    #[error("split cancelled")]
    Cancelled,

    #[error("no mapped commit for tags: {}", .tags.join(", "))]
    UnresolvedTags { tags: Vec<String> },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    #[error(transparent)]
    Lfs(#[from] LfsError),

    #[error(transparent)]
    Maintenance(#[from] MaintenanceError),
}

/// Lifecycle of one derived repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    MergingSources,
    Splitting,
    Finalizing,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Initializing => "initializing",
            Phase::MergingSources => "merging sources",
            Phase::Splitting => "splitting",
            Phase::Finalizing => "finalizing",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// The baseline files, read once per run from the source working tree.
#[derive(Debug, Clone)]
pub struct Baseline {
    files: Vec<(String, Vec<u8>)>,
}

impl Baseline {
    /// Read the baseline files from the source root.
    ///
    /// # Errors
    ///
    /// [`SplitError::MissingBaseline`] if either file is absent.
    pub fn read(root: &Path) -> Result<Self, SplitError> {
        let mut files = Vec::with_capacity(BASELINE_FILES.len());
        for name in BASELINE_FILES {
            let path = root.join(name);
            let content = fs::read(&path).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => SplitError::MissingBaseline {
                    file: name.to_string(),
                    root: root.to_path_buf(),
                },
                _ => SplitError::Io {
                    path: path.clone(),
                    source: e,
                },
            })?;
            files.push((name.to_string(), content));
        }
        Ok(Self { files })
    }
}

/// A shared component mounted inside the repository being split.
#[derive(Debug, Clone)]
pub struct Mount {
    pub component: RepoName,
    /// Gitlink path inside this repository
    pub local: ScopePath,
    /// The component's frozen correlation table
    pub correlation: Arc<CorrelationTable>,
}

/// Everything needed to split one repository.
#[derive(Debug, Clone)]
pub struct SplitJob {
    pub name: RepoName,
    pub kind: RepoKind,
    /// Source path the repository's content comes from
    pub scope: ScopePath,
    pub mounts: Vec<Mount>,
    pub merges: Vec<MergeConfig>,
    /// Working directory of the derived repository
    pub workdir: PathBuf,
}

/// A finished split.
#[derive(Debug)]
pub struct SplitOutcome {
    pub report: RepoReport,
    pub correlation: CorrelationTable,
    pub warnings: Vec<Warning>,
}

/// Render the submodule manifest for `mounts`.
///
/// ```
/// use monosplit::engine::splitter::manifest;
/// use monosplit::core::types::{RepoName, ScopePath};
///
/// let text = manifest(
///     [(&RepoName::new("Common").unwrap(), &ScopePath::new("libCommon").unwrap())],
///     "../{name}.git",
/// );
/// assert_eq!(
///     text,
///     "[submodule \"libCommon\"]\n    path = libCommon\n    url = ../Common.git\n"
/// );
/// ```
pub fn manifest<'a>(
    mounts: impl IntoIterator<Item = (&'a RepoName, &'a ScopePath)>,
    url_template: &str,
) -> String {
    mounts
        .into_iter()
        .map(|(component, local)| {
            format!(
                "[submodule \"{local}\"]\n    path = {local}\n    url = {}\n",
                component.render(url_template)
            )
        })
        .collect()
}

#[derive(Debug, Default)]
struct Progress {
    correlation: CorrelationTable,
    warnings: Vec<Warning>,
    commits: usize,
    merged_commits: usize,
}

/// Drives one repository through its phases.
pub struct HistorySplitter<'a> {
    config: &'a SplitConfig,
    job: &'a SplitJob,
    baseline: &'a Baseline,
    log: &'a [Oid],
    maintenance: &'a dyn Maintenance,
    observer: Observer,
    cancel: &'a CancelToken,
    phase: Phase,
}

impl<'a> HistorySplitter<'a> {
    pub fn new(
        config: &'a SplitConfig,
        job: &'a SplitJob,
        baseline: &'a Baseline,
        log: &'a [Oid],
        maintenance: &'a dyn Maintenance,
        observer: Observer,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            config,
            job,
            baseline,
            log,
            maintenance,
            observer,
            cancel,
            phase: Phase::Initializing,
        }
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run every phase to completion.
    ///
    /// # Errors
    ///
    /// Any error abandons the repository; its directory is left as is and
    /// must not be used.
    pub fn run(mut self) -> Result<SplitOutcome, SplitError> {
        let mut progress = Progress::default();

        self.enter(Phase::Initializing);
        let source = Git::open(&self.config.main_repo)?;
        let target = Git::init(&self.job.workdir, &self.config.default_branch)?;
        let baseline = self.stage_baseline(&target)?;
        let filter = PathFilter::new(self.job.mounts.iter().map(|m| &m.local));

        self.enter(Phase::MergingSources);
        for merge in &self.job.merges {
            self.merge_source(&target, merge, &filter, &mut progress)?;
            target.clear_index()?;
            for (path, oid) in &baseline {
                target.stage_file(path, oid, FileMode::Regular)?;
            }
        }
        if !self.job.mounts.is_empty() {
            let text = manifest(
                self.job.mounts.iter().map(|m| (&m.component, &m.local)),
                &self.config.submodule_url,
            );
            let blob = target.write_blob(text.as_bytes())?;
            target.stage_file(MANIFEST_FILE, &blob, FileMode::Regular)?;
        }

        self.enter(Phase::Splitting);
        self.split(&source, &target, &filter, &mut progress)?;
        self.observer.progress(
            &self.job.name,
            format!("split {} commits", progress.commits),
        );

        self.enter(Phase::Finalizing);
        let (tags, lfs_copied) = self.finalize(&source, &target, &mut progress)?;

        self.enter(Phase::Done);
        Ok(SplitOutcome {
            report: RepoReport {
                name: self.job.name.to_string(),
                kind: self.job.kind,
                commits: progress.commits,
                merged_commits: progress.merged_commits,
                tags,
                lfs_copied,
            },
            correlation: progress.correlation,
            warnings: progress.warnings,
        })
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.observer.debug(&self.job.name, format!("-> {}", phase));
    }

    fn check_cancel(&self) -> Result<(), SplitError> {
        if self.cancel.is_cancelled() {
            return Err(SplitError::Cancelled);
        }
        Ok(())
    }

    fn warn(&self, progress: &mut Progress, warning: Warning) {
        self.observer.warn(&warning);
        progress.warnings.push(warning);
    }

    fn stage_baseline(&self, target: &Git) -> Result<Vec<(String, Oid)>, GitError> {
        let mut staged = Vec::with_capacity(self.baseline.files.len());
        for (path, content) in &self.baseline.files {
            let oid = target.write_blob(content)?;
            target.stage_file(path, &oid, FileMode::Regular)?;
            staged.push((path.clone(), oid));
        }
        Ok(staged)
    }

    /// Emit the staged index as a commit carrying `commit`'s metadata.
    ///
    /// Both signatures use the author timestamp and the remapped author
    /// email, so re-running a split reproduces the same commit ids.
    fn emit(&self, target: &Git, commit: &SourceCommit) -> Result<Oid, GitError> {
        let email = self.config.map_email(&commit.author.email);
        let author = Identity {
            name: commit.author.name.clone(),
            email: email.clone(),
            when: commit.author.when,
        };
        let committer = Identity {
            name: commit.committer.name.clone(),
            email,
            when: commit.author.when,
        };
        target.commit_index(&commit.message, &author, &committer)
    }

    // =========================================================================
    // MergingSources
    // =========================================================================

    fn merge_source(
        &self,
        target: &Git,
        merge: &MergeConfig,
        filter: &PathFilter,
        progress: &mut Progress,
    ) -> Result<(), SplitError> {
        self.observer.progress(
            &self.job.name,
            format!("merging history of {}", merge.repo.display()),
        );
        let foreign = Git::open(&merge.repo)?;
        let merger = TreeMerger::new(&foreign, target, filter);
        let mut applied: Vec<Option<TreeEntry>> = vec![None; merge.mappings.len()];
        let mut resolved = vec![false; merge.mappings.len()];

        for oid in foreign.topo_log()? {
            self.check_cancel()?;
            let commit = foreign.commit(&oid)?;
            let mut changed = false;
            for (i, mapping) in merge.mappings.iter().enumerate() {
                let right = foreign.entry_at(&commit.tree, mapping.from.as_str())?;
                resolved[i] |= right.is_some();
                changed |= merger.merge(applied[i].as_ref(), right.as_ref(), mapping.to.as_str())?;
                applied[i] = right;
            }
            if !changed {
                continue;
            }
            let derived = self.emit(target, &commit)?;
            self.observer.debug(
                &self.job.name,
                format!("merged {} -> {}", oid.short(8), derived.short(8)),
            );
            progress.correlation.record(oid, derived)?;
            progress.merged_commits += 1;
        }

        for (mapping, found) in merge.mappings.iter().zip(resolved) {
            if !found {
                self.warn(
                    progress,
                    Warning::CorrelationGap {
                        repo: self.job.name.to_string(),
                        detail: format!(
                            "merge path '{}' never exists in {}",
                            mapping.from,
                            merge.repo.display()
                        ),
                    },
                );
            }
        }
        Ok(())
    }

    // =========================================================================
    // Splitting
    // =========================================================================

    fn split(
        &self,
        source: &Git,
        target: &Git,
        filter: &PathFilter,
        progress: &mut Progress,
    ) -> Result<(), SplitError> {
        let differ = PathTreeDiff::new(source, &self.job.scope);
        let merger = TreeMerger::new(source, target, filter);
        let mut applied: Option<Oid> = None;
        let mut linked = vec![false; self.job.mounts.len()];

        for oid in self.log {
            self.check_cancel()?;
            let commit = source.commit(oid)?;
            let diff = differ.compute(&commit)?;
            let Some(tree) = diff.tree().cloned() else {
                continue;
            };

            let mut relinked = false;
            for (mount, linked) in self.job.mounts.iter().zip(linked.iter_mut()) {
                if let Some(derived) = mount.correlation.get(oid) {
                    if target.staged_oid(mount.local.as_str())?.as_ref() != Some(derived) {
                        target.stage_gitlink(mount.local.as_str(), derived)?;
                        relinked = true;
                    }
                    *linked = true;
                }
            }

            let content = match &diff {
                ScopedDiff::Absent => false,
                ScopedDiff::FirstAppearance { files, .. } => touches_content(filter, files),
                ScopedDiff::Changes { changes, .. } => touches_content(filter, changes),
            };
            if !content && !relinked {
                // The index already matches `tree` outside the mounts.
                if let ScopedDiff::Changes { parent_tree, .. } = &diff {
                    if applied.as_ref() == Some(parent_tree) {
                        applied = Some(tree);
                    }
                }
                continue;
            }

            match diff {
                ScopedDiff::Changes {
                    parent_tree,
                    changes,
                    ..
                } if applied.as_ref() == Some(&parent_tree) => {
                    self.apply(&merger, target, filter, &changes)?;
                }
                ScopedDiff::FirstAppearance { files, .. } if applied.is_none() => {
                    self.apply(&merger, target, filter, &files)?;
                }
                _ => {
                    let left = applied.clone().map(|oid| TreeEntry::Tree { oid });
                    let right = TreeEntry::Tree { oid: tree.clone() };
                    merger.merge(left.as_ref(), Some(&right), "")?;
                }
            }
            applied = Some(tree);

            let derived = self.emit(target, &commit)?;
            self.observer.debug(
                &self.job.name,
                format!("{} -> {}", oid.short(8), derived.short(8)),
            );
            progress.correlation.record(oid.clone(), derived)?;
            progress.commits += 1;
        }

        if progress.commits > 0 {
            for (mount, linked) in self.job.mounts.iter().zip(linked) {
                if !linked {
                    self.warn(
                        progress,
                        Warning::CorrelationGap {
                            repo: self.job.name.to_string(),
                            detail: format!(
                                "shared component {} was never linked at {}",
                                mount.component, mount.local
                            ),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    /// Replay file-level changes, leaving mounted component paths alone.
    fn apply(
        &self,
        merger: &TreeMerger<'_>,
        target: &Git,
        filter: &PathFilter,
        changes: &[FileChange],
    ) -> Result<(), GitError> {
        for change in changes {
            match change {
                FileChange::Added { path, oid, mode } | FileChange::Modified { path, oid, mode } => {
                    if !filter.excludes(path) {
                        merger.stage_blob(oid, *mode, path)?;
                    }
                }
                FileChange::Deleted { path } => {
                    if !filter.excludes(path) {
                        target.unstage(path)?;
                    }
                }
                FileChange::Renamed { from, to, oid, mode } => {
                    if !filter.excludes(from) {
                        target.unstage(from)?;
                    }
                    if !filter.excludes(to) {
                        merger.stage_blob(oid, *mode, to)?;
                    }
                }
                FileChange::Copied { to, oid, mode, .. } => {
                    if !filter.excludes(to) {
                        merger.stage_blob(oid, *mode, to)?;
                    }
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Finalizing
    // =========================================================================

    fn finalize(
        &self,
        source: &Git,
        target: &Git,
        progress: &mut Progress,
    ) -> Result<(TagSummary, usize), SplitError> {
        let origin = self.job.name.render(&self.config.origin_url);
        target.set_remote("origin", &origin)?;

        let tags = match self.job.kind {
            RepoKind::Project => self.propagate_tags(source, target, progress)?,
            RepoKind::Shared => TagSummary::default(),
        };

        let mut sources = vec![source.lfs_objects_dir()];
        for merge in &self.job.merges {
            sources.push(Git::open(&merge.repo)?.lfs_objects_dir());
        }
        let relocation = LfsObjectRelocator::new(&self.config.lfs_extensions, sources)
            .verify(self.config.verify_lfs_digests)
            .on_missing(self.config.policy.missing_lfs_object)
            .relocate(target, &target.lfs_objects_dir())?;
        for missing in relocation.missing {
            self.warn(
                progress,
                Warning::LfsObjectMissing {
                    repo: self.job.name.to_string(),
                    path: missing.path,
                    digest: missing.digest,
                },
            );
        }
        if relocation.copied > 0 {
            self.observer.progress(
                &self.job.name,
                format!("copied {} large-file objects", relocation.copied),
            );
        }

        target.checkout_head()?;
        self.maintenance.finalize(&self.job.workdir)?;
        Ok((tags, relocation.copied))
    }

    /// Merge-source tags first, then the main repository's, all filtered by
    /// the `<name>-` prefix.
    fn propagate_tags(
        &self,
        source: &Git,
        target: &Git,
        progress: &mut Progress,
    ) -> Result<TagSummary, SplitError> {
        let prefix = format!("{}-", self.job.name);
        let propagator = TagPropagator::new(target, &progress.correlation);

        let mut results = Vec::new();
        for merge in &self.job.merges {
            let foreign = Git::open(&merge.repo)?;
            results.extend(propagator.propagate(&foreign, &prefix)?);
        }
        results.extend(propagator.propagate(source, &prefix)?);

        let mut dropped = Vec::new();
        for result in &results {
            match &result.outcome {
                TagOutcome::Direct { .. } => {
                    self.observer
                        .debug(&self.job.name, format!("converted tag {}", result.name));
                }
                TagOutcome::Ancestor { hops, .. } => {
                    self.observer.debug(
                        &self.job.name,
                        format!("converted tag {} (went back {} commits)", result.name, hops),
                    );
                }
                TagOutcome::Dropped => dropped.push(result.name.clone()),
                TagOutcome::Conflict => {}
            }
        }

        let summary = tags::summarize(&results);
        for result in results {
            let repo = self.job.name.to_string();
            match result.outcome {
                TagOutcome::Dropped => self.warn(progress, Warning::TagDropped { repo, tag: result.name }),
                TagOutcome::Conflict => {
                    self.warn(progress, Warning::TagConflict { repo, tag: result.name })
                }
                _ => {}
            }
        }

        if !dropped.is_empty() && self.config.policy.unresolved_tag == Policy::Fail {
            return Err(SplitError::UnresolvedTags { tags: dropped });
        }
        Ok(summary)
    }
}

/// Check whether `changes` reach anything outside the mounted components.
fn touches_content(filter: &PathFilter, changes: &[FileChange]) -> bool {
    changes.iter().any(|change| match change {
        FileChange::Added { path, .. }
        | FileChange::Modified { path, .. }
        | FileChange::Deleted { path } => !filter.excludes(path),
        FileChange::Renamed { from, to, .. } => !filter.excludes(from) || !filter.excludes(to),
        FileChange::Copied { to, .. } => !filter.excludes(to),
    })
}
