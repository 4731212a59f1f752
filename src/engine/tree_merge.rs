//! engine::tree_merge
//!
//! TreeMerger: fold the difference between two states of a source
//! subtree into a target repository's index.
//!
//! # Semantics
//!
//! Given a `left` (prior state, possibly absent) and a `right` (new state,
//! possibly absent) entry of the source repository and a target path:
//!
//! - identical object id and mode on both sides is a no-op, so unchanged
//!   subtrees are skipped without being walked
//! - every blob in `right` that differs from `left` is copied into the
//!   target object store and staged
//! - every entry of `left` absent from `right` is unstaged
//! - a type change (file ↔ directory) is removal followed by recreation
//! - gitlinks inside the source are not content and are skipped
//! - paths matched by the [`PathFilter`] are never touched
//!
//! The result reports whether the index changed.

use std::collections::BTreeMap;

use crate::core::types::{is_under, join_path, FileMode, Oid, ScopePath};
use crate::git::{Git, GitError, TreeEntry};

/// Target paths owned by someone else (mounted shared components).
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    excluded: Vec<String>,
}

impl PathFilter {
    /// A filter excluding nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// A filter excluding each path and everything under it.
    pub fn new<'a>(paths: impl IntoIterator<Item = &'a ScopePath>) -> Self {
        Self {
            excluded: paths.into_iter().map(|p| p.as_str().to_string()).collect(),
        }
    }

    /// Check whether `path` is an excluded path or lies under one.
    pub fn excludes(&self, path: &str) -> bool {
        self.excluded
            .iter()
            .any(|ex| path == ex || is_under(path, ex))
    }

    /// Check whether an excluded path lies strictly under directory `dir`.
    fn shadows(&self, dir: &str) -> bool {
        self.excluded
            .iter()
            .any(|ex| dir.is_empty() || is_under(ex, dir))
    }
}

/// Copies blobs from `source` into `target` and stages them.
#[derive(Debug)]
pub struct TreeMerger<'a> {
    source: &'a Git,
    target: &'a Git,
    filter: &'a PathFilter,
}

impl<'a> TreeMerger<'a> {
    /// Merge from `source` into the index of `target`.
    pub fn new(source: &'a Git, target: &'a Git, filter: &'a PathFilter) -> Self {
        Self {
            source,
            target,
            filter,
        }
    }

    /// Fold `left → right` into the index at `path` (empty for the root).
    ///
    /// # Errors
    ///
    /// Propagates object store and index errors.
    pub fn merge(
        &self,
        left: Option<&TreeEntry>,
        right: Option<&TreeEntry>,
        path: &str,
    ) -> Result<bool, GitError> {
        if !path.is_empty() && self.filter.excludes(path) {
            return Ok(false);
        }

        match (left, right) {
            (None, None) => Ok(false),
            (Some(l), Some(r)) if l == r => Ok(false),
            (Some(l), None) => self.remove(l, path),
            (_, Some(TreeEntry::Gitlink { .. })) => match left {
                Some(l) => self.remove(l, path),
                None => Ok(false),
            },
            (_, Some(TreeEntry::Blob { oid, mode })) => {
                if let Some(tree @ TreeEntry::Tree { .. }) = left {
                    self.remove(tree, path)?;
                }
                self.stage_blob(oid, *mode, path)?;
                Ok(true)
            }
            (_, Some(TreeEntry::Tree { oid })) => self.merge_tree(left, oid, path),
        }
    }

    fn merge_tree(
        &self,
        left: Option<&TreeEntry>,
        right: &Oid,
        path: &str,
    ) -> Result<bool, GitError> {
        let mut changed = false;
        let mut previous: BTreeMap<String, TreeEntry> = match left {
            Some(TreeEntry::Tree { oid }) => self.source.tree_entries(oid)?.into_iter().collect(),
            Some(other) => {
                changed |= self.remove(other, path)?;
                BTreeMap::new()
            }
            None => BTreeMap::new(),
        };

        for (name, entry) in self.source.tree_entries(right)? {
            let before = previous.remove(&name);
            changed |= self.merge(before.as_ref(), Some(&entry), &join_path(path, &name))?;
        }
        for (name, entry) in previous {
            changed |= self.merge(Some(&entry), None, &join_path(path, &name))?;
        }
        Ok(changed)
    }

    /// Copy a source blob into the target object store and stage it at
    /// `path`.
    pub fn stage_blob(&self, oid: &Oid, mode: FileMode, path: &str) -> Result<(), GitError> {
        let content = self.source.read_blob(oid)?;
        let copied = self.target.write_blob(&content)?;
        self.target.stage_file(path, &copied, mode)
    }

    /// Unstage a left-side entry. Gitlinks from the source were never
    /// staged, so removing them is a no-op.
    fn remove(&self, entry: &TreeEntry, path: &str) -> Result<bool, GitError> {
        match entry {
            TreeEntry::Gitlink { .. } => Ok(false),
            TreeEntry::Blob { .. } => {
                self.target.unstage(path)?;
                Ok(true)
            }
            TreeEntry::Tree { oid } => {
                if !self.filter.shadows(path) {
                    self.target.unstage_dir(path)?;
                    return Ok(true);
                }
                // An excluded path lives below; remove entry by entry.
                let mut changed = false;
                for (name, child) in self.source.tree_entries(oid)? {
                    changed |= self.merge(Some(&child), None, &join_path(path, &name))?;
                }
                Ok(changed)
            }
        }
    }
}
