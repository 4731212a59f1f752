//! engine::tree_diff
//!
//! PathTreeDiff: file-level changes of one commit restricted to a scope.
//!
//! Paths in the result are relative to the scope, which is exactly where
//! they land in the derived repository.

use crate::core::types::{join_path, Oid, ScopePath};
use crate::git::{FileChange, Git, GitError, SourceCommit, TreeEntry};

/// Result of diffing one commit under a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopedDiff {
    /// The commit has no subtree at the scope.
    Absent,

    /// The first parent has no subtree at the scope (or there is no
    /// parent): every file under the scope, as additions.
    FirstAppearance { tree: Oid, files: Vec<FileChange> },

    /// The first parent has a subtree at the scope. Empty `changes` means
    /// the scoped content is identical.
    Changes {
        parent_tree: Oid,
        tree: Oid,
        changes: Vec<FileChange>,
    },
}

impl ScopedDiff {
    /// The commit's scoped tree, when present.
    pub fn tree(&self) -> Option<&Oid> {
        match self {
            ScopedDiff::Absent => None,
            ScopedDiff::FirstAppearance { tree, .. } | ScopedDiff::Changes { tree, .. } => {
                Some(tree)
            }
        }
    }

    /// True when the commit must not produce a derived commit: the scope is
    /// absent, or it has parent history and nothing changed.
    pub fn is_unchanged(&self) -> bool {
        match self {
            ScopedDiff::Absent => true,
            ScopedDiff::FirstAppearance { .. } => false,
            ScopedDiff::Changes { changes, .. } => changes.is_empty(),
        }
    }
}

/// Scoped diff computation against one repository.
#[derive(Debug)]
pub struct PathTreeDiff<'a> {
    git: &'a Git,
    scope: &'a ScopePath,
}

impl<'a> PathTreeDiff<'a> {
    /// Diff commits of `git` under `scope`.
    pub fn new(git: &'a Git, scope: &'a ScopePath) -> Self {
        Self { git, scope }
    }

    /// The subtree at the scope inside `root`, if the scope is a directory.
    pub fn scoped_tree(&self, root: &Oid) -> Result<Option<Oid>, GitError> {
        match self.git.entry_at(root, self.scope.as_str())? {
            Some(TreeEntry::Tree { oid }) => Ok(Some(oid)),
            _ => Ok(None),
        }
    }

    /// Diff `commit` against its first parent under the scope.
    pub fn compute(&self, commit: &SourceCommit) -> Result<ScopedDiff, GitError> {
        let Some(tree) = self.scoped_tree(&commit.tree)? else {
            return Ok(ScopedDiff::Absent);
        };

        let parent_tree = match commit.first_parent() {
            Some(parent) => {
                let parent = self.git.commit(parent)?;
                self.scoped_tree(&parent.tree)?
            }
            None => None,
        };

        match parent_tree {
            None => {
                let files = list_files(self.git, &tree)?;
                Ok(ScopedDiff::FirstAppearance { tree, files })
            }
            Some(parent_tree) => {
                let changes = if parent_tree == tree {
                    Vec::new()
                } else {
                    self.git.diff_trees(&parent_tree, &tree)?
                };
                Ok(ScopedDiff::Changes {
                    parent_tree,
                    tree,
                    changes,
                })
            }
        }
    }
}

/// Every file under `tree`, recursively, as additions in tree order.
///
/// Gitlinks are not files and are skipped.
pub fn list_files(git: &Git, tree: &Oid) -> Result<Vec<FileChange>, GitError> {
    let mut out = Vec::new();
    walk(git, tree, "", &mut out)?;
    Ok(out)
}

fn walk(git: &Git, tree: &Oid, prefix: &str, out: &mut Vec<FileChange>) -> Result<(), GitError> {
    for (name, entry) in git.tree_entries(tree)? {
        let path = join_path(prefix, &name);
        match entry {
            TreeEntry::Tree { oid } => walk(git, &oid, &path, out)?,
            TreeEntry::Blob { oid, mode } => out.push(FileChange::Added { path, oid, mode }),
            TreeEntry::Gitlink { .. } => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{FileMode, Timestamp};
    use crate::git::Identity;
    use tempfile::TempDir;

    fn ident() -> Identity {
        Identity {
            name: "T".into(),
            email: "t@example.com".into(),
            when: Timestamp {
                seconds: 1_500_000_000,
                offset_minutes: 0,
            },
        }
    }

    struct Fixture {
        _dir: TempDir,
        git: Git,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let git = Git::init(dir.path(), "master").unwrap();
            Self { _dir: dir, git }
        }

        fn put(&self, path: &str, content: &str) {
            let blob = self.git.write_blob(content.as_bytes()).unwrap();
            self.git.stage_file(path, &blob, FileMode::Regular).unwrap();
        }

        fn commit(&self) -> SourceCommit {
            let oid = self.git.commit_index("c", &ident(), &ident()).unwrap();
            self.git.commit(&oid).unwrap()
        }
    }

    fn paths(changes: &[FileChange]) -> Vec<String> {
        changes
            .iter()
            .map(|c| match c {
                FileChange::Added { path, .. }
                | FileChange::Modified { path, .. }
                | FileChange::Deleted { path } => path.clone(),
                FileChange::Renamed { to, .. } | FileChange::Copied { to, .. } => to.clone(),
            })
            .collect()
    }

    #[test]
    fn absent_scope() {
        let fx = Fixture::new();
        fx.put("B/bar.txt", "bar");
        let commit = fx.commit();
        let scope = ScopePath::new("A").unwrap();
        let diff = PathTreeDiff::new(&fx.git, &scope).compute(&commit).unwrap();
        assert_eq!(diff, ScopedDiff::Absent);
        assert!(diff.is_unchanged());
    }

    #[test]
    fn file_at_scope_counts_as_absent() {
        let fx = Fixture::new();
        fx.put("A", "not a directory");
        let commit = fx.commit();
        let scope = ScopePath::new("A").unwrap();
        let diff = PathTreeDiff::new(&fx.git, &scope).compute(&commit).unwrap();
        assert_eq!(diff, ScopedDiff::Absent);
    }

    #[test]
    fn first_appearance_lists_everything_relative_to_scope() {
        let fx = Fixture::new();
        fx.put("B/bar.txt", "bar");
        fx.commit();
        fx.put("A/foo.txt", "foo");
        fx.put("A/sub/deep.txt", "deep");
        let commit = fx.commit();

        let scope = ScopePath::new("A").unwrap();
        let diff = PathTreeDiff::new(&fx.git, &scope).compute(&commit).unwrap();
        match &diff {
            ScopedDiff::FirstAppearance { files, .. } => {
                assert_eq!(paths(files), vec!["foo.txt", "sub/deep.txt"]);
            }
            other => panic!("expected first appearance, got {other:?}"),
        }
        assert!(!diff.is_unchanged());
    }

    #[test]
    fn unrelated_change_is_empty() {
        let fx = Fixture::new();
        fx.put("A/foo.txt", "foo");
        fx.commit();
        fx.put("B/bar.txt", "bar");
        let commit = fx.commit();

        let scope = ScopePath::new("A").unwrap();
        let diff = PathTreeDiff::new(&fx.git, &scope).compute(&commit).unwrap();
        assert!(matches!(diff, ScopedDiff::Changes { ref changes, .. } if changes.is_empty()));
        assert!(diff.is_unchanged());
    }

    #[test]
    fn scoped_changes_are_relative() {
        let fx = Fixture::new();
        fx.put("A/foo.txt", "foo");
        fx.put("A/gone.txt", "gone");
        fx.commit();
        fx.put("A/foo.txt", "foo v2");
        fx.git.unstage("A/gone.txt").unwrap();
        let commit = fx.commit();

        let scope = ScopePath::new("A").unwrap();
        let diff = PathTreeDiff::new(&fx.git, &scope).compute(&commit).unwrap();
        let ScopedDiff::Changes { changes, .. } = diff else {
            panic!("expected changes");
        };
        assert!(changes.contains(&FileChange::Deleted {
            path: "gone.txt".into()
        }));
        assert!(changes
            .iter()
            .any(|c| matches!(c, FileChange::Modified { path, .. } if path == "foo.txt")));
    }

    #[test]
    fn listing_skips_gitlinks() {
        let fx = Fixture::new();
        fx.put("A/foo.txt", "foo");
        fx.git
            .stage_gitlink("A/lib", &Oid::new("c".repeat(40)).unwrap())
            .unwrap();
        let commit = fx.commit();
        let scope = ScopePath::new("A").unwrap();
        let tree = PathTreeDiff::new(&fx.git, &scope)
            .scoped_tree(&commit.tree)
            .unwrap()
            .unwrap();
        assert_eq!(paths(&list_files(&fx.git, &tree).unwrap()), vec!["foo.txt"]);
    }
}
