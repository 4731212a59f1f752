//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to all Git operations in
//! monosplit. Source repositories are read through it, derived repositories
//! are created and populated through it, and every git2 error is normalized
//! into a typed [`GitError`].
//!
//! # Object model
//!
//! Tree entries surface as the tagged variant [`TreeEntry`]
//! (`Tree` / `Blob` / `Gitlink`), so callers recurse structurally instead of
//! inspecting object types at runtime.
//!
//! # Index staging
//!
//! Derived repositories are built by staging explicit index entries
//! (object id + mode + path) and writing the index as a tree. Content is
//! never re-read from disk, so `.gitattributes` filters and line-ending
//! conversion cannot alter the bytes that were copied from the source.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{FileMode, Oid, Timestamp, TypeError, GITLINK_MODE};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was opened
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("repository has no working directory: {path}")]
    BareRepo {
        /// The repository path
        path: PathBuf,
    },

    /// Failed to create a repository.
    #[error("failed to initialize repository at {path}: {message}")]
    InitFailed {
        /// Where the repository was being created
        path: PathBuf,
        /// Underlying error
        message: String,
    },

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// A path inside a tree is not valid UTF-8.
    #[error("path is not valid UTF-8: {path}")]
    InvalidPath {
        /// Lossy rendering of the path
        path: String,
    },

    /// Permission or filesystem error.
    #[error("repository access error: {message}")]
    AccessError {
        /// Description of the error
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") || context == "HEAD" {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            git2::ErrorCode::Locked => GitError::AccessError {
                message: format!("repository is locked: {}", err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidPath(msg) | TypeError::InvalidRepoName(msg) => {
                GitError::InvalidPath { path: msg }
            }
        }
    }
}

/// One entry of a tree, as a tagged variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    /// A subtree.
    Tree {
        /// Tree object id
        oid: Oid,
    },
    /// A file-like entry with content.
    Blob {
        /// Blob object id
        oid: Oid,
        /// File mode
        mode: FileMode,
    },
    /// A submodule commit reference.
    Gitlink {
        /// Commit id in the submodule repository
        oid: Oid,
    },
}

impl TreeEntry {
    /// The object id the entry points at.
    pub fn oid(&self) -> &Oid {
        match self {
            TreeEntry::Tree { oid } | TreeEntry::Blob { oid, .. } | TreeEntry::Gitlink { oid } => {
                oid
            }
        }
    }

    /// Check whether two entries have the same kind (tree/blob/gitlink).
    pub fn same_kind(&self, other: &TreeEntry) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// An author or committer identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Display name
    pub name: String,
    /// Email address
    pub email: String,
    /// When the identity acted
    pub when: Timestamp,
}

/// A commit read from a source repository.
#[derive(Debug, Clone)]
pub struct SourceCommit {
    /// Commit id
    pub oid: Oid,
    /// Parent ids, first parent first
    pub parents: Vec<Oid>,
    /// Root tree id
    pub tree: Oid,
    /// Author identity
    pub author: Identity,
    /// Committer identity
    pub committer: Identity,
    /// Full commit message
    pub message: String,
}

impl SourceCommit {
    /// The first parent, if any.
    pub fn first_parent(&self) -> Option<&Oid> {
        self.parents.first()
    }
}

/// A file-level change between two trees.
///
/// Paths are relative to the trees that were compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    /// A new file.
    Added {
        path: String,
        oid: Oid,
        mode: FileMode,
    },
    /// Content or mode changed in place.
    Modified {
        path: String,
        oid: Oid,
        mode: FileMode,
    },
    /// A file was removed.
    Deleted { path: String },
    /// A file moved; the old path no longer exists.
    Renamed {
        from: String,
        to: String,
        oid: Oid,
        mode: FileMode,
    },
    /// A file was copied; the old path is retained.
    Copied {
        from: String,
        to: String,
        oid: Oid,
        mode: FileMode,
    },
}

/// Annotation carried by an annotated tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAnnotation {
    /// Tagger identity
    pub tagger: Identity,
    /// Tag message
    pub message: String,
}

/// A tag read from a repository.
#[derive(Debug, Clone)]
pub struct TagInfo {
    /// Short tag name (without `refs/tags/`)
    pub name: String,
    /// The commit the tag peels to, if it peels to a commit at all
    pub target: Option<Oid>,
    /// Annotation, for annotated tags with a tagger
    pub annotation: Option<TagAnnotation>,
}

/// The Git interface.
///
/// This is the **single point of interaction** with Git. No other module
/// imports `git2`.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

fn to_git2(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
}

fn from_git2(oid: git2::Oid) -> Result<Oid, GitError> {
    Ok(Oid::new(oid.to_string())?)
}

fn identity(sig: &git2::Signature<'_>) -> Identity {
    let when = sig.when();
    Identity {
        name: String::from_utf8_lossy(sig.name_bytes()).into_owned(),
        email: String::from_utf8_lossy(sig.email_bytes()).into_owned(),
        when: Timestamp {
            seconds: when.seconds(),
            offset_minutes: when.offset_minutes(),
        },
    }
}

fn signature(id: &Identity) -> Result<git2::Signature<'static>, GitError> {
    let time = git2::Time::new(id.when.seconds, id.when.offset_minutes);
    git2::Signature::new(&id.name, &id.email, &time)
        .map_err(|e| GitError::from_git2(e, &format!("signature for {}", id.name)))
}

fn path_str(path: Option<&Path>) -> Result<String, GitError> {
    let path = path.ok_or_else(|| GitError::Internal {
        message: "diff delta without a path".to_string(),
    })?;
    path.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| GitError::InvalidPath {
            path: path.to_string_lossy().into_owned(),
        })
}

fn file_mode(mode: git2::FileMode) -> Option<FileMode> {
    match mode {
        git2::FileMode::Blob | git2::FileMode::BlobGroupWritable => Some(FileMode::Regular),
        git2::FileMode::BlobExecutable => Some(FileMode::Executable),
        git2::FileMode::Link => Some(FileMode::Symlink),
        _ => None,
    }
}

fn index_entry(path: &str, oid: git2::Oid, mode: u32) -> git2::IndexEntry {
    git2::IndexEntry {
        ctime: git2::IndexTime::new(0, 0),
        mtime: git2::IndexTime::new(0, 0),
        dev: 0,
        ino: 0,
        mode,
        uid: 0,
        gid: 0,
        file_size: 0,
        id: oid,
        flags: 0,
        flags_extended: 0,
        path: path.as_bytes().to_vec(),
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open an existing repository at exactly `path` (no upward discovery).
    ///
    /// Bare repositories are accepted; callers that need a working
    /// directory use [`Git::work_dir`].
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if `path` is not a repository
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::open(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        Ok(Self { repo })
    }

    /// Create a new non-bare repository whose unborn HEAD points at
    /// `refs/heads/<branch>`.
    pub fn init(path: &Path, branch: &str) -> Result<Self, GitError> {
        let mut opts = git2::RepositoryInitOptions::new();
        opts.initial_head(branch).mkpath(true);
        let repo =
            git2::Repository::init_opts(path, &opts).map_err(|e| GitError::InitFailed {
                path: path.to_path_buf(),
                message: e.message().to_string(),
            })?;
        Ok(Self { repo })
    }

    /// Path to the `.git` directory (or the repository itself when bare).
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Path to the working directory.
    ///
    /// # Errors
    ///
    /// - [`GitError::BareRepo`] if the repository has none
    pub fn work_dir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or_else(|| GitError::BareRepo {
            path: self.repo.path().to_path_buf(),
        })
    }

    /// Local large-file object cache (`<git_dir>/lfs/objects`).
    pub fn lfs_objects_dir(&self) -> PathBuf {
        self.repo.path().join("lfs").join("objects")
    }

    // =========================================================================
    // History
    // =========================================================================

    /// The commit HEAD points at, or `None` for an unborn HEAD.
    pub fn head_oid(&self) -> Result<Option<Oid>, GitError> {
        match self.repo.head() {
            Ok(head) => match head.target() {
                Some(oid) => Ok(Some(from_git2(oid)?)),
                None => Ok(None),
            },
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(GitError::from_git2(e, "HEAD")),
        }
    }

    /// Every commit reachable from HEAD, parents before children, oldest
    /// first. Empty for an unborn HEAD.
    pub fn topo_log(&self) -> Result<Vec<Oid>, GitError> {
        if self.head_oid()?.is_none() {
            return Ok(Vec::new());
        }
        let mut walk = self.repo.revwalk()?;
        walk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)?;
        walk.push_head()?;

        let mut out = Vec::new();
        for oid in walk {
            out.push(from_git2(oid?)?);
        }
        Ok(out)
    }

    /// Read a commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the commit doesn't exist
    pub fn commit(&self, oid: &Oid) -> Result<SourceCommit, GitError> {
        let commit = self
            .repo
            .find_commit(to_git2(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let mut parents = Vec::with_capacity(commit.parent_count());
        for parent in commit.parent_ids() {
            parents.push(from_git2(parent)?);
        }

        let author = identity(&commit.author());
        let committer = identity(&commit.committer());
        Ok(SourceCommit {
            oid: oid.clone(),
            parents,
            tree: from_git2(commit.tree_id())?,
            author,
            committer,
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
        })
    }

    /// The first parent of a commit, if any.
    pub fn first_parent(&self, oid: &Oid) -> Result<Option<Oid>, GitError> {
        let commit = self
            .repo
            .find_commit(to_git2(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        match commit.parent_id(0) {
            Ok(parent) => Ok(Some(from_git2(parent)?)),
            Err(_) => Ok(None),
        }
    }

    /// Check whether a commit object exists in this repository.
    pub fn has_commit(&self, oid: &Oid) -> Result<bool, GitError> {
        Ok(self.repo.find_commit(to_git2(oid)?).is_ok())
    }

    // =========================================================================
    // Trees
    // =========================================================================

    /// Look up the entry at a slash-delimited `path` inside `tree`.
    ///
    /// Returns `Ok(None)` if nothing exists at that path.
    pub fn entry_at(&self, tree: &Oid, path: &str) -> Result<Option<TreeEntry>, GitError> {
        let tree = self
            .repo
            .find_tree(to_git2(tree)?)
            .map_err(|e| GitError::from_git2(e, tree.as_str()))?;
        match tree.get_path(Path::new(path)) {
            Ok(entry) => Self::convert_entry(&entry),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, path)),
        }
    }

    /// List the direct children of a tree in name order.
    ///
    /// Entries of unknown kind are skipped.
    pub fn tree_entries(&self, tree: &Oid) -> Result<Vec<(String, TreeEntry)>, GitError> {
        let tree = self
            .repo
            .find_tree(to_git2(tree)?)
            .map_err(|e| GitError::from_git2(e, tree.as_str()))?;

        let mut out = Vec::with_capacity(tree.len());
        for entry in tree.iter() {
            let name = entry
                .name()
                .ok_or_else(|| GitError::InvalidPath {
                    path: String::from_utf8_lossy(entry.name_bytes()).into_owned(),
                })?
                .to_string();
            if let Some(converted) = Self::convert_entry(&entry)? {
                out.push((name, converted));
            }
        }
        Ok(out)
    }

    fn convert_entry(entry: &git2::TreeEntry<'_>) -> Result<Option<TreeEntry>, GitError> {
        let oid = from_git2(entry.id())?;
        Ok(match entry.kind() {
            Some(git2::ObjectType::Tree) => Some(TreeEntry::Tree { oid }),
            Some(git2::ObjectType::Blob) => Some(TreeEntry::Blob {
                oid,
                mode: FileMode::from_bits(entry.filemode() as u32).unwrap_or(FileMode::Regular),
            }),
            Some(git2::ObjectType::Commit) => Some(TreeEntry::Gitlink { oid }),
            _ => None,
        })
    }

    /// Compute file-level changes from tree `old` to tree `new`.
    ///
    /// Directory entries never appear; gitlinks are not files and are
    /// skipped. Same-content-different-path pairs are reported as renames or
    /// copies by libgit2's similarity detection.
    pub fn diff_trees(&self, old: &Oid, new: &Oid) -> Result<Vec<FileChange>, GitError> {
        let old_tree = self
            .repo
            .find_tree(to_git2(old)?)
            .map_err(|e| GitError::from_git2(e, old.as_str()))?;
        let new_tree = self
            .repo
            .find_tree(to_git2(new)?)
            .map_err(|e| GitError::from_git2(e, new.as_str()))?;

        let mut diff = self
            .repo
            .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), None)?;
        let mut find = git2::DiffFindOptions::new();
        find.renames(true).copies(true);
        diff.find_similar(Some(&mut find))?;

        let mut changes = Vec::new();
        for delta in diff.deltas() {
            let old_file = delta.old_file();
            let new_file = delta.new_file();
            let new_mode = file_mode(new_file.mode());
            let old_is_file = file_mode(old_file.mode()).is_some();

            match delta.status() {
                git2::Delta::Added => {
                    if let Some(mode) = new_mode {
                        changes.push(FileChange::Added {
                            path: path_str(new_file.path())?,
                            oid: from_git2(new_file.id())?,
                            mode,
                        });
                    }
                }
                git2::Delta::Deleted => {
                    if old_is_file {
                        changes.push(FileChange::Deleted {
                            path: path_str(old_file.path())?,
                        });
                    }
                }
                git2::Delta::Modified | git2::Delta::Typechange => {
                    match (old_is_file, new_mode) {
                        (_, Some(mode)) => changes.push(FileChange::Modified {
                            path: path_str(new_file.path())?,
                            oid: from_git2(new_file.id())?,
                            mode,
                        }),
                        (true, None) => changes.push(FileChange::Deleted {
                            path: path_str(old_file.path())?,
                        }),
                        (false, None) => {}
                    }
                }
                git2::Delta::Renamed => {
                    if let Some(mode) = new_mode {
                        changes.push(FileChange::Renamed {
                            from: path_str(old_file.path())?,
                            to: path_str(new_file.path())?,
                            oid: from_git2(new_file.id())?,
                            mode,
                        });
                    }
                }
                git2::Delta::Copied => {
                    if let Some(mode) = new_mode {
                        changes.push(FileChange::Copied {
                            from: path_str(old_file.path())?,
                            to: path_str(new_file.path())?,
                            oid: from_git2(new_file.id())?,
                            mode,
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(changes)
    }

    // =========================================================================
    // Blob Operations
    // =========================================================================

    /// Write content as a blob and return its OID.
    pub fn write_blob(&self, content: &[u8]) -> Result<Oid, GitError> {
        let oid = self.repo.blob(content)?;
        from_git2(oid)
    }

    /// Read a blob by OID.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the blob doesn't exist
    pub fn read_blob(&self, oid: &Oid) -> Result<Vec<u8>, GitError> {
        let blob = self
            .repo
            .find_blob(to_git2(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        Ok(blob.content().to_vec())
    }

    // =========================================================================
    // Index Staging
    // =========================================================================

    /// Stage a file entry pointing at an existing blob.
    pub fn stage_file(&self, path: &str, oid: &Oid, mode: FileMode) -> Result<(), GitError> {
        let mut index = self.repo.index()?;
        index
            .add(&index_entry(path, to_git2(oid)?, mode.bits()))
            .map_err(|e| GitError::from_git2(e, path))
    }

    /// Stage a gitlink (submodule commit reference).
    pub fn stage_gitlink(&self, path: &str, commit: &Oid) -> Result<(), GitError> {
        let mut index = self.repo.index()?;
        index
            .add(&index_entry(path, to_git2(commit)?, GITLINK_MODE))
            .map_err(|e| GitError::from_git2(e, path))
    }

    /// The object id staged at exactly `path`, if any.
    pub fn staged_oid(&self, path: &str) -> Result<Option<Oid>, GitError> {
        let index = self.repo.index()?;
        match index.get_path(Path::new(path), 0) {
            Some(entry) => Ok(Some(from_git2(entry.id)?)),
            None => Ok(None),
        }
    }

    /// Unstage a single path. Missing paths are not an error.
    pub fn unstage(&self, path: &str) -> Result<(), GitError> {
        let mut index = self.repo.index()?;
        index
            .remove_path(Path::new(path))
            .map_err(|e| GitError::from_git2(e, path))
    }

    /// Unstage every entry under a directory.
    pub fn unstage_dir(&self, path: &str) -> Result<(), GitError> {
        let mut index = self.repo.index()?;
        index
            .remove_dir(Path::new(path), 0)
            .map_err(|e| GitError::from_git2(e, path))
    }

    /// Remove every staged entry.
    pub fn clear_index(&self) -> Result<(), GitError> {
        let mut index = self.repo.index()?;
        index.clear()?;
        Ok(())
    }

    /// Paths currently staged, in index order.
    pub fn staged_paths(&self) -> Result<Vec<String>, GitError> {
        let index = self.repo.index()?;
        let mut out = Vec::with_capacity(index.len());
        for entry in index.iter() {
            out.push(String::from_utf8_lossy(&entry.path).into_owned());
        }
        Ok(out)
    }

    /// Write the index as a commit on top of HEAD and advance HEAD.
    ///
    /// The commit always has HEAD (if born) as its sole parent and is
    /// created even when its tree equals the parent's.
    pub fn commit_index(
        &self,
        message: &str,
        author: &Identity,
        committer: &Identity,
    ) -> Result<Oid, GitError> {
        let mut index = self.repo.index()?;
        index.write()?;
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;

        let parent = match self.head_oid()? {
            Some(head) => Some(self.repo.find_commit(to_git2(&head)?)?),
            None => None,
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = self.repo.commit(
            Some("HEAD"),
            &signature(author)?,
            &signature(committer)?,
            message,
            &tree,
            &parents,
        )?;
        from_git2(oid)
    }

    /// Force the working directory to match HEAD.
    ///
    /// Does nothing for an unborn HEAD.
    pub fn checkout_head(&self) -> Result<(), GitError> {
        if self.head_oid()?.is_none() {
            return Ok(());
        }
        let mut opts = git2::build::CheckoutBuilder::new();
        opts.force().remove_untracked(true);
        self.repo
            .checkout_head(Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, "checkout HEAD"))
    }

    // =========================================================================
    // Tags
    // =========================================================================

    /// List every tag, peeled to its commit.
    pub fn tags(&self) -> Result<Vec<TagInfo>, GitError> {
        let names = self.repo.tag_names(None)?;
        let mut out = Vec::new();
        for name in names.iter().flatten() {
            let refname = format!("refs/tags/{}", name);
            let reference = self
                .repo
                .find_reference(&refname)
                .map_err(|e| GitError::from_git2(e, &refname))?;
            let direct = reference.target().ok_or_else(|| GitError::Internal {
                message: format!("{} is a symbolic ref", refname),
            })?;
            let object = self
                .repo
                .find_object(direct, None)
                .map_err(|e| GitError::from_git2(e, &refname))?;

            let annotation = object.as_tag().and_then(|tag| {
                tag.tagger().map(|tagger| TagAnnotation {
                    tagger: identity(&tagger),
                    message: tag.message().unwrap_or("").to_string(),
                })
            });
            let target = match object.peel_to_commit() {
                Ok(commit) => Some(from_git2(commit.id())?),
                Err(_) => None,
            };

            out.push(TagInfo {
                name: name.to_string(),
                target,
                annotation,
            });
        }
        Ok(out)
    }

    /// Create a tag at `target`. Returns `false` if the tag already exists.
    pub fn create_tag(
        &self,
        name: &str,
        target: &Oid,
        annotation: Option<&TagAnnotation>,
    ) -> Result<bool, GitError> {
        let refname = format!("refs/tags/{}", name);
        if self.repo.find_reference(&refname).is_ok() {
            return Ok(false);
        }
        let object = self
            .repo
            .find_object(to_git2(target)?, Some(git2::ObjectType::Commit))
            .map_err(|e| GitError::from_git2(e, target.as_str()))?;

        match annotation {
            Some(annotation) => {
                self.repo.tag(
                    name,
                    &object,
                    &signature(&annotation.tagger)?,
                    &annotation.message,
                    false,
                )?;
            }
            None => {
                self.repo.tag_lightweight(name, &object, false)?;
            }
        }
        Ok(true)
    }

    /// Resolve a tag name to the commit it peels to.
    pub fn tag_target(&self, name: &str) -> Result<Option<Oid>, GitError> {
        let refname = format!("refs/tags/{}", name);
        match self.repo.find_reference(&refname) {
            Ok(reference) => {
                let commit = reference
                    .peel_to_commit()
                    .map_err(|e| GitError::from_git2(e, &refname))?;
                Ok(Some(from_git2(commit.id())?))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, &refname)),
        }
    }

    // =========================================================================
    // Remote Operations
    // =========================================================================

    /// Create or repoint a remote.
    pub fn set_remote(&self, name: &str, url: &str) -> Result<(), GitError> {
        match self.repo.find_remote(name) {
            Ok(_) => self.repo.remote_set_url(name, url)?,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                self.repo.remote(name, url)?;
            }
            Err(e) => return Err(GitError::from_git2(e, name)),
        }
        Ok(())
    }

    /// Get the URL for a remote.
    ///
    /// Returns `None` if the remote doesn't exist.
    pub fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(String::from)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, name)),
        }
    }
}
