//! engine::lfs
//!
//! LfsObjectRelocator: populate a derived repository's large-file cache.
//!
//! Every commit of the finished repository is walked; each blob whose name
//! carries a configured extension is parsed as a pointer and its object is
//! copied from the first candidate cache that has it. Existing objects are
//! left alone and not counted, so re-running is a no-op.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::config::Policy;
use crate::core::lfs::{matches_extension, object_path, LfsPointer, PointerError};
use crate::core::types::{join_path, Oid};
use crate::git::{Git, GitError, TreeEntry};

/// Errors from large-file relocation.
#[derive(Debug, Error)]
pub enum LfsError {
    #[error("{path} is not a valid large-file pointer: {detail}")]
    PointerFormat { path: String, detail: String },

    #[error("large-file object {digest} not found (searched: {})", format_paths(.searched))]
    MissingObject {
        digest: String,
        searched: Vec<PathBuf>,
    },

    #[error("large-file object {digest} copied from '{origin}' hashes to {actual}")]
    DigestMismatch {
        digest: String,
        actual: String,
        origin: PathBuf,
    },

    #[error("i/o error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Git(#[from] GitError),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> LfsError + '_ {
    move |source| LfsError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A pointer whose object no candidate cache had (policy `warn`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingObject {
    pub path: String,
    pub digest: String,
}

/// What a relocation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocationSummary {
    /// Objects newly copied
    pub copied: usize,
    /// Objects that could not be found
    pub missing: Vec<MissingObject>,
}

/// Copies referenced large-file objects into a repository's cache.
#[derive(Debug, Clone)]
pub struct LfsObjectRelocator<'a> {
    extensions: &'a [String],
    sources: Vec<PathBuf>,
    verify: bool,
    on_missing: Policy,
}

impl<'a> LfsObjectRelocator<'a> {
    /// Relocate objects for blobs named with one of `extensions`, searching
    /// `sources` in order.
    pub fn new(extensions: &'a [String], sources: Vec<PathBuf>) -> Self {
        Self {
            extensions,
            sources,
            verify: true,
            on_missing: Policy::Fail,
        }
    }

    /// Hash copied objects and compare them against their digest.
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// What to do about an object no source has.
    pub fn on_missing(mut self, policy: Policy) -> Self {
        self.on_missing = policy;
        self
    }

    /// Walk every commit of `repo` and fill the cache at `dest`.
    ///
    /// # Errors
    ///
    /// - [`LfsError::PointerFormat`] for a matching blob that is not a pointer
    /// - [`LfsError::MissingObject`] when no source has an object (policy `fail`)
    /// - [`LfsError::DigestMismatch`] when a copied object fails verification
    pub fn relocate(&self, repo: &Git, dest: &Path) -> Result<RelocationSummary, LfsError> {
        let mut walk = Walk {
            relocator: self,
            repo,
            dest,
            seen_trees: HashSet::new(),
            seen_blobs: HashSet::new(),
            summary: RelocationSummary::default(),
        };
        for oid in repo.topo_log()? {
            let commit = repo.commit(&oid)?;
            walk.tree(&commit.tree, "")?;
        }
        Ok(walk.summary)
    }

    fn locate(&self, digest: &str) -> Option<PathBuf> {
        self.sources
            .iter()
            .map(|root| object_path(root, digest))
            .find(|candidate| candidate.is_file())
    }
}

struct Walk<'r, 'a> {
    relocator: &'r LfsObjectRelocator<'a>,
    repo: &'r Git,
    dest: &'r Path,
    seen_trees: HashSet<Oid>,
    seen_blobs: HashSet<Oid>,
    summary: RelocationSummary,
}

impl Walk<'_, '_> {
    fn tree(&mut self, tree: &Oid, prefix: &str) -> Result<(), LfsError> {
        if !self.seen_trees.insert(tree.clone()) {
            return Ok(());
        }
        for (name, entry) in self.repo.tree_entries(tree)? {
            let path = join_path(prefix, &name);
            match entry {
                TreeEntry::Tree { oid } => self.tree(&oid, &path)?,
                TreeEntry::Blob { oid, .. } => {
                    if matches_extension(&name, self.relocator.extensions)
                        && self.seen_blobs.insert(oid.clone())
                    {
                        self.blob(&oid, path)?;
                    }
                }
                TreeEntry::Gitlink { .. } => {}
            }
        }
        Ok(())
    }

    fn blob(&mut self, oid: &Oid, path: String) -> Result<(), LfsError> {
        let content = self.repo.read_blob(oid)?;
        let pointer = match LfsPointer::parse(&content) {
            Ok(Some(pointer)) => pointer,
            Ok(None) => return Ok(()),
            Err(PointerError::Format(detail)) => {
                return Err(LfsError::PointerFormat { path, detail })
            }
        };

        let target = pointer.object_path(self.dest);
        if target.exists() {
            return Ok(());
        }

        match self.relocator.locate(pointer.digest()) {
            Some(origin) => {
                copy_object(&origin, &target, pointer.digest(), self.relocator.verify)?;
                self.summary.copied += 1;
                Ok(())
            }
            None => match self.relocator.on_missing {
                Policy::Fail => Err(LfsError::MissingObject {
                    digest: pointer.digest().to_string(),
                    searched: self.relocator.sources.clone(),
                }),
                Policy::Warn => {
                    self.summary.missing.push(MissingObject {
                        path,
                        digest: pointer.digest().to_string(),
                    });
                    Ok(())
                }
            },
        }
    }
}

/// Copy `origin` to `target` through a temporary name, optionally
/// verifying the content digest before it becomes visible.
fn copy_object(origin: &Path, target: &Path, digest: &str, verify: bool) -> Result<(), LfsError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let partial = target.with_extension("partial");
    fs::copy(origin, &partial).map_err(io_error(&partial))?;

    if verify {
        let actual = sha256_file(&partial)?;
        if actual != digest {
            let _ = fs::remove_file(&partial);
            return Err(LfsError::DigestMismatch {
                digest: digest.to_string(),
                actual,
                origin: origin.to_path_buf(),
            });
        }
    }

    fs::rename(&partial, target).map_err(io_error(target))
}

/// Lowercase hex SHA-256 of a file.
pub fn sha256_file(path: &Path) -> Result<String, LfsError> {
    let mut file = File::open(path).map_err(io_error(path))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(io_error(path))?;
    Ok(hex::encode(hasher.finalize()))
}
