//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. Source repositories are read
//! and derived repositories are written through it. No other module should
//! import `git2`.
//!
//! # Responsibilities
//!
//! - Opening source repositories and initializing derived ones
//! - Topological commit logs and commit metadata
//! - Tree lookups as tagged [`TreeEntry`] values and scoped tree diffs
//! - Blob reads/writes and explicit index staging (files and gitlinks)
//! - Commit emission, tags and remotes
//!
//! # Example
//!
//! ```ignore
//! use monosplit::git::Git;
//! use std::path::Path;
//!
//! let source = Git::open(Path::new("monorepo"))?;
//! for oid in source.topo_log()? {
//!     let commit = source.commit(&oid)?;
//!     println!("{} {}", oid.short(7), commit.message.lines().next().unwrap_or(""));
//! }
//! ```

mod interface;

pub use interface::{
    FileChange, Git, GitError, Identity, SourceCommit, TagAnnotation, TagInfo, TreeEntry,
};
