//! core::paths
//!
//! Centralized path routing for the output root.
//!
//! # Storage Layout
//!
//! Everything a run writes lives under the output root:
//! - `<output>/<name>/` - one derived repository per project or component
//! - `<output>/.monosplit.lock` - exclusive run lock
//!
//! No other module joins paths onto the output root.
//!
//! # Example
//!
//! ```
//! use monosplit::core::paths::OutputLayout;
//! use monosplit::core::types::RepoName;
//! use std::path::PathBuf;
//!
//! let layout = OutputLayout::new("/out");
//! let name = RepoName::new("Common").unwrap();
//!
//! assert_eq!(layout.repo_dir(&name), PathBuf::from("/out/Common"));
//! assert_eq!(layout.lock_path(), PathBuf::from("/out/.monosplit.lock"));
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::types::RepoName;

/// File name of the run lock inside the output root.
pub const LOCK_FILE: &str = ".monosplit.lock";

/// Path routing for one output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Create a layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Working directory of the derived repository `name`.
    pub fn repo_dir(&self, name: &RepoName) -> PathBuf {
        self.root.join(name.as_str())
    }

    /// Path of the run lock.
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    /// Check whether the output root holds anything besides the lock file.
    ///
    /// A missing root counts as empty.
    pub fn has_content(&self) -> io::Result<bool> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };
        for entry in entries {
            if entry?.file_name() != LOCK_FILE {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Remove everything under the output root except the lock file.
    ///
    /// Called with the lock held, so the lock file itself must survive.
    pub fn clean(&self) -> io::Result<()> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        for entry in entries {
            let entry = entry?;
            if entry.file_name() == LOCK_FILE {
                continue;
            }
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(entry.path())?;
            } else {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path().join("absent"));
        assert!(!layout.has_content().unwrap());
        layout.clean().unwrap();
    }

    #[test]
    fn lock_file_alone_is_empty() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path());
        fs::write(layout.lock_path(), "").unwrap();
        assert!(!layout.has_content().unwrap());
    }

    #[test]
    fn clean_keeps_lock_file() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout::new(temp.path());
        fs::write(layout.lock_path(), "").unwrap();
        fs::create_dir_all(temp.path().join("A/.git")).unwrap();
        fs::write(temp.path().join("stray.txt"), "x").unwrap();

        assert!(layout.has_content().unwrap());
        layout.clean().unwrap();
        assert!(!layout.has_content().unwrap());
        assert!(layout.lock_path().exists());
    }
}
