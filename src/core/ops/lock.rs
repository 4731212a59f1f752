//! core::ops::lock
//!
//! Exclusive lock on an output root.
//!
//! The lock file is `<output>/.monosplit.lock`. Acquisition never waits:
//! a second run against the same output root fails immediately with
//! [`LockError::AlreadyLocked`]. The OS lock goes away with the guard.
//!
//! ```no_run
//! use monosplit::core::ops::lock::OutputLock;
//! use monosplit::core::paths::OutputLayout;
//!
//! let layout = OutputLayout::new("output");
//! let _guard = OutputLock::acquire(&layout).unwrap();
//! // ... split into `output/` ...
//! ```

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::OutputLayout;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("output directory '{0}' is locked by another run")]
    AlreadyLocked(PathBuf),

    #[error("cannot create lock file '{path}': {source}")]
    Create { path: PathBuf, source: io::Error },

    #[error("cannot lock '{path}': {source}")]
    Acquire { path: PathBuf, source: io::Error },
}

/// Guard for an output root; unlocks on drop.
#[derive(Debug)]
pub struct OutputLock {
    path: PathBuf,
    file: File,
}

impl OutputLock {
    /// Lock `layout`'s root, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// [`LockError::AlreadyLocked`] when another run holds the root.
    pub fn acquire(layout: &OutputLayout) -> Result<Self, LockError> {
        let path = layout.lock_path();
        let create = |source| LockError::Create {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(layout.root()).map_err(create)?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(create)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { path, file }),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                Err(LockError::AlreadyLocked(layout.root().to_path_buf()))
            }
            Err(source) => Err(LockError::Acquire { path, source }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for OutputLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
