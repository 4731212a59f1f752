//! engine::maintenance
//!
//! Finalize capability invoked at the end of each split.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::core::config::MaintenanceMode;

/// Errors from repository maintenance.
#[derive(Debug, Error)]
pub enum MaintenanceError {
    #[error("failed to run git in '{path}': {source}")]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("git gc failed in '{path}': {stderr}")]
    Failed { path: PathBuf, stderr: String },
}

/// Work performed on a finished derived repository.
pub trait Maintenance: Send + Sync {
    /// Run against the repository whose working directory is `workdir`.
    fn finalize(&self, workdir: &Path) -> Result<(), MaintenanceError>;
}

/// Leaves the repository as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMaintenance;

impl Maintenance for NoMaintenance {
    fn finalize(&self, _workdir: &Path) -> Result<(), MaintenanceError> {
        Ok(())
    }
}

/// Packs objects with `git gc`.
#[derive(Debug, Clone, Copy)]
pub struct GitGc {
    pub aggressive: bool,
}

impl Maintenance for GitGc {
    fn finalize(&self, workdir: &Path) -> Result<(), MaintenanceError> {
        let mut cmd = Command::new("git");
        cmd.arg("gc").arg("--quiet").current_dir(workdir);
        if self.aggressive {
            cmd.arg("--aggressive");
        }
        let output = cmd.output().map_err(|e| MaintenanceError::Spawn {
            path: workdir.to_path_buf(),
            source: e,
        })?;
        if !output.status.success() {
            return Err(MaintenanceError::Failed {
                path: workdir.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// The implementation selected by configuration.
pub fn for_mode(mode: MaintenanceMode) -> Box<dyn Maintenance> {
    match mode {
        MaintenanceMode::None => Box::new(NoMaintenance),
        MaintenanceMode::Gc => Box::new(GitGc { aggressive: false }),
        MaintenanceMode::GcAggressive => Box::new(GitGc { aggressive: true }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn no_maintenance_touches_nothing() {
        let dir = TempDir::new().unwrap();
        NoMaintenance.finalize(dir.path()).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_directory_is_a_spawn_error() {
        let dir = TempDir::new().unwrap();
        let err = GitGc { aggressive: false }
            .finalize(&dir.path().join("absent"))
            .unwrap_err();
        assert!(matches!(err, MaintenanceError::Spawn { .. }));
    }

    #[test]
    fn gc_packs_a_repository() {
        let dir = TempDir::new().unwrap();
        crate::git::Git::init(dir.path(), "master").unwrap();
        for_mode(MaintenanceMode::Gc).finalize(dir.path()).unwrap();
    }
}
