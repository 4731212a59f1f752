//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! A single TOML file describes a run: the source repository, the output
//! root, shared components, merge sources and policies. It is loaded once
//! into a [`SplitConfig`] and passed by reference to every component.
//!
//! # Config Locations
//!
//! Searched in order:
//! 1. An explicit path (the `--config` flag)
//! 2. `$MONOSPLIT_CONFIG` if set
//! 3. `./monosplit.toml`
//! 4. `<config dir>/monosplit/config.toml` (e.g. `~/.config` on Linux)
//!
//! Relative paths inside the file (`main_repo`, `output`, merge `repo`)
//! are resolved against the directory containing the file.
//!
//! # Example
//!
//! ```no_run
//! use monosplit::core::config::Config;
//!
//! let loaded = Config::load(None).unwrap();
//! println!("splitting {}", loaded.config.main_repo.display());
//! println!("from {}", loaded.path.display());
//! ```

pub mod schema;

pub use schema::{
    DiscoveryConfig, EmailConfig, MaintenanceMode, MergeConfig, PathMapping, Policy,
    PolicyConfig, SharedConfig, SplitConfig, DEFAULT_LFS_EXTENSIONS,
};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "MONOSPLIT_CONFIG";

/// Config file name looked up in the current directory.
pub const LOCAL_CONFIG: &str = "monosplit.toml";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("no config file found (searched: {})", format_searched(.searched))]
    NotFound { searched: Vec<PathBuf> },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

fn format_searched(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A loaded, validated configuration and the file it came from.
#[derive(Debug, Clone)]
pub struct Config {
    /// The configuration with relative paths resolved
    pub config: SplitConfig,
    /// Path of the file that was read
    pub path: PathBuf,
}

impl Config {
    /// Locate, read, resolve and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` when no candidate file exists, and
    /// read, parse or validation errors for the file that was found.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = Self::locate(explicit)?;
        Self::load_from(&path)
    }

    /// Read and validate a specific config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut config: SplitConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        resolve_paths(&mut config, base);
        config.validate()?;

        Ok(Self {
            config,
            path: path.to_path_buf(),
        })
    }

    /// Find the config file to use.
    fn locate(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let mut searched = Vec::new();

        // 1. Explicit path must exist
        if let Some(path) = explicit {
            if path.is_file() {
                return Ok(path.to_path_buf());
            }
            return Err(ConfigError::NotFound {
                searched: vec![path.to_path_buf()],
            });
        }

        // 2. $MONOSPLIT_CONFIG
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.is_file() {
                return Ok(path);
            }
            searched.push(path);
        }

        // 3. ./monosplit.toml
        let local = PathBuf::from(LOCAL_CONFIG);
        if local.is_file() {
            return Ok(local);
        }
        searched.push(local);

        // 4. <config dir>/monosplit/config.toml
        if let Some(dir) = dirs::config_dir() {
            let path = dir.join("monosplit").join("config.toml");
            if path.is_file() {
                return Ok(path);
            }
            searched.push(path);
        }

        Err(ConfigError::NotFound { searched })
    }
}

/// Resolve relative paths against `base`.
fn resolve_paths(config: &mut SplitConfig, base: &Path) {
    let resolve = |p: &mut PathBuf| {
        if p.is_relative() {
            *p = base.join(&*p);
        }
    };
    resolve(&mut config.main_repo);
    resolve(&mut config.output);
    for merge in &mut config.merge {
        resolve(&mut merge.repo);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("monosplit.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn relative_paths_resolve_against_file() {
        let temp = TempDir::new().unwrap();
        let path = write(
            temp.path(),
            r#"
            main_repo = "mono"
            origin_url = "git@host:{name}.git"
            [[merge]]
            project = "A"
            repo = "../legacy"
            mappings = [{ from = "x", to = "y" }]
            "#,
        );
        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.config.main_repo, temp.path().join("mono"));
        assert_eq!(loaded.config.output, temp.path().join("output"));
        assert_eq!(loaded.config.merge[0].repo, temp.path().join("../legacy"));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let temp = TempDir::new().unwrap();
        let path = write(
            temp.path(),
            r#"
            main_repo = "/srv/mono"
            output = "/srv/out"
            origin_url = "{name}"
            "#,
        );
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.config.main_repo, PathBuf::from("/srv/mono"));
        assert_eq!(loaded.config.output, PathBuf::from("/srv/out"));
    }

    #[test]
    fn explicit_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        let err = Config::load(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn parse_error_names_the_file() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "main_repo = ");
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("monosplit.toml"));
    }

    #[test]
    fn validation_runs_on_load() {
        let temp = TempDir::new().unwrap();
        let path = write(
            temp.path(),
            r#"
            main_repo = "mono"
            origin_url = "no-placeholder"
            "#,
        );
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}
