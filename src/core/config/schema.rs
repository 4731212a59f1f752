//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! main_repo = "/srv/monorepo"
//! output = "output"
//! origin_url = "git@github.com:acme/{name}.git"
//!
//! [email]
//! domain = "acme.com"
//!
//! [[shared]]
//! name = "Common"
//! source = "Common"
//! mounts = ["A/libCommon", "B/libCommon"]
//!
//! [[merge]]
//! project = "A"
//! repo = "/srv/legacy-a"
//! mappings = [{ from = "src", to = "legacy" }]
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing (paths normalized, names usable as
//! directory names, templates containing `{name}`).

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::{RepoName, ScopePath};

/// Default extensions treated as large-file pointers.
pub const DEFAULT_LFS_EXTENSIONS: &[&str] = &[
    "exe", "ico", "zip", "snk", "dylib", "dll", "png", "jpg", "gif", "so",
];

/// Top-level run configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SplitConfig {
    /// Path to the source monorepo (must have a working directory)
    pub main_repo: PathBuf,

    /// Output root; each derived repository lands in `<output>/<name>`
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Branch the derived repositories commit to
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Origin URL template, `{name}` is replaced with the repository name
    pub origin_url: String,

    /// Submodule URL template written into `.gitmodules`
    #[serde(default = "default_submodule_url")]
    pub submodule_url: String,

    /// File extensions whose blobs are large-file pointers
    #[serde(default = "default_lfs_extensions")]
    pub lfs_extensions: Vec<String>,

    /// Hash copied large-file objects and compare against the pointer digest
    #[serde(default = "default_true")]
    pub verify_lfs_digests: bool,

    /// Repository maintenance to run on each finished repository
    #[serde(default)]
    pub maintenance: MaintenanceMode,

    /// Maximum number of concurrent splits
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Email remapping
    #[serde(default)]
    pub email: EmailConfig,

    /// Failure policies
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Project discovery rules
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Shared components, split first and mounted as submodules
    #[serde(default)]
    pub shared: Vec<SharedConfig>,

    /// Foreign histories deep-merged into projects
    #[serde(default)]
    pub merge: Vec<MergeConfig>,
}

fn default_output() -> PathBuf {
    PathBuf::from("output")
}

fn default_branch() -> String {
    "master".to_string()
}

fn default_submodule_url() -> String {
    "../{name}.git".to_string()
}

fn default_lfs_extensions() -> Vec<String> {
    DEFAULT_LFS_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

fn default_true() -> bool {
    true
}

impl SplitConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.origin_url.contains("{name}") {
            return Err(ConfigError::InvalidValue(format!(
                "origin_url '{}' must contain a {{name}} placeholder",
                self.origin_url
            )));
        }
        if self.default_branch.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "default_branch cannot be empty".to_string(),
            ));
        }
        if self.jobs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "jobs must be at least 1".to_string(),
            ));
        }
        for ext in &self.lfs_extensions {
            if ext.is_empty() || ext.contains('.') || ext.contains('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid lfs extension '{}' (expected e.g. \"png\")",
                    ext
                )));
            }
        }

        let mut shared_names = HashSet::new();
        for shared in &self.shared {
            shared.validate()?;
            if !shared_names.insert(shared.name.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "shared component '{}' is declared twice",
                    shared.name
                )));
            }
        }

        for merge in &self.merge {
            merge.validate()?;
            if shared_names.contains(merge.project.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "merge target '{}' is a shared component",
                    merge.project
                )));
            }
        }

        self.discovery.validate()?;
        Ok(())
    }

    /// Maximum concurrent splits, defaulting to the available parallelism.
    pub fn jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// The email → email remap function.
    pub fn map_email(&self, email: &str) -> String {
        self.email.map(email)
    }
}

/// Email remapping: exact overrides first, then an optional domain rewrite.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EmailConfig {
    /// Replace the domain of every address not in `map`
    pub domain: Option<String>,

    /// Exact address overrides
    pub map: BTreeMap<String, String>,
}

impl EmailConfig {
    /// Apply the remap.
    ///
    /// ```
    /// use monosplit::core::config::EmailConfig;
    ///
    /// let mut email = EmailConfig::default();
    /// assert_eq!(email.map("dev@old.local"), "dev@old.local");
    ///
    /// email.domain = Some("acme.com".into());
    /// email.map.insert("boss@old.local".into(), "ceo@acme.com".into());
    /// assert_eq!(email.map("dev@old.local"), "dev@acme.com");
    /// assert_eq!(email.map("boss@old.local"), "ceo@acme.com");
    /// assert_eq!(email.map("builder"), "builder@acme.com");
    /// ```
    pub fn map(&self, email: &str) -> String {
        if let Some(mapped) = self.map.get(email) {
            return mapped.clone();
        }
        match &self.domain {
            Some(domain) => {
                let local = email.split_once('@').map_or(email, |(local, _)| local);
                format!("{}@{}", local, domain)
            }
            None => email.to_string(),
        }
    }
}

/// Whether a recoverable condition only warns or fails the repository.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Report and continue
    #[default]
    Warn,
    /// Abort the affected repository's finalize step
    Fail,
}

/// Failure policies for tags and large-file objects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// A tag with no mapped ancestor
    pub unresolved_tag: Policy,

    /// A pointer whose object is in no candidate cache
    pub missing_lfs_object: Policy,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            unresolved_tag: Policy::Warn,
            missing_lfs_object: Policy::Fail,
        }
    }
}

/// Repository maintenance performed at the end of each split.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MaintenanceMode {
    /// Skip maintenance
    None,
    /// `git gc`
    Gc,
    /// `git gc --aggressive`
    #[default]
    GcAggressive,
}

/// Project discovery rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Explicit project list; when non-empty discovery is skipped
    pub projects: Vec<String>,

    /// Top-level names that are never projects
    pub exclude: Vec<String>,

    /// Skip top-level names containing `-`
    pub skip_hyphenated: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            projects: Vec::new(),
            exclude: Vec::new(),
            skip_hyphenated: true,
        }
    }
}

impl DiscoveryConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for project in &self.projects {
            RepoName::new(project.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid project '{}': {}", project, e))
            })?;
        }
        Ok(())
    }

    /// Check whether a discovered top-level name qualifies as a project.
    pub fn accepts(&self, name: &str) -> bool {
        !(self.skip_hyphenated && name.contains('-'))
            && !self.exclude.iter().any(|e| e == name)
            && RepoName::new(name).is_ok()
    }
}

/// A shared component definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SharedConfig {
    /// Component name (output directory and URL `{name}`)
    pub name: RepoName,

    /// Path the component is split from; defaults to the first mount
    #[serde(default)]
    pub source: Option<ScopePath>,

    /// Mount paths, one per consuming project, e.g. `A/libCommon`
    pub mounts: Vec<ScopePath>,
}

impl SharedConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.mounts.is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "shared component '{}' has no mounts",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for mount in &self.mounts {
            if !mount.as_str().contains('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "mount '{}' of '{}' must lie inside a project directory",
                    mount, self.name
                )));
            }
            if !seen.insert(mount.first_segment()) {
                return Err(ConfigError::InvalidValue(format!(
                    "shared component '{}' is mounted twice in project '{}'",
                    self.name,
                    mount.first_segment()
                )));
            }
        }
        Ok(())
    }

    /// The path the component is split from.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidValue` when neither `source` nor a mount is set.
    pub fn source_path(&self) -> Result<&ScopePath, ConfigError> {
        self.source
            .as_ref()
            .or_else(|| self.mounts.first())
            .ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "shared component '{}' has no source and no mounts",
                    self.name
                ))
            })
    }
}

/// A foreign history to deep-merge into a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    /// Target project name
    pub project: RepoName,

    /// Path to the foreign repository
    pub repo: PathBuf,

    /// Ordered foreign-path → local-path mappings
    pub mappings: Vec<PathMapping>,
}

impl MergeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.mappings.is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "merge source '{}' for '{}' has no mappings",
                self.repo.display(),
                self.project
            )));
        }
        Ok(())
    }
}

/// One foreign-path → local-path mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PathMapping {
    /// Path in the foreign repository
    pub from: ScopePath,
    /// Path in the target project
    pub to: ScopePath,
}
