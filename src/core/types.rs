//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`Oid`] - Git object identifier (SHA)
//! - [`ScopePath`] - Validated slash-delimited repository-relative path
//! - [`RepoName`] - Name of a derived repository (project or shared component)
//! - [`FileMode`] - Mode of a file-like tree entry
//! - [`Timestamp`] - Commit timestamp with its original UTC offset
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use monosplit::core::types::{Oid, RepoName, ScopePath};
//!
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let scope = ScopePath::new("A/libCommon").unwrap();
//! let name = RepoName::new("Common").unwrap();
//!
//! assert_eq!(scope.relative_to("A"), Some("libCommon"));
//! assert!(Oid::new("not-a-sha").is_err());
//! assert!(ScopePath::new("A//b").is_err());
//! assert!(RepoName::new("a/b").is_err());
//! # let _ = (oid, name);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid repository name: {0}")]
    InvalidRepoName(String),
}

/// A validated Git object identifier.
///
/// Stored as lowercase hex. Both SHA-1 (40 chars) and SHA-256 (64 chars)
/// object formats are accepted.
///
/// # Example
///
/// ```
/// use monosplit::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        Self::validate(&oid)?;
        Ok(Self(oid))
    }

    /// Get an abbreviated form of the OID.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    fn validate(oid: &str) -> Result<(), TypeError> {
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(())
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated, normalized, slash-delimited repository-relative path.
///
/// Used both as the scope a derived repository is sourced from and as
/// the mount point of a shared component inside a project.
///
/// Rules:
/// - Cannot be empty
/// - No leading or trailing `/`, no empty components
/// - No `.` or `..` components
/// - No backslashes or NUL bytes
///
/// # Example
///
/// ```
/// use monosplit::core::types::ScopePath;
///
/// let mount = ScopePath::new("A/libCommon").unwrap();
/// assert_eq!(mount.relative_to("A"), Some("libCommon"));
/// assert_eq!(mount.relative_to("B"), None);
/// assert_eq!(mount.relative_to("A/lib"), None);
/// assert_eq!(mount.first_segment(), "A");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScopePath(String);

impl ScopePath {
    /// Create a new validated path.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidPath` if the path is not normalized.
    pub fn new(path: impl Into<String>) -> Result<Self, TypeError> {
        let path = path.into();
        if path.is_empty() {
            return Err(TypeError::InvalidPath("path cannot be empty".into()));
        }
        if path.contains('\\') || path.contains('\0') {
            return Err(TypeError::InvalidPath(format!(
                "'{}' contains a backslash or NUL byte",
                path
            )));
        }
        for component in path.split('/') {
            match component {
                "" => {
                    return Err(TypeError::InvalidPath(format!(
                        "'{}' has an empty component",
                        path
                    )))
                }
                "." | ".." => {
                    return Err(TypeError::InvalidPath(format!(
                        "'{}' contains a relative component",
                        path
                    )))
                }
                _ => {}
            }
        }
        Ok(Self(path))
    }

    /// Get the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first path component.
    pub fn first_segment(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }

    /// The remainder of this path below `prefix`, if this path lies strictly
    /// underneath it.
    pub fn relative_to(&self, prefix: &str) -> Option<&str> {
        self.0
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty())
    }

    /// Check if `path` is this path or lies underneath it.
    pub fn contains(&self, path: &str) -> bool {
        path == self.0 || is_under(path, &self.0)
    }
}

impl TryFrom<String> for ScopePath {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ScopePath> for String {
    fn from(path: ScopePath) -> Self {
        path.0
    }
}

impl AsRef<str> for ScopePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ScopePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Join a tree-relative prefix and an entry name. An empty prefix is the root.
///
/// # Example
///
/// ```
/// use monosplit::core::types::join_path;
///
/// assert_eq!(join_path("", "a.txt"), "a.txt");
/// assert_eq!(join_path("lib/x", "a.txt"), "lib/x/a.txt");
/// ```
pub fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Check if `path` lies strictly underneath the directory `dir`.
pub fn is_under(path: &str, dir: &str) -> bool {
    path.strip_prefix(dir)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Name of a derived repository.
///
/// Doubles as the output directory name and the `{name}` value substituted
/// into URL templates, so it must be a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoName(String);

impl RepoName {
    /// Create a new validated repository name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepoName` for empty names, names with path
    /// separators or whitespace, and names starting with `.`.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeError::InvalidRepoName("name cannot be empty".into()));
        }
        if name.starts_with('.') {
            return Err(TypeError::InvalidRepoName(format!(
                "'{}' cannot start with '.'",
                name
            )));
        }
        if name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace() || c.is_ascii_control())
        {
            return Err(TypeError::InvalidRepoName(format!(
                "'{}' must be a single path component without whitespace",
                name
            )));
        }
        Ok(Self(name))
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitute this name into a `{name}` template.
    ///
    /// ```
    /// use monosplit::core::types::RepoName;
    ///
    /// let name = RepoName::new("A").unwrap();
    /// assert_eq!(name.render("git@host:org/{name}.git"), "git@host:org/A.git");
    /// ```
    pub fn render(&self, template: &str) -> String {
        template.replace("{name}", &self.0)
    }
}

impl TryFrom<String> for RepoName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RepoName> for String {
    fn from(name: RepoName) -> Self {
        name.0
    }
}

impl std::fmt::Display for RepoName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mode of a file-like tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// Regular file (100644)
    Regular,
    /// Executable file (100755)
    Executable,
    /// Symbolic link (120000)
    Symlink,
}

impl FileMode {
    /// The raw git mode bits.
    pub fn bits(self) -> u32 {
        match self {
            FileMode::Regular => 0o100644,
            FileMode::Executable => 0o100755,
            FileMode::Symlink => 0o120000,
        }
    }

    /// Parse raw git mode bits. Returns `None` for trees and gitlinks.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0o100644 | 0o100664 => Some(FileMode::Regular),
            0o100755 => Some(FileMode::Executable),
            0o120000 => Some(FileMode::Symlink),
            _ => None,
        }
    }
}

/// Gitlink mode bits (submodule commit reference).
pub const GITLINK_MODE: u32 = 0o160000;

/// A commit timestamp: seconds since the epoch plus the UTC offset the
/// commit was recorded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    /// Seconds since the Unix epoch
    pub seconds: i64,
    /// Offset from UTC in minutes
    pub offset_minutes: i32,
}

impl Timestamp {
    /// Render in RFC 3339 using the original offset.
    pub fn to_rfc3339(self) -> String {
        let utc = chrono::DateTime::from_timestamp(self.seconds, 0)
            .unwrap_or(chrono::DateTime::UNIX_EPOCH);
        match chrono::FixedOffset::east_opt(self.offset_minutes * 60) {
            Some(offset) => utc.with_timezone(&offset).to_rfc3339(),
            None => utc.to_rfc3339(),
        }
    }
}
