//! core::lfs
//!
//! Large-file pointer parsing and object cache layout.
//!
//! A pointer is a small text blob standing in for a binary object stored
//! out of band:
//!
//! ```text
//! version https://git-lfs.github.com/spec/v1
//! oid sha256:<64 hex>
//! size <bytes>
//! ```
//!
//! Objects live in a cache sharded by the first two and next two hex
//! characters of the digest: `<root>/ab/cd/abcd…`.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Prefix of the digest line.
pub const OID_PREFIX: &str = "oid sha256:";

/// Errors from pointer parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PointerError {
    /// Content is not a pointer.
    #[error("{0}")]
    Format(String),
}

/// A parsed pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LfsPointer {
    digest: String,
    size: Option<u64>,
}

impl LfsPointer {
    /// Parse pointer content.
    ///
    /// Returns `Ok(None)` when the content is entirely whitespace (an empty
    /// placeholder, not a pointer).
    ///
    /// # Errors
    ///
    /// Returns [`PointerError::Format`] when the second line does not start
    /// with `oid sha256:` or the digest is not 64 hex characters.
    ///
    /// # Example
    ///
    /// ```
    /// use monosplit::core::lfs::LfsPointer;
    ///
    /// let digest = "de".repeat(32);
    /// let text = format!("version https://git-lfs.github.com/spec/v1\noid sha256:{digest}\nsize 10\n");
    /// let pointer = LfsPointer::parse(text.as_bytes()).unwrap().unwrap();
    /// assert_eq!(pointer.digest(), digest);
    /// assert_eq!(pointer.size(), Some(10));
    ///
    /// assert_eq!(LfsPointer::parse(b"  \n\n").unwrap(), None);
    /// assert!(LfsPointer::parse(b"\x89PNG binary").is_err());
    /// ```
    pub fn parse(content: &[u8]) -> Result<Option<Self>, PointerError> {
        let text = String::from_utf8_lossy(content);
        let lines: Vec<&str> = text.split('\n').collect();
        if lines.iter().all(|line| line.trim().is_empty()) {
            return Ok(None);
        }

        let oid_line = lines
            .get(1)
            .map(|line| line.trim())
            .ok_or_else(|| PointerError::Format("missing oid line".to_string()))?;
        let digest = oid_line.strip_prefix(OID_PREFIX).ok_or_else(|| {
            PointerError::Format(format!("OID format: {}", truncate(oid_line, 80)))
        })?;
        if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PointerError::Format(format!(
                "digest must be 64 hex characters: {}",
                truncate(digest, 80)
            )));
        }

        let size = lines
            .iter()
            .skip(2)
            .find_map(|line| line.trim().strip_prefix("size "))
            .and_then(|s| s.trim().parse().ok());

        Ok(Some(Self {
            digest: digest.to_ascii_lowercase(),
            size,
        }))
    }

    /// The SHA-256 digest as lowercase hex.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Declared object size, when present.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Location of this object inside a cache rooted at `root`.
    pub fn object_path(&self, root: &Path) -> PathBuf {
        object_path(root, &self.digest)
    }
}

/// Location of the object with `digest` inside a cache rooted at `root`.
///
/// A digest too short to shard (or not splittable at the shard
/// boundaries) is placed directly under `root`.
///
/// ```
/// use monosplit::core::lfs::object_path;
/// use std::path::{Path, PathBuf};
///
/// let digest = "deadbeef".repeat(8);
/// assert_eq!(
///     object_path(Path::new("/cache"), &digest),
///     PathBuf::from(format!("/cache/de/ad/{digest}"))
/// );
/// ```
pub fn object_path(root: &Path, digest: &str) -> PathBuf {
    match (digest.get(0..2), digest.get(2..4)) {
        (Some(first), Some(second)) => root.join(first).join(second).join(digest),
        _ => root.join(digest),
    }
}

/// Check whether a file name carries one of `extensions` (compared
/// case-sensitively, without the dot).
pub fn matches_extension(name: &str, extensions: &[String]) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => extensions.iter().any(|e| e == ext),
        None => false,
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
