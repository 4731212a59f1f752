//! core::correlation
//!
//! Source-commit → derived-commit correlation table.
//!
//! # Invariants
//!
//! - Append-only and insertion-ordered: entries appear in the order the
//!   derived commits were emitted.
//! - A source commit maps to at most one derived commit.
//! - Once a split completes the table is frozen behind an `Arc` and only
//!   read (by tag propagation and by the project splits that mount the
//!   repository as a shared component).

use std::collections::HashMap;

use thiserror::Error;

use super::types::Oid;

/// Errors from recording correlations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorrelationError {
    /// The source commit already produced a derived commit.
    #[error("source commit {source_oid} is already mapped to {existing}")]
    AlreadyMapped {
        /// The duplicated source commit
        source_oid: Oid,
        /// The derived commit it already maps to
        existing: Oid,
    },
}

/// Mapping from source commit ids to the commit each produced in one
/// derived repository.
///
/// # Example
///
/// ```
/// use monosplit::core::correlation::CorrelationTable;
/// use monosplit::core::types::Oid;
///
/// let src = Oid::new("a".repeat(40)).unwrap();
/// let dst = Oid::new("b".repeat(40)).unwrap();
///
/// let mut table = CorrelationTable::new();
/// table.record(src.clone(), dst.clone()).unwrap();
///
/// assert_eq!(table.get(&src), Some(&dst));
/// assert!(table.record(src, dst).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CorrelationTable {
    entries: Vec<(Oid, Oid)>,
    index: HashMap<Oid, usize>,
}

impl CorrelationTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a correlation.
    ///
    /// # Errors
    ///
    /// Returns [`CorrelationError::AlreadyMapped`] if `source` already has an
    /// entry; the table is left unchanged.
    pub fn record(&mut self, source: Oid, derived: Oid) -> Result<(), CorrelationError> {
        if let Some(&pos) = self.index.get(&source) {
            return Err(CorrelationError::AlreadyMapped {
                source_oid: source,
                existing: self.entries[pos].1.clone(),
            });
        }
        self.index.insert(source.clone(), self.entries.len());
        self.entries.push((source, derived));
        Ok(())
    }

    /// The derived commit produced for `source`, if any.
    pub fn get(&self, source: &Oid) -> Option<&Oid> {
        self.index.get(source).map(|&pos| &self.entries[pos].1)
    }

    /// Check whether `source` has an entry.
    pub fn contains(&self, source: &Oid) -> bool {
        self.index.contains_key(source)
    }

    /// Number of correlations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(source, derived)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Oid, &Oid)> {
        self.entries.iter().map(|(s, d)| (s, d))
    }

    /// The most recently recorded derived commit.
    pub fn last_derived(&self) -> Option<&Oid> {
        self.entries.last().map(|(_, d)| d)
    }
}
