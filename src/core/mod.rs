//! core
//!
//! Core domain types, schemas, and operations for monosplit.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Oid, ScopePath, RepoName, etc.
//! - [`correlation`] - Source → derived commit correlation table
//! - [`lfs`] - Large-file pointer parsing and cache layout
//! - [`ops`] - Output locking
//! - [`config`] - Configuration schema and loading
//! - [`paths`] - Centralized path routing for the output root
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Nothing here touches a repository; that is the `git` module's job

pub mod config;
pub mod correlation;
pub mod lfs;
pub mod ops;
pub mod paths;
pub mod types;
