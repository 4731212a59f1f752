//! monosplit - split a monorepo into history-preserving repositories
//!
//! Every project directory of a source monorepo becomes its own repository
//! with the full history of that directory. Shared components are split
//! first and mounted into projects as submodules pinned to the matching
//! commit; legacy repositories can be folded in as merge sources; tags and
//! large-file objects follow their commits.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Planning, per-repository splitting and concurrent execution
//! - [`core`] - Domain types, configuration, correlation table, output layout
//! - [`git`] - Single interface for all Git operations
//! - [`ui`] - Terminal output
//!
//! # Correctness Invariants
//!
//! 1. A derived commit's tree under its scope matches the source commit's
//! 2. Derived history is linear and in source log order
//! 3. Splitting the same input twice produces identical commit ids
//! 4. Gitlinks only ever point at commits that exist in the component

pub mod cli;
pub mod core;
pub mod engine;
pub mod git;
pub mod ui;
