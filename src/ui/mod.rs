//! ui
//!
//! Terminal output.
//!
//! Everything user-visible goes through [`output`], so verbosity and the
//! `--json` switch are honored in one place.

pub mod output;
