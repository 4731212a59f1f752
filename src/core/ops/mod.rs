//! core::ops
//!
//! Run-level operations on the output root.
//!
//! # Modules
//!
//! - [`lock`] - Exclusive output lock
//!
//! # Architecture
//!
//! Every `split` run:
//! 1. Acquires the exclusive output lock
//! 2. Refuses a non-empty output root unless asked to clean it
//! 3. Holds the lock until every derived repository is finished

pub mod lock;

pub use lock::{LockError, OutputLock};
