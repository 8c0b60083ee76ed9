//! Background synchronization
//!
//! - `scheduler`: the `SyncTask` abstraction and the `JobGroup` that runs tasks until stopped.
//! - `jobs`: new blocks, failed blocks, pending transactions, gas aggregates, accounts and snapshots.
//! - `progress_tracker`: per-cycle bookkeeping reported back to the scheduler.

pub mod jobs;
pub mod progress_tracker;
pub mod scheduler;

pub use scheduler::{FailureBackoff, JobGroup, SyncTask};
