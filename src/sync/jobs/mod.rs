//! The concrete sync jobs.
//!
//! Each job owns one concern and talks to the others only through the store: the new-block job
//! writes failure markers and pending transactions, the failed-block and transaction jobs consume
//! them, and the gas and account jobs derive their views from stored transactions.

mod accounts;
mod blocks;
mod gas;
mod snapshot;
mod transactions;

pub use accounts::AccountSync;
pub use blocks::{FailedBlockSync, NewBlockSync};
pub use gas::GasAggregateSync;
pub use snapshot::SnapshotTask;
pub use transactions::TransactionSync;
