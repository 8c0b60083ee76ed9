//!
//! Utility module for the explorer.
//!
//! Re-exports formatting helpers used when building display records.
/// Block time formatting
pub mod time;

pub use time::{format_age, format_utc_time};
