//! Ingestion and normalization pipeline
//!
//! This module turns raw chain objects into explorer records and keeps track of the heights that
//! could not be ingested:
//!
//! - `fetcher`: pulls raw blocks and transactions from the node and re-encodes binary fields.
//! - `flattener`: explodes a transaction into one record per action and decodes transfers.
//! - `aggregator`: builds display-ready block summaries and block-level gas statistics.
//! - `account`: derives account identifiers from publisher public keys.
//! - `ingest`: fetch → flatten → persist for one block or one transaction.
//! - `retry_tracker`: failure markers with bounded, backed-off retries.
//! - `store`: the persistence collaborator shared by all sync jobs.

pub mod account;
pub mod aggregator;
pub mod fetcher;
pub mod flattener;
pub mod ingest;
pub mod retry_tracker;
pub mod store;
pub mod types;

pub use types::*;
