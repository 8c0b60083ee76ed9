//! Persistence collaborator for the ingestion pipeline.
//!
//! `ExplorerStore` is the only resource shared between sync jobs; all cross-job coordination
//! (failure markers, the pending-transaction queue, gas recomputation marks and job cursors) goes
//! through it. Upserts are keyed by block height and transaction hash so reprocessing never
//! duplicates records.

/// In-memory store implementation
mod memory;
/// File-backed snapshots of the in-memory store
mod snapshot;

pub use memory::{MemoryStore, StoredTransaction};
pub use snapshot::SnapshotRepository;

use crate::explorer::types::*;
use std::collections::HashMap;

/// Cursor of the new-block job: next height to ingest.
pub const BLOCK_CURSOR: &str = "blocks";
/// Cursor of the account job: last transaction sequence scanned.
pub const ACCOUNT_CURSOR: &str = "accounts";

#[async_trait::async_trait]
pub trait ExplorerStore: Send + Sync {
	/// Store a block together with the transaction hashes it lists, in block order.
	async fn upsert_block(&self, block: RawBlock, tx_hashes: &[String]) -> Result<(), ExplorerError>;

	/// Blocks ordered newest first.
	async fn get_block_page(&self, offset: usize, limit: usize)
	-> Result<Vec<RawBlock>, ExplorerError>;

	async fn count_blocks(&self) -> Result<usize, ExplorerError>;

	/// Replace every record stored for `hash` and mark the block's gas stats for recomputation.
	async fn upsert_flat_transactions(
		&self,
		height: i64,
		hash: &str,
		records: Vec<FlatTransactionRecord>,
	) -> Result<(), ExplorerError>;

	/// Distinct hashes of the block's transactions that produced records, in block order.
	async fn get_tx_hashes_for_block(&self, height: i64) -> Result<Vec<String>, ExplorerError>;

	async fn get_flat_transactions_for_block(
		&self,
		height: i64,
	) -> Result<Vec<FlatTransactionRecord>, ExplorerError>;

	async fn count_flat_transactions(&self) -> Result<usize, ExplorerError>;

	/// Transactions stored after sequence number `seq`, oldest first.
	async fn list_transactions_after(
		&self,
		seq: u64,
		limit: usize,
	) -> Result<Vec<StoredTransaction>, ExplorerError>;

	/// Heights whose gas stats are stale, paired with the generation of the mark.
	async fn list_gas_dirty_heights(&self, limit: usize) -> Result<Vec<(i64, u64)>, ExplorerError>;

	/// Store gas stats; the dirty mark is cleared only if it still has `generation`.
	async fn upsert_gas_stats(
		&self,
		height: i64,
		stats: GasStats,
		generation: u64,
	) -> Result<(), ExplorerError>;

	async fn get_gas_stats_by_heights(
		&self,
		heights: &[i64],
	) -> Result<HashMap<i64, GasStats>, ExplorerError>;

	async fn record_sync_failure(&self, failure: SyncFailure) -> Result<(), ExplorerError>;

	async fn clear_sync_failure(&self, height: i64) -> Result<(), ExplorerError>;

	async fn get_sync_failure(&self, height: i64) -> Result<Option<SyncFailure>, ExplorerError>;

	async fn list_pending_failures(&self) -> Result<Vec<SyncFailure>, ExplorerError>;

	/// Queue a transaction hash for a later fetch; an existing entry is kept.
	async fn enqueue_pending_transaction(
		&self,
		pending: PendingTransaction,
	) -> Result<(), ExplorerError>;

	async fn update_pending_transaction(
		&self,
		pending: PendingTransaction,
	) -> Result<(), ExplorerError>;

	async fn list_pending_transactions(
		&self,
		limit: usize,
	) -> Result<Vec<PendingTransaction>, ExplorerError>;

	async fn remove_pending_transaction(&self, hash: &str) -> Result<(), ExplorerError>;

	async fn get_cursor(&self, name: &str) -> Result<Option<i64>, ExplorerError>;

	async fn set_cursor(&self, name: &str, value: i64) -> Result<(), ExplorerError>;

	async fn get_account(&self, account_id: &str)
	-> Result<Option<AccountActivity>, ExplorerError>;

	async fn upsert_account(&self, account: AccountActivity) -> Result<(), ExplorerError>;
}
