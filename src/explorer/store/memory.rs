use super::ExplorerStore;
use crate::explorer::types::*;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// All records of one transaction, tagged with the order in which it was first stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTransaction {
	pub seq: u64,
	pub height: i64,
	pub hash: String,
	pub records: Vec<FlatTransactionRecord>,
}

/// Full contents of the store; this is also the snapshot format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreState {
	pub blocks: BTreeMap<i64, RawBlock>,
	/// Transaction hashes in the order each block lists them.
	#[serde(default)]
	pub block_tx_order: BTreeMap<i64, Vec<String>>,
	pub transactions: BTreeMap<String, StoredTransaction>,
	pub gas_stats: BTreeMap<i64, GasStats>,
	pub gas_dirty: BTreeMap<i64, u64>,
	pub failures: BTreeMap<i64, SyncFailure>,
	pub pending_transactions: BTreeMap<String, PendingTransaction>,
	pub accounts: BTreeMap<String, AccountActivity>,
	pub cursors: BTreeMap<String, i64>,
	pub next_seq: u64,
}

impl StoreState {
	fn bump_seq(&mut self) -> u64 {
		self.next_seq += 1;
		self.next_seq
	}

	/// Transactions of a block in block order; hashes the block does not list go last, by seq.
	fn transactions_in_block(&self, height: i64) -> Vec<&StoredTransaction> {
		let order = self.block_tx_order.get(&height);
		let position = |hash: &str| {
			order
				.and_then(|hashes| hashes.iter().position(|listed| listed == hash))
				.unwrap_or(usize::MAX)
		};

		let mut stored: Vec<&StoredTransaction> = self
			.transactions
			.values()
			.filter(|tx| tx.height == height)
			.collect();
		stored.sort_by_key(|tx| (position(&tx.hash), tx.seq));
		stored
	}
}

/// `ExplorerStore` kept in process memory.
///
/// Writers from every job serialize on one `RwLock`, which makes each upsert atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
	state: RwLock<StoreState>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_state(state: StoreState) -> Self {
		Self {
			state: RwLock::new(state),
		}
	}

	/// Copy of the current contents, for snapshotting.
	pub async fn export_state(&self) -> StoreState {
		self.state.read().await.clone()
	}
}

#[async_trait::async_trait]
impl ExplorerStore for MemoryStore {
	async fn upsert_block(&self, block: RawBlock, tx_hashes: &[String]) -> Result<(), ExplorerError> {
		let mut state = self.state.write().await;
		state.block_tx_order.insert(block.height, tx_hashes.to_vec());
		state.blocks.insert(block.height, block);
		Ok(())
	}

	async fn get_block_page(
		&self,
		offset: usize,
		limit: usize,
	) -> Result<Vec<RawBlock>, ExplorerError> {
		let state = self.state.read().await;
		Ok(state
			.blocks
			.values()
			.rev()
			.skip(offset)
			.take(limit)
			.cloned()
			.collect())
	}

	async fn count_blocks(&self) -> Result<usize, ExplorerError> {
		Ok(self.state.read().await.blocks.len())
	}

	async fn upsert_flat_transactions(
		&self,
		height: i64,
		hash: &str,
		records: Vec<FlatTransactionRecord>,
	) -> Result<(), ExplorerError> {
		let mut state = self.state.write().await;

		let (seq, previous_height) = match state.transactions.get(hash) {
			Some(existing) => (existing.seq, Some(existing.height)),
			None => (state.bump_seq(), None),
		};

		state.transactions.insert(
			hash.to_string(),
			StoredTransaction {
				seq,
				height,
				hash: hash.to_string(),
				records,
			},
		);

		let generation = state.bump_seq();
		state.gas_dirty.insert(height, generation);
		if let Some(previous) = previous_height.filter(|previous| *previous != height) {
			state.gas_dirty.insert(previous, generation);
		}

		Ok(())
	}

	async fn get_tx_hashes_for_block(&self, height: i64) -> Result<Vec<String>, ExplorerError> {
		let state = self.state.read().await;
		Ok(state
			.transactions_in_block(height)
			.into_iter()
			.filter(|tx| !tx.records.is_empty())
			.map(|tx| tx.hash.clone())
			.collect())
	}

	async fn get_flat_transactions_for_block(
		&self,
		height: i64,
	) -> Result<Vec<FlatTransactionRecord>, ExplorerError> {
		let state = self.state.read().await;
		Ok(state
			.transactions_in_block(height)
			.into_iter()
			.flat_map(|tx| tx.records.iter().cloned())
			.collect())
	}

	async fn count_flat_transactions(&self) -> Result<usize, ExplorerError> {
		let state = self.state.read().await;
		Ok(state.transactions.values().map(|tx| tx.records.len()).sum())
	}

	async fn list_transactions_after(
		&self,
		seq: u64,
		limit: usize,
	) -> Result<Vec<StoredTransaction>, ExplorerError> {
		let state = self.state.read().await;
		let mut stored: Vec<&StoredTransaction> = state
			.transactions
			.values()
			.filter(|tx| tx.seq > seq)
			.collect();
		stored.sort_by_key(|tx| tx.seq);
		Ok(stored.into_iter().take(limit).cloned().collect())
	}

	async fn list_gas_dirty_heights(&self, limit: usize) -> Result<Vec<(i64, u64)>, ExplorerError> {
		let state = self.state.read().await;
		Ok(state
			.gas_dirty
			.iter()
			.take(limit)
			.map(|(height, generation)| (*height, *generation))
			.collect())
	}

	async fn upsert_gas_stats(
		&self,
		height: i64,
		stats: GasStats,
		generation: u64,
	) -> Result<(), ExplorerError> {
		let mut state = self.state.write().await;
		state.gas_stats.insert(height, stats);
		if state.gas_dirty.get(&height) == Some(&generation) {
			state.gas_dirty.remove(&height);
		}
		Ok(())
	}

	async fn get_gas_stats_by_heights(
		&self,
		heights: &[i64],
	) -> Result<HashMap<i64, GasStats>, ExplorerError> {
		let state = self.state.read().await;
		Ok(heights
			.iter()
			.filter_map(|height| state.gas_stats.get(height).map(|stats| (*height, *stats)))
			.collect())
	}

	async fn record_sync_failure(&self, failure: SyncFailure) -> Result<(), ExplorerError> {
		self.state
			.write()
			.await
			.failures
			.insert(failure.height, failure);
		Ok(())
	}

	async fn clear_sync_failure(&self, height: i64) -> Result<(), ExplorerError> {
		self.state.write().await.failures.remove(&height);
		Ok(())
	}

	async fn get_sync_failure(&self, height: i64) -> Result<Option<SyncFailure>, ExplorerError> {
		Ok(self.state.read().await.failures.get(&height).cloned())
	}

	async fn list_pending_failures(&self) -> Result<Vec<SyncFailure>, ExplorerError> {
		Ok(self.state.read().await.failures.values().cloned().collect())
	}

	async fn enqueue_pending_transaction(
		&self,
		pending: PendingTransaction,
	) -> Result<(), ExplorerError> {
		self.state
			.write()
			.await
			.pending_transactions
			.entry(pending.hash.clone())
			.or_insert(pending);
		Ok(())
	}

	async fn update_pending_transaction(
		&self,
		pending: PendingTransaction,
	) -> Result<(), ExplorerError> {
		self.state
			.write()
			.await
			.pending_transactions
			.insert(pending.hash.clone(), pending);
		Ok(())
	}

	async fn list_pending_transactions(
		&self,
		limit: usize,
	) -> Result<Vec<PendingTransaction>, ExplorerError> {
		let state = self.state.read().await;
		Ok(state
			.pending_transactions
			.values()
			.take(limit)
			.cloned()
			.collect())
	}

	async fn remove_pending_transaction(&self, hash: &str) -> Result<(), ExplorerError> {
		self.state.write().await.pending_transactions.remove(hash);
		Ok(())
	}

	async fn get_cursor(&self, name: &str) -> Result<Option<i64>, ExplorerError> {
		Ok(self.state.read().await.cursors.get(name).copied())
	}

	async fn set_cursor(&self, name: &str, value: i64) -> Result<(), ExplorerError> {
		self.state
			.write()
			.await
			.cursors
			.insert(name.to_string(), value);
		Ok(())
	}

	async fn get_account(
		&self,
		account_id: &str,
	) -> Result<Option<AccountActivity>, ExplorerError> {
		Ok(self.state.read().await.accounts.get(account_id).cloned())
	}

	async fn upsert_account(&self, account: AccountActivity) -> Result<(), ExplorerError> {
		self.state
			.write()
			.await
			.accounts
			.insert(account.account_id.clone(), account);
		Ok(())
	}
}
