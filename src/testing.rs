//! Shared fakes and record builders for unit tests

use crate::chain::*;
use crate::explorer::account::ChecksumAccountIdResolver;
use crate::explorer::fetcher::{FetchRetryConfig, RecordFetcher};
use crate::explorer::flattener::{TRANSFER_ACTION, TransactionFlattener};
use crate::explorer::ingest::BlockIngestor;
use crate::explorer::store::{ExplorerStore, MemoryStore, StoredTransaction};
use crate::explorer::types::*;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub const PUBLISHER_KEY: [u8; 32] = [7; 32];
pub const SIGNER_ID: [u8; 3] = [1, 2, 3];

#[derive(Default)]
struct MockChainState {
	lib_block: Option<i64>,
	blocks: HashMap<i64, RpcBlock>,
	transactions: HashMap<String, RpcTransaction>,
	receipts: HashMap<String, RpcTxReceipt>,
	failing_receipts: HashSet<String>,
	/// Remaining transient failures per height; `u32::MAX` fails forever.
	block_failures: HashMap<i64, u32>,
	chain_info_down: bool,
}

/// In-memory node: serves what was added, reports everything else as not found.
#[derive(Default)]
pub struct MockChain {
	state: Mutex<MockChainState>,
}

fn unavailable() -> ChainError {
	ChainError::Status(503, "service unavailable".to_string())
}

impl MockChain {
	pub fn add_block(&self, block: RpcBlock) {
		let mut state = self.state.lock().expect("mock chain lock");
		state.blocks.insert(block.number, block);
	}

	pub fn add_transaction(&self, tx: RpcTransaction, gas_usage: i64) {
		let receipt = RpcTxReceipt {
			gas_usage,
			succ_action_num: tx.actions.len() as i32,
			receipts: vec![],
			status: RpcReceiptStatus {
				code: 0,
				message: String::new(),
			},
		};
		let mut state = self.state.lock().expect("mock chain lock");
		state.receipts.insert(tx.hash.clone(), receipt);
		state.transactions.insert(tx.hash.clone(), tx);
	}

	pub fn fail_receipt(&self, hash: &str) {
		let mut state = self.state.lock().expect("mock chain lock");
		state.failing_receipts.insert(hash.to_string());
	}

	/// Fail the next `times` requests for `height` with a transport error.
	pub fn fail_block_times(&self, height: i64, times: u32) {
		let mut state = self.state.lock().expect("mock chain lock");
		state.block_failures.insert(height, times);
	}

	pub fn fail_block(&self, height: i64) {
		self.fail_block_times(height, u32::MAX);
	}

	pub fn heal_block(&self, height: i64) {
		let mut state = self.state.lock().expect("mock chain lock");
		state.block_failures.remove(&height);
	}

	pub fn set_lib_block(&self, height: i64) {
		let mut state = self.state.lock().expect("mock chain lock");
		state.lib_block = Some(height);
	}

	pub fn set_chain_info_down(&self, down: bool) {
		let mut state = self.state.lock().expect("mock chain lock");
		state.chain_info_down = down;
	}
}

#[async_trait::async_trait]
impl ChainRpc for MockChain {
	async fn get_chain_info(&self) -> Result<RpcChainInfo, ChainError> {
		let state = self.state.lock().expect("mock chain lock");
		if state.chain_info_down {
			return Err(unavailable());
		}
		let head_block = state.blocks.keys().copied().max().unwrap_or(0);
		Ok(RpcChainInfo {
			head_block,
			lib_block: state.lib_block.unwrap_or(head_block),
		})
	}

	async fn get_block_by_height(&self, height: i64) -> Result<RpcBlock, ChainError> {
		let mut state = self.state.lock().expect("mock chain lock");
		if let Some(remaining) = state.block_failures.get_mut(&height) {
			if *remaining > 0 {
				if *remaining != u32::MAX {
					*remaining -= 1;
				}
				return Err(unavailable());
			}
		}
		state
			.blocks
			.get(&height)
			.cloned()
			.ok_or_else(|| ChainError::NotFound(format!("block {}", height)))
	}

	async fn get_transaction_by_hash(&self, hash: &str) -> Result<RpcTransaction, ChainError> {
		let state = self.state.lock().expect("mock chain lock");
		state
			.transactions
			.get(hash)
			.cloned()
			.ok_or_else(|| ChainError::NotFound(format!("transaction {}", hash)))
	}

	async fn get_receipt_by_hash(&self, hash: &str) -> Result<RpcTxReceipt, ChainError> {
		let state = self.state.lock().expect("mock chain lock");
		if state.failing_receipts.contains(hash) {
			return Err(unavailable());
		}
		state
			.receipts
			.get(hash)
			.cloned()
			.ok_or_else(|| ChainError::NotFound(format!("receipt {}", hash)))
	}
}

pub fn rpc_block(height: i64, tx_hashes: &[&str]) -> RpcBlock {
	RpcBlock {
		hash: format!("block-{}", height),
		parent_hash: format!("block-{}", height - 1),
		number: height,
		witness: "producer".to_string(),
		time: height * 1_000,
		tx_hashes: tx_hashes.iter().map(|hash| hash.to_string()).collect(),
	}
}

fn rpc_signature() -> RpcSignature {
	RpcSignature {
		algorithm: 2,
		signature: vec![9; 8],
		public_key: PUBLISHER_KEY.to_vec(),
	}
}

pub fn rpc_transaction(
	hash: &str,
	block_number: i64,
	gas_price: i64,
	gas_limit: i64,
	actions: Vec<RpcAction>,
) -> RpcTransaction {
	RpcTransaction {
		hash: hash.to_string(),
		block_number,
		time: block_number * 1_000,
		expiration: block_number * 1_000 + 90,
		gas_price,
		gas_limit,
		actions,
		signers: vec![SIGNER_ID.to_vec()],
		signatures: vec![rpc_signature()],
		publisher: rpc_signature(),
	}
}

pub fn rpc_transfer(data: &str) -> RpcAction {
	RpcAction {
		contract: "token.iost".to_string(),
		action_name: TRANSFER_ACTION.to_string(),
		data: data.to_string(),
	}
}

pub fn rpc_vote(data: &str) -> RpcAction {
	RpcAction {
		contract: "vote_producer.iost".to_string(),
		action_name: "Vote".to_string(),
		data: data.to_string(),
	}
}

pub fn transfer_action(data: &str) -> RawAction {
	RawAction {
		contract: "token.iost".to_string(),
		action_name: TRANSFER_ACTION.to_string(),
		data: data.to_string(),
	}
}

pub fn vote_action(data: &str) -> RawAction {
	RawAction {
		contract: "vote_producer.iost".to_string(),
		action_name: "Vote".to_string(),
		data: data.to_string(),
	}
}

fn raw_signature() -> RawSignature {
	RawSignature {
		algorithm: 2,
		signature: bs58::encode([9u8; 8]).into_string(),
		public_key: bs58::encode(PUBLISHER_KEY).into_string(),
	}
}

pub fn raw_transaction(hash: &str, actions: Vec<RawAction>) -> RawTransaction {
	RawTransaction {
		block_number: 1,
		time: 1_000,
		hash: hash.to_string(),
		expiration: 1_090,
		gas_price: 100,
		gas_limit: 10_000,
		actions,
		signer_addresses: vec![bs58::encode(SIGNER_ID).into_string()],
		signatures: vec![raw_signature()],
		publisher_signature: raw_signature(),
		receipt: RawTxReceipt {
			gas_usage: 10,
			successful_action_count: 0,
			entries: vec![],
			status_code: 0,
			status_message: String::new(),
		},
	}
}

pub fn flat_record(hash: &str, height: i64, action_index: usize) -> FlatTransactionRecord {
	let action = vote_action("[]");
	FlatTransactionRecord {
		block_number: height,
		time: height * 1_000,
		hash: hash.to_string(),
		expiration: height * 1_000 + 90,
		gas_price: 100,
		gas_limit: 10_000,
		action_name: action.action_name.clone(),
		action,
		action_index,
		signer_addresses: vec![],
		signatures: vec![],
		publisher_account_id: "publisher".to_string(),
		from: String::new(),
		to: String::new(),
		amount: 0.0,
	}
}

pub fn ingestor(chain: Arc<MockChain>, store: Arc<dyn ExplorerStore>) -> BlockIngestor {
	BlockIngestor::new(
		RecordFetcher::new(chain, FetchRetryConfig::none()),
		TransactionFlattener::new(Arc::new(ChecksumAccountIdResolver::new("IOST"))),
		store,
	)
}

/// `MemoryStore` whose writes, or individual reads, can be switched to fail.
#[derive(Default)]
pub struct FailingStore {
	inner: MemoryStore,
	fail_writes: AtomicBool,
	failing_reads: Mutex<HashSet<&'static str>>,
}

impl FailingStore {
	pub fn set_fail_writes(&self, fail: bool) {
		self.fail_writes.store(fail, Ordering::SeqCst);
	}

	/// Make the read method named `method` fail from now on.
	pub fn fail_read(&self, method: &'static str) {
		self.failing_reads
			.lock()
			.expect("failing store lock")
			.insert(method);
	}

	fn check_write(&self) -> Result<(), ExplorerError> {
		if self.fail_writes.load(Ordering::SeqCst) {
			return Err(ExplorerError::Persistence("write rejected".to_string()));
		}
		Ok(())
	}

	fn check_read(&self, method: &str) -> Result<(), ExplorerError> {
		if self
			.failing_reads
			.lock()
			.expect("failing store lock")
			.contains(method)
		{
			return Err(ExplorerError::Persistence(format!("{} rejected", method)));
		}
		Ok(())
	}
}

#[async_trait::async_trait]
impl ExplorerStore for FailingStore {
	async fn upsert_block(&self, block: RawBlock, tx_hashes: &[String]) -> Result<(), ExplorerError> {
		self.check_write()?;
		self.inner.upsert_block(block, tx_hashes).await
	}

	async fn get_block_page(
		&self,
		offset: usize,
		limit: usize,
	) -> Result<Vec<RawBlock>, ExplorerError> {
		self.check_read("get_block_page")?;
		self.inner.get_block_page(offset, limit).await
	}

	async fn count_blocks(&self) -> Result<usize, ExplorerError> {
		self.check_read("count_blocks")?;
		self.inner.count_blocks().await
	}

	async fn upsert_flat_transactions(
		&self,
		height: i64,
		hash: &str,
		records: Vec<FlatTransactionRecord>,
	) -> Result<(), ExplorerError> {
		self.check_write()?;
		self.inner.upsert_flat_transactions(height, hash, records).await
	}

	async fn get_tx_hashes_for_block(&self, height: i64) -> Result<Vec<String>, ExplorerError> {
		self.check_read("get_tx_hashes_for_block")?;
		self.inner.get_tx_hashes_for_block(height).await
	}

	async fn get_flat_transactions_for_block(
		&self,
		height: i64,
	) -> Result<Vec<FlatTransactionRecord>, ExplorerError> {
		self.check_read("get_flat_transactions_for_block")?;
		self.inner.get_flat_transactions_for_block(height).await
	}

	async fn count_flat_transactions(&self) -> Result<usize, ExplorerError> {
		self.check_read("count_flat_transactions")?;
		self.inner.count_flat_transactions().await
	}

	async fn list_transactions_after(
		&self,
		seq: u64,
		limit: usize,
	) -> Result<Vec<StoredTransaction>, ExplorerError> {
		self.check_read("list_transactions_after")?;
		self.inner.list_transactions_after(seq, limit).await
	}

	async fn list_gas_dirty_heights(&self, limit: usize) -> Result<Vec<(i64, u64)>, ExplorerError> {
		self.check_read("list_gas_dirty_heights")?;
		self.inner.list_gas_dirty_heights(limit).await
	}

	async fn upsert_gas_stats(
		&self,
		height: i64,
		stats: GasStats,
		generation: u64,
	) -> Result<(), ExplorerError> {
		self.check_write()?;
		self.inner.upsert_gas_stats(height, stats, generation).await
	}

	async fn get_gas_stats_by_heights(
		&self,
		heights: &[i64],
	) -> Result<HashMap<i64, GasStats>, ExplorerError> {
		self.check_read("get_gas_stats_by_heights")?;
		self.inner.get_gas_stats_by_heights(heights).await
	}

	async fn record_sync_failure(&self, failure: SyncFailure) -> Result<(), ExplorerError> {
		self.inner.record_sync_failure(failure).await
	}

	async fn clear_sync_failure(&self, height: i64) -> Result<(), ExplorerError> {
		self.inner.clear_sync_failure(height).await
	}

	async fn get_sync_failure(&self, height: i64) -> Result<Option<SyncFailure>, ExplorerError> {
		self.inner.get_sync_failure(height).await
	}

	async fn list_pending_failures(&self) -> Result<Vec<SyncFailure>, ExplorerError> {
		self.inner.list_pending_failures().await
	}

	async fn enqueue_pending_transaction(
		&self,
		pending: PendingTransaction,
	) -> Result<(), ExplorerError> {
		self.inner.enqueue_pending_transaction(pending).await
	}

	async fn update_pending_transaction(
		&self,
		pending: PendingTransaction,
	) -> Result<(), ExplorerError> {
		self.inner.update_pending_transaction(pending).await
	}

	async fn list_pending_transactions(
		&self,
		limit: usize,
	) -> Result<Vec<PendingTransaction>, ExplorerError> {
		self.inner.list_pending_transactions(limit).await
	}

	async fn remove_pending_transaction(&self, hash: &str) -> Result<(), ExplorerError> {
		self.inner.remove_pending_transaction(hash).await
	}

	async fn get_cursor(&self, name: &str) -> Result<Option<i64>, ExplorerError> {
		self.inner.get_cursor(name).await
	}

	async fn set_cursor(&self, name: &str, value: i64) -> Result<(), ExplorerError> {
		self.inner.set_cursor(name, value).await
	}

	async fn get_account(
		&self,
		account_id: &str,
	) -> Result<Option<AccountActivity>, ExplorerError> {
		self.inner.get_account(account_id).await
	}

	async fn upsert_account(&self, account: AccountActivity) -> Result<(), ExplorerError> {
		self.check_write()?;
		self.inner.upsert_account(account).await
	}
}
