//! Record types produced and consumed by the ingestion pipeline

use crate::chain::ChainError;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of executable intent inside a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAction {
	pub contract: String,
	pub action_name: String,
	/// Action-specific encoded payload, e.g. a JSON tuple for transfers.
	pub data: String,
}

/// Signature with binary fields in base58 text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSignature {
	pub algorithm: i32,
	pub signature: String,
	pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReceiptEntry {
	#[serde(rename = "type")]
	pub type_: i32,
	pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTxReceipt {
	pub gas_usage: i64,
	pub successful_action_count: i32,
	pub entries: Vec<RawReceiptEntry>,
	pub status_code: i32,
	pub status_message: String,
}

/// One on-chain transaction merged with its receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
	pub block_number: i64,
	pub time: i64,
	pub hash: String,
	pub expiration: i64,
	pub gas_price: i64,
	pub gas_limit: i64,
	pub actions: Vec<RawAction>,
	pub signer_addresses: Vec<String>,
	pub signatures: Vec<RawSignature>,
	pub publisher_signature: RawSignature,
	pub receipt: RawTxReceipt,
}

/// A block as persisted by the explorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
	pub height: i64,
	pub parent_hash: String,
	pub hash: String,
	pub witness: String,
	/// Block time as reported by the node, before unit correction.
	pub time: i64,
}

/// A fetched block together with the transaction hashes the node listed for it.
#[derive(Debug, Clone)]
pub struct FetchedBlock {
	pub block: RawBlock,
	pub tx_hashes: Vec<String>,
}

/// Action-level projection of a transaction.
///
/// `from`, `to` and `amount` are only populated for `Transfer` actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatTransactionRecord {
	pub block_number: i64,
	pub time: i64,
	pub hash: String,
	pub expiration: i64,
	pub gas_price: i64,
	pub gas_limit: i64,
	pub action: RawAction,
	pub action_index: usize,
	pub action_name: String,
	pub signer_addresses: Vec<String>,
	pub signatures: Vec<RawSignature>,
	pub publisher_account_id: String,
	pub from: String,
	pub to: String,
	pub amount: f64,
}

/// Block-level gas aggregate over the block's transactions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasStats {
	pub total_gas_limit: i64,
	pub avg_gas_price: f64,
}

/// Display-ready block record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
	pub height: i64,
	pub parent_hash: String,
	pub block_hash: String,
	pub witness: String,
	pub age: String,
	#[serde(rename = "utcTime")]
	pub utc_time_text: String,
	pub timestamp: i64,
	#[serde(rename = "txList")]
	pub tx_hashes: Vec<String>,
	pub total_gas_limit: i64,
	pub avg_gas_price: f64,
}

/// Failure marker for a block height that could not be ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
	pub height: i64,
	pub attempts: u32,
	pub last_error: String,
	pub next_attempt_at: DateTime<Utc>,
	/// Set once the retry budget is spent; the marker is kept for inspection.
	pub exhausted: bool,
}

/// A transaction hash listed by a block that the node could not serve yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransaction {
	pub hash: String,
	pub height: i64,
	pub attempts: u32,
}

/// Per-account activity derived from stored transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountActivity {
	pub account_id: String,
	pub first_seen_height: i64,
	pub last_seen_height: i64,
	pub tx_count: u64,
}

/// Error taxonomy for the ingestion pipeline
#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Transient RPC error: {0}")]
	TransientRpc(String),

	#[error("Malformed payload: {0}")]
	MalformedPayload(String),

	#[error("Persistence error: {0}")]
	Persistence(String),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl ExplorerError {
	/// Whether the failed unit of work is worth attempting again later.
	pub fn is_retryable(&self) -> bool {
		!matches!(
			self,
			ExplorerError::NotFound(_) | ExplorerError::MalformedPayload(_)
		)
	}
}

impl From<ChainError> for ExplorerError {
	fn from(error: ChainError) -> Self {
		match error {
			ChainError::NotFound(what) => ExplorerError::NotFound(what),
			other => ExplorerError::TransientRpc(other.to_string()),
		}
	}
}
