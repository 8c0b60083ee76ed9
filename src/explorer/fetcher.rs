//! Raw record fetcher.
//!
//! Pulls one block or one transaction (plus its receipt) from the chain node and translates the
//! gateway's binary fields into base58 text. Transient transport failures are retried briefly with
//! exponential backoff; a missing object is reported immediately.

use crate::chain::{ChainError, ChainRpc, RpcSignature, RpcTransaction, RpcTxReceipt};
use crate::explorer::types::*;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder, future::retry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry window applied to each individual RPC call.
#[derive(Debug, Clone)]
pub struct FetchRetryConfig {
	pub initial_interval: Duration,
	pub max_interval: Duration,
	pub max_elapsed_time: Duration,
}

impl Default for FetchRetryConfig {
	fn default() -> Self {
		Self {
			initial_interval: Duration::from_millis(250),
			max_interval: Duration::from_secs(2),
			max_elapsed_time: Duration::from_secs(10),
		}
	}
}

impl FetchRetryConfig {
	/// Give up on the first transient failure.
	#[cfg(test)]
	pub fn none() -> Self {
		Self {
			initial_interval: Duration::from_millis(1),
			max_interval: Duration::from_millis(1),
			max_elapsed_time: Duration::ZERO,
		}
	}

	fn backoff(&self) -> ExponentialBackoff {
		ExponentialBackoffBuilder::new()
			.with_initial_interval(self.initial_interval)
			.with_max_interval(self.max_interval)
			.with_max_elapsed_time(Some(self.max_elapsed_time))
			.build()
	}
}

fn classify(error: ChainError) -> backoff::Error<ChainError> {
	if error.is_not_found() {
		backoff::Error::permanent(error)
	} else {
		warn!("Transient RPC failure, retrying: {}", error);
		backoff::Error::transient(error)
	}
}

#[derive(Clone)]
pub struct RecordFetcher {
	rpc: Arc<dyn ChainRpc>,
	retry_config: FetchRetryConfig,
}

impl RecordFetcher {
	pub fn new(rpc: Arc<dyn ChainRpc>, retry_config: FetchRetryConfig) -> Self {
		Self { rpc, retry_config }
	}

	/// Height of the last irreversible block.
	pub async fn fetch_sync_target(&self) -> Result<i64, ExplorerError> {
		let info = retry(self.retry_config.backoff(), || async move {
			self.rpc.get_chain_info().await.map_err(classify)
		})
		.await?;
		debug!(
			"Chain head {}, last irreversible {}",
			info.head_block, info.lib_block
		);
		Ok(info.lib_block)
	}

	/// Fetch one block and the hashes of its transactions.
	pub async fn fetch_block(&self, height: i64) -> Result<FetchedBlock, ExplorerError> {
		let rpc_block = retry(self.retry_config.backoff(), || async move {
			self.rpc.get_block_by_height(height).await.map_err(classify)
		})
		.await?;

		debug!(
			"Fetched block {} ({} transactions)",
			height,
			rpc_block.tx_hashes.len()
		);

		Ok(FetchedBlock {
			block: RawBlock {
				height: rpc_block.number,
				parent_hash: rpc_block.parent_hash,
				hash: rpc_block.hash,
				witness: rpc_block.witness,
				time: rpc_block.time,
			},
			tx_hashes: rpc_block.tx_hashes,
		})
	}

	/// Fetch a transaction and its receipt and merge them.
	///
	/// Both lookups must succeed; no partial record is ever returned.
	pub async fn fetch_transaction(&self, hash: &str) -> Result<RawTransaction, ExplorerError> {
		let tx = retry(self.retry_config.backoff(), || async move {
			self.rpc.get_transaction_by_hash(hash).await.map_err(classify)
		})
		.await?;

		let receipt = retry(self.retry_config.backoff(), || async move {
			self.rpc.get_receipt_by_hash(hash).await.map_err(classify)
		})
		.await?;

		Ok(merge_transaction(hash, tx, receipt))
	}
}

fn encode_signature(signature: RpcSignature) -> RawSignature {
	RawSignature {
		algorithm: signature.algorithm,
		signature: bs58::encode(signature.signature).into_string(),
		public_key: bs58::encode(signature.public_key).into_string(),
	}
}

fn merge_transaction(hash: &str, tx: RpcTransaction, receipt: RpcTxReceipt) -> RawTransaction {
	RawTransaction {
		block_number: tx.block_number,
		time: tx.time,
		hash: hash.to_string(),
		expiration: tx.expiration,
		gas_price: tx.gas_price,
		gas_limit: tx.gas_limit,
		actions: tx
			.actions
			.into_iter()
			.map(|action| RawAction {
				contract: action.contract,
				action_name: action.action_name,
				data: action.data,
			})
			.collect(),
		signer_addresses: tx
			.signers
			.into_iter()
			.map(|signer| bs58::encode(signer).into_string())
			.collect(),
		signatures: tx.signatures.into_iter().map(encode_signature).collect(),
		publisher_signature: encode_signature(tx.publisher),
		receipt: RawTxReceipt {
			gas_usage: receipt.gas_usage,
			successful_action_count: receipt.succ_action_num,
			entries: receipt
				.receipts
				.into_iter()
				.map(|entry| RawReceiptEntry {
					type_: entry.type_,
					content: entry.content,
				})
				.collect(),
			status_code: receipt.status.code,
			status_message: receipt.status.message,
		},
	}
}
