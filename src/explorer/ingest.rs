//! Fetch → flatten → persist for one block or one transaction.

use crate::explorer::fetcher::RecordFetcher;
use crate::explorer::flattener::TransactionFlattener;
use crate::explorer::store::ExplorerStore;
use crate::explorer::types::*;

use itertools::Itertools;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of ingesting one block height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
	Synced {
		transactions: usize,
		/// Transactions the node could not serve yet, queued for the transaction job.
		deferred: usize,
	},
	/// The node has no block at this height.
	NotFound,
}

#[derive(Clone)]
pub struct BlockIngestor {
	fetcher: RecordFetcher,
	flattener: TransactionFlattener,
	store: Arc<dyn ExplorerStore>,
}

impl BlockIngestor {
	pub fn new(
		fetcher: RecordFetcher,
		flattener: TransactionFlattener,
		store: Arc<dyn ExplorerStore>,
	) -> Self {
		Self {
			fetcher,
			flattener,
			store,
		}
	}

	/// Highest height the new-block job should follow.
	pub async fn sync_target(&self) -> Result<i64, ExplorerError> {
		self.fetcher.fetch_sync_target().await
	}

	/// Ingest a block height with all of its transactions.
	///
	/// Either every fetched transaction and the block itself are persisted, or an error is
	/// returned. Transactions the node reports as missing are deferred instead of failing the block.
	pub async fn ingest_block(&self, height: i64) -> Result<IngestOutcome, ExplorerError> {
		let fetched = match self.fetcher.fetch_block(height).await {
			Ok(fetched) => fetched,
			Err(ExplorerError::NotFound(_)) => {
				info!("Block {} not found on node", height);
				return Ok(IngestOutcome::NotFound);
			}
			Err(e) => return Err(e),
		};

		let mut transactions = Vec::with_capacity(fetched.tx_hashes.len());
		let mut deferred = 0;
		for hash in fetched.tx_hashes.iter().unique() {
			match self.fetcher.fetch_transaction(hash).await {
				Ok(tx) => transactions.push(tx),
				Err(ExplorerError::NotFound(_)) => {
					debug!("Transaction {} of block {} not served yet", hash, height);
					self.store
						.enqueue_pending_transaction(PendingTransaction {
							hash: hash.clone(),
							height,
							attempts: 0,
						})
						.await?;
					deferred += 1;
				}
				Err(e) => return Err(e),
			}
		}

		for tx in &mut transactions {
			tx.block_number = height;
			let records = self.flattener.flatten(tx);
			self.store
				.upsert_flat_transactions(height, &tx.hash, records)
				.await?;
		}

		self.store
			.upsert_block(fetched.block, &fetched.tx_hashes)
			.await?;

		debug!(
			"Ingested block {} ({} transactions, {} deferred)",
			height,
			transactions.len(),
			deferred
		);

		Ok(IngestOutcome::Synced {
			transactions: transactions.len(),
			deferred,
		})
	}

	/// Ingest one transaction that belongs to the block at `height`.
	///
	/// Returns the number of flattened records stored.
	pub async fn ingest_transaction(&self, hash: &str, height: i64) -> Result<usize, ExplorerError> {
		let mut tx = self.fetcher.fetch_transaction(hash).await?;
		if tx.block_number == 0 {
			tx.block_number = height;
		}

		let records = self.flattener.flatten(&tx);
		let count = records.len();
		self.store
			.upsert_flat_transactions(tx.block_number, &tx.hash, records)
			.await?;

		Ok(count)
	}
}
