use crate::explorer::ingest::BlockIngestor;
use crate::explorer::store::ExplorerStore;
use crate::explorer::types::*;
use crate::sync::progress_tracker::{SyncProgressTracker, SyncStats};
use crate::sync::scheduler::{SyncError, SyncTask};

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Drains the queue of transactions a block listed before the node could serve them.
pub struct TransactionSync {
	ingestor: BlockIngestor,
	store: Arc<dyn ExplorerStore>,
	batch_size: usize,
	max_attempts: u32,
	cadence: Duration,
}

impl TransactionSync {
	pub fn new(
		ingestor: BlockIngestor,
		store: Arc<dyn ExplorerStore>,
		batch_size: usize,
		max_attempts: u32,
		cadence: Duration,
	) -> Self {
		Self {
			ingestor,
			store,
			batch_size: batch_size.max(1),
			max_attempts,
			cadence,
		}
	}

	async fn give_up_or_requeue(
		&self,
		mut pending: PendingTransaction,
		cause: &ExplorerError,
	) -> Result<(), ExplorerError> {
		pending.attempts += 1;
		if pending.attempts >= self.max_attempts {
			error!(
				"Dropping transaction {} of block {} after {} attempts: {}",
				pending.hash, pending.height, pending.attempts, cause
			);
			self.store.remove_pending_transaction(&pending.hash).await
		} else {
			debug!(
				"Transaction {} still unavailable (attempt {}): {}",
				pending.hash, pending.attempts, cause
			);
			self.store.update_pending_transaction(pending).await
		}
	}
}

#[async_trait::async_trait]
impl SyncTask for TransactionSync {
	fn name(&self) -> &'static str {
		"transactions"
	}

	fn cadence(&self) -> Duration {
		self.cadence
	}

	async fn run_once(&self) -> Result<SyncStats, SyncError> {
		let mut progress = SyncProgressTracker::new(self.name());

		let queue = self.store.list_pending_transactions(self.batch_size).await?;
		for pending in queue {
			match self
				.ingestor
				.ingest_transaction(&pending.hash, pending.height)
				.await
			{
				Ok(_) => {
					self.store.remove_pending_transaction(&pending.hash).await?;
					progress.record_processed(pending.height);
				}
				Err(e) => {
					let height = pending.height;
					let not_found = matches!(e, ExplorerError::NotFound(_));
					self.give_up_or_requeue(pending, &e).await?;
					if not_found {
						progress.record_not_found(height);
					} else {
						progress.record_failed(height);
					}
				}
			}
		}

		Ok(progress.get_stats())
	}
}
