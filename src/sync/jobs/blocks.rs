use crate::explorer::ingest::{BlockIngestor, IngestOutcome};
use crate::explorer::retry_tracker::FailureRetryTracker;
use crate::explorer::store::{BLOCK_CURSOR, ExplorerStore};
use crate::explorer::types::ExplorerError;
use crate::sync::progress_tracker::{SyncProgressTracker, SyncStats};
use crate::sync::scheduler::{SyncError, SyncTask};

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Ingest one height and settle its failure marker.
async fn sync_height(
	ingestor: &BlockIngestor,
	retry_tracker: &FailureRetryTracker,
	progress: &mut SyncProgressTracker,
	height: i64,
) -> Result<(), ExplorerError> {
	match ingestor.ingest_block(height).await {
		Ok(IngestOutcome::Synced {
			transactions,
			deferred,
		}) => {
			if deferred > 0 {
				debug!(
					"Block {}: {} transactions stored, {} deferred",
					height, transactions, deferred
				);
			}
			retry_tracker.record_success(height).await?;
			progress.record_processed(height);
		}
		Ok(IngestOutcome::NotFound) => {
			retry_tracker.record_success(height).await?;
			progress.record_not_found(height);
		}
		Err(e) => {
			retry_tracker.record_failure(height, &e, Utc::now()).await?;
			progress.record_failed(height);
		}
	}
	Ok(())
}

/// Follows the irreversible head, ingesting new heights in order.
pub struct NewBlockSync {
	ingestor: BlockIngestor,
	retry_tracker: FailureRetryTracker,
	store: Arc<dyn ExplorerStore>,
	start_height: i64,
	batch_size: usize,
	cadence: Duration,
}

impl NewBlockSync {
	pub fn new(
		ingestor: BlockIngestor,
		retry_tracker: FailureRetryTracker,
		store: Arc<dyn ExplorerStore>,
		start_height: i64,
		batch_size: usize,
		cadence: Duration,
	) -> Self {
		Self {
			ingestor,
			retry_tracker,
			store,
			start_height,
			batch_size: batch_size.max(1),
			cadence,
		}
	}
}

#[async_trait::async_trait]
impl SyncTask for NewBlockSync {
	fn name(&self) -> &'static str {
		"new-blocks"
	}

	fn cadence(&self) -> Duration {
		self.cadence
	}

	async fn run_once(&self) -> Result<SyncStats, SyncError> {
		let mut progress = SyncProgressTracker::new(self.name());

		let next = self
			.store
			.get_cursor(BLOCK_CURSOR)
			.await?
			.unwrap_or(self.start_height);
		let target = self.ingestor.sync_target().await?;

		if next > target {
			debug!("Caught up at {} (irreversible head {})", next - 1, target);
			return Ok(progress.get_stats());
		}

		let end = target.min(next.saturating_add(self.batch_size as i64 - 1));
		for height in next..=end {
			sync_height(&self.ingestor, &self.retry_tracker, &mut progress, height).await?;
		}

		// Failed heights are owned by the failed-block job from here on
		self.store.set_cursor(BLOCK_CURSOR, end + 1).await?;
		progress.warn_gaps();

		if end < target {
			info!("Synced up to {}, {} heights behind", end, target - end);
		}

		Ok(progress.get_stats())
	}
}

/// Reattempts heights whose failure marker is due.
pub struct FailedBlockSync {
	ingestor: BlockIngestor,
	retry_tracker: FailureRetryTracker,
	batch_size: usize,
	cadence: Duration,
}

impl FailedBlockSync {
	pub fn new(
		ingestor: BlockIngestor,
		retry_tracker: FailureRetryTracker,
		batch_size: usize,
		cadence: Duration,
	) -> Self {
		Self {
			ingestor,
			retry_tracker,
			batch_size: batch_size.max(1),
			cadence,
		}
	}
}

#[async_trait::async_trait]
impl SyncTask for FailedBlockSync {
	fn name(&self) -> &'static str {
		"failed-blocks"
	}

	fn cadence(&self) -> Duration {
		self.cadence
	}

	async fn run_once(&self) -> Result<SyncStats, SyncError> {
		let mut progress = SyncProgressTracker::new(self.name());

		let due = self
			.retry_tracker
			.due_failures(Utc::now(), self.batch_size)
			.await?;

		for failure in due {
			debug!(
				"Retrying block {} (attempt {})",
				failure.height,
				failure.attempts + 1
			);
			sync_height(
				&self.ingestor,
				&self.retry_tracker,
				&mut progress,
				failure.height,
			)
			.await?;
		}

		let stats = progress.get_stats();
		if stats.not_found > 0 {
			warn!(
				"{} previously failed heights no longer exist on the node",
				stats.not_found
			);
		}
		Ok(stats)
	}
}
