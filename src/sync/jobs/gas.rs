use crate::explorer::aggregator::compute_gas_stats;
use crate::explorer::store::ExplorerStore;
use crate::explorer::types::ExplorerError;
use crate::sync::progress_tracker::{SyncProgressTracker, SyncStats};
use crate::sync::scheduler::{SyncError, SyncTask};

use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Recomputes gas statistics for blocks whose transactions changed.
pub struct GasAggregateSync {
	store: Arc<dyn ExplorerStore>,
	batch_size: usize,
	cadence: Duration,
}

impl GasAggregateSync {
	pub fn new(store: Arc<dyn ExplorerStore>, batch_size: usize, cadence: Duration) -> Self {
		Self {
			store,
			batch_size: batch_size.max(1),
			cadence,
		}
	}

	async fn refresh(&self, height: i64, generation: u64) -> Result<(), ExplorerError> {
		let records = self.store.get_flat_transactions_for_block(height).await?;
		let stats = compute_gas_stats(&records);
		self.store.upsert_gas_stats(height, stats, generation).await
	}
}

#[async_trait::async_trait]
impl SyncTask for GasAggregateSync {
	fn name(&self) -> &'static str {
		"gas-aggregates"
	}

	fn cadence(&self) -> Duration {
		self.cadence
	}

	async fn run_once(&self) -> Result<SyncStats, SyncError> {
		let mut progress = SyncProgressTracker::new(self.name());

		let dirty = self.store.list_gas_dirty_heights(self.batch_size).await?;
		for (height, generation) in dirty {
			match self.refresh(height, generation).await {
				Ok(()) => progress.record_processed(height),
				Err(e) => {
					warn!("Failed to aggregate gas for block {}: {}", height, e);
					progress.record_failed(height);
				}
			}
		}

		Ok(progress.get_stats())
	}
}
