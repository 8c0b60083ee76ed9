use crate::explorer::store::{MemoryStore, SnapshotRepository};
use crate::sync::progress_tracker::SyncStats;
use crate::sync::scheduler::{SyncError, SyncTask};

use std::sync::Arc;
use std::time::Duration;

/// Periodically persists the in-memory store so a restart resumes where it left off.
pub struct SnapshotTask {
	store: Arc<MemoryStore>,
	repository: SnapshotRepository,
	cadence: Duration,
}

impl SnapshotTask {
	pub fn new(store: Arc<MemoryStore>, repository: SnapshotRepository, cadence: Duration) -> Self {
		Self {
			store,
			repository,
			cadence,
		}
	}

	pub async fn save_now(&self) -> Result<(), SyncError> {
		let state = self.store.export_state().await;
		self.repository.save(&state).await?;
		Ok(())
	}
}

#[async_trait::async_trait]
impl SyncTask for SnapshotTask {
	fn name(&self) -> &'static str {
		"snapshot"
	}

	fn cadence(&self) -> Duration {
		self.cadence
	}

	/// Reports the stored blocks as the units written.
	async fn run_once(&self) -> Result<SyncStats, SyncError> {
		let state = self.store.export_state().await;
		self.repository.save(&state).await?;

		Ok(SyncStats {
			job: self.name(),
			processed: state.blocks.len(),
			failed: 0,
			not_found: 0,
			highest_processed: state.blocks.keys().next_back().copied(),
			gaps: Vec::new(),
		})
	}
}
