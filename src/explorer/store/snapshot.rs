use super::memory::StoreState;
use crate::explorer::types::ExplorerError;

use std::path::PathBuf;
use tracing::info;

/// File-based snapshots of the explorer store
pub struct SnapshotRepository {
	data_dir: PathBuf,
}

impl SnapshotRepository {
	pub fn new(data_dir: PathBuf) -> Self {
		Self { data_dir }
	}

	fn state_filename(&self) -> PathBuf {
		self.data_dir.join("explorer_state.json")
	}

	fn metadata_filename(&self) -> PathBuf {
		self.data_dir.join("explorer_state.meta.json")
	}

	/// Write the state, replacing any previous snapshot.
	pub async fn save(&self, state: &StoreState) -> Result<(), ExplorerError> {
		tokio::fs::create_dir_all(&self.data_dir).await?;

		let content = serde_json::to_vec(state).map_err(|e| {
			ExplorerError::Persistence(format!("Failed to serialize store snapshot: {}", e))
		})?;

		// Write next to the target and rename so readers never see a torn file
		let filename = self.state_filename();
		let staging = filename.with_extension("json.tmp");
		tokio::fs::write(&staging, &content).await.map_err(|e| {
			ExplorerError::Persistence(format!("Failed to write store snapshot: {}", e))
		})?;
		tokio::fs::rename(&staging, &filename).await?;

		let metadata = serde_json::json!({
			"blocks": state.blocks.len(),
			"transactions": state.transactions.len(),
			"pending_failures": state.failures.len(),
			"timestamp": chrono::Utc::now().to_rfc3339(),
		});
		let metadata = serde_json::to_string_pretty(&metadata).map_err(|e| {
			ExplorerError::Persistence(format!("Failed to serialize snapshot metadata: {}", e))
		})?;
		tokio::fs::write(self.metadata_filename(), metadata)
			.await
			.map_err(|e| {
				ExplorerError::Persistence(format!("Failed to write snapshot metadata: {}", e))
			})?;

		info!(
			"Saved store snapshot to {:?} ({} blocks, {} transactions)",
			filename,
			state.blocks.len(),
			state.transactions.len()
		);
		Ok(())
	}

	/// Load the latest snapshot, if one exists.
	pub async fn load(&self) -> Result<Option<StoreState>, ExplorerError> {
		let filename = self.state_filename();
		if !tokio::fs::try_exists(&filename).await? {
			return Ok(None);
		}

		let content = tokio::fs::read(&filename).await.map_err(|e| {
			ExplorerError::Persistence(format!("Failed to read store snapshot: {}", e))
		})?;

		let state: StoreState = serde_json::from_slice(&content).map_err(|e| {
			ExplorerError::Persistence(format!("Failed to parse store snapshot: {}", e))
		})?;

		info!(
			"Loaded store snapshot from {:?} ({} blocks)",
			filename,
			state.blocks.len()
		);
		Ok(Some(state))
	}
}
