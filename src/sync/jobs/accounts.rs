use crate::explorer::flattener::TRANSFER_ACTION;
use crate::explorer::store::{ACCOUNT_CURSOR, ExplorerStore, StoredTransaction};
use crate::explorer::types::*;
use crate::sync::progress_tracker::{SyncProgressTracker, SyncStats};
use crate::sync::scheduler::{SyncError, SyncTask};

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Accounts touched by a transaction: its publisher and every transfer party.
fn accounts_of(tx: &StoredTransaction) -> BTreeSet<&str> {
	tx.records
		.iter()
		.flat_map(|record| {
			let parties = if record.action_name == TRANSFER_ACTION {
				[record.from.as_str(), record.to.as_str()]
			} else {
				["", ""]
			};
			std::iter::once(record.publisher_account_id.as_str()).chain(parties)
		})
		.filter(|account| !account.is_empty())
		.collect()
}

/// Maintains per-account activity from newly stored transactions.
pub struct AccountSync {
	store: Arc<dyn ExplorerStore>,
	batch_size: usize,
	cadence: Duration,
}

impl AccountSync {
	pub fn new(store: Arc<dyn ExplorerStore>, batch_size: usize, cadence: Duration) -> Self {
		Self {
			store,
			batch_size: batch_size.max(1),
			cadence,
		}
	}

	async fn apply(&self, tx: &StoredTransaction) -> Result<(), ExplorerError> {
		for account_id in accounts_of(tx) {
			let activity = match self.store.get_account(account_id).await? {
				Some(existing) => AccountActivity {
					first_seen_height: existing.first_seen_height.min(tx.height),
					last_seen_height: existing.last_seen_height.max(tx.height),
					tx_count: existing.tx_count + 1,
					..existing
				},
				None => AccountActivity {
					account_id: account_id.to_string(),
					first_seen_height: tx.height,
					last_seen_height: tx.height,
					tx_count: 1,
				},
			};
			self.store.upsert_account(activity).await?;
		}
		Ok(())
	}
}

#[async_trait::async_trait]
impl SyncTask for AccountSync {
	fn name(&self) -> &'static str {
		"accounts"
	}

	fn cadence(&self) -> Duration {
		self.cadence
	}

	async fn run_once(&self) -> Result<SyncStats, SyncError> {
		let mut progress = SyncProgressTracker::new(self.name());

		let cursor = self.store.get_cursor(ACCOUNT_CURSOR).await?.unwrap_or(0);
		let batch = self
			.store
			.list_transactions_after(cursor.max(0) as u64, self.batch_size)
			.await?;

		// Strictly in sequence order; a failure ends the cycle so the cursor never skips a transaction
		for tx in &batch {
			if let Err(e) = self.apply(tx).await {
				warn!("Failed to index accounts of transaction {}: {}", tx.hash, e);
				progress.record_failed(tx.seq as i64);
				break;
			}
			self.store.set_cursor(ACCOUNT_CURSOR, tx.seq as i64).await?;
			progress.record_processed(tx.seq as i64);
		}

		Ok(progress.get_stats())
	}
}
