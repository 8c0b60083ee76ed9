mod chain;
mod config;
mod explorer;
mod sync;
mod utils;

#[cfg(test)]
mod testing;

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::chain::HttpChainClient;
use crate::config::{Cli, Command, ExplorerConfig};
use crate::explorer::ExplorerError;
use crate::explorer::account::ChecksumAccountIdResolver;
use crate::explorer::aggregator::list_blocks;
use crate::explorer::fetcher::RecordFetcher;
use crate::explorer::flattener::TransactionFlattener;
use crate::explorer::ingest::BlockIngestor;
use crate::explorer::retry_tracker::FailureRetryTracker;
use crate::explorer::store::{ExplorerStore, MemoryStore, SnapshotRepository};
use crate::sync::jobs::{
	AccountSync, FailedBlockSync, GasAggregateSync, NewBlockSync, SnapshotTask, TransactionSync,
};
use crate::sync::{FailureBackoff, JobGroup, SyncTask};

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.with_writer(std::io::stderr)
		.init();

	let cli = Cli::parse();

	let result = match cli.command.unwrap_or(Command::Sync) {
		Command::Sync => run_sync(cli.config).await,
		Command::Blocks { page, page_size } => print_blocks(cli.config, page, page_size).await,
	};

	if let Err(e) = result {
		error!("Explorer sync failed: {}", e);
		std::process::exit(1);
	}
}

async fn load_store(repository: &SnapshotRepository) -> Result<MemoryStore, ExplorerError> {
	match repository.load().await? {
		Some(state) => {
			info!(
				"Restored snapshot with {} blocks and {} transactions",
				state.blocks.len(),
				state.transactions.len()
			);
			Ok(MemoryStore::from_state(state))
		}
		None => {
			info!("No snapshot found, starting with an empty store");
			Ok(MemoryStore::new())
		}
	}
}

async fn run_sync(config: ExplorerConfig) -> Result<(), ExplorerError> {
	info!("Starting explorer sync against {}", config.rpc_url);

	let memory_store = Arc::new(load_store(&SnapshotRepository::new(config.data_dir.clone())).await?);
	let store: Arc<dyn ExplorerStore> = memory_store.clone();

	let client = HttpChainClient::new(config.rpc_url.clone(), config.rpc_timeout())?;
	let fetcher = RecordFetcher::new(Arc::new(client), config.fetch_retry());
	let flattener = TransactionFlattener::new(Arc::new(ChecksumAccountIdResolver::new(
		config.account_prefix.clone(),
	)));
	let ingestor = BlockIngestor::new(fetcher, flattener, store.clone());
	let retry_tracker = FailureRetryTracker::new(store.clone(), config.retry_policy());

	let snapshots = Arc::new(SnapshotTask::new(
		memory_store,
		SnapshotRepository::new(config.data_dir.clone()),
		Duration::from_secs(config.snapshot_interval_secs),
	));

	let tasks: Vec<Arc<dyn SyncTask>> = vec![
		Arc::new(NewBlockSync::new(
			ingestor.clone(),
			retry_tracker.clone(),
			store.clone(),
			config.start_height,
			config.block_batch_size,
			Duration::from_secs(config.block_interval_secs),
		)),
		Arc::new(FailedBlockSync::new(
			ingestor.clone(),
			retry_tracker,
			config.block_batch_size,
			Duration::from_secs(config.retry_interval_secs),
		)),
		Arc::new(TransactionSync::new(
			ingestor,
			store.clone(),
			config.tx_batch_size,
			config.retry_max_attempts,
			Duration::from_secs(config.tx_interval_secs),
		)),
		Arc::new(GasAggregateSync::new(
			store.clone(),
			config.gas_batch_size,
			Duration::from_secs(config.gas_interval_secs),
		)),
		Arc::new(AccountSync::new(
			store.clone(),
			config.account_batch_size,
			Duration::from_secs(config.account_interval_secs),
		)),
		snapshots.clone(),
	];

	let group = JobGroup::start(tasks, FailureBackoff::default());
	let stop = group.stop_signal();

	if let Err(e) = tokio::signal::ctrl_c().await {
		warn!("Failed to listen for Ctrl-C, stopping now: {}", e);
	}
	info!("Shutdown requested, waiting for jobs to finish their current cycle");
	stop.stop();

	let abnormal = group.wait().await;
	if !abnormal.is_empty() {
		warn!("Jobs ended abnormally: {:?}", abnormal);
	}

	if let Err(e) = snapshots.save_now().await {
		error!("Failed to write final snapshot: {}", e);
	}
	info!(
		"Store holds {} blocks and {} transaction records",
		store.count_blocks().await?,
		store.count_flat_transactions().await?
	);

	info!("Explorer sync stopped");
	Ok(())
}

async fn print_blocks(
	config: ExplorerConfig,
	page: usize,
	page_size: usize,
) -> Result<(), ExplorerError> {
	let store = load_store(&SnapshotRepository::new(config.data_dir)).await?;
	let summaries = list_blocks(&store, page, page_size, chrono::Utc::now()).await?;
	info!(
		"Page {} holds {} of {} stored blocks",
		page,
		summaries.len(),
		store.count_blocks().await?
	);

	let output = serde_json::to_string_pretty(&summaries)
		.map_err(|e| ExplorerError::MalformedPayload(format!("Failed to render blocks: {}", e)))?;
	println!("{}", output);
	Ok(())
}
