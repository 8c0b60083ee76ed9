//! Command line and environment configuration

use crate::explorer::fetcher::FetchRetryConfig;
use crate::explorer::retry_tracker::RetryPolicy;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
	name = "explorer-sync",
	version,
	about = "Blockchain explorer ingestion service",
	long_about = "Follows a node's irreversible head, flattens transactions into per-action \
	              records and keeps block summaries, gas statistics and account activity current."
)]
pub struct Cli {
	#[command(flatten)]
	pub config: ExplorerConfig,

	#[command(subcommand)]
	pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Run every sync job until interrupted (default)
	Sync,

	/// Print a page of block summaries from the persisted snapshot as JSON
	Blocks {
		#[arg(long, default_value_t = 1)]
		page: usize,

		#[arg(long, default_value_t = 20)]
		page_size: usize,
	},
}

#[derive(Debug, Clone, Args)]
pub struct ExplorerConfig {
	/// Base URL of the node's HTTP gateway
	#[arg(long, env = "EXPLORER_RPC_URL", default_value = "http://127.0.0.1:30001")]
	pub rpc_url: String,

	#[arg(long, env = "EXPLORER_RPC_TIMEOUT_SECS", default_value_t = 10)]
	pub rpc_timeout_secs: u64,

	/// Directory holding the store snapshot
	#[arg(long, env = "EXPLORER_DATA_DIR", default_value = "./data")]
	pub data_dir: PathBuf,

	/// First height to ingest when no cursor has been persisted yet
	#[arg(long, env = "EXPLORER_START_HEIGHT", default_value_t = 0)]
	pub start_height: i64,

	#[arg(long, env = "EXPLORER_BLOCK_BATCH_SIZE", default_value_t = 20)]
	pub block_batch_size: usize,

	#[arg(long, env = "EXPLORER_TX_BATCH_SIZE", default_value_t = 100)]
	pub tx_batch_size: usize,

	#[arg(long, env = "EXPLORER_GAS_BATCH_SIZE", default_value_t = 100)]
	pub gas_batch_size: usize,

	#[arg(long, env = "EXPLORER_ACCOUNT_BATCH_SIZE", default_value_t = 500)]
	pub account_batch_size: usize,

	#[arg(long, env = "EXPLORER_BLOCK_INTERVAL_SECS", default_value_t = 1)]
	pub block_interval_secs: u64,

	#[arg(long, env = "EXPLORER_RETRY_INTERVAL_SECS", default_value_t = 10)]
	pub retry_interval_secs: u64,

	#[arg(long, env = "EXPLORER_TX_INTERVAL_SECS", default_value_t = 5)]
	pub tx_interval_secs: u64,

	#[arg(long, env = "EXPLORER_GAS_INTERVAL_SECS", default_value_t = 5)]
	pub gas_interval_secs: u64,

	#[arg(long, env = "EXPLORER_ACCOUNT_INTERVAL_SECS", default_value_t = 5)]
	pub account_interval_secs: u64,

	#[arg(long, env = "EXPLORER_SNAPSHOT_INTERVAL_SECS", default_value_t = 60)]
	pub snapshot_interval_secs: u64,

	/// Attempts per failed height (and per pending transaction) before giving up
	#[arg(long, env = "EXPLORER_RETRY_MAX_ATTEMPTS", default_value_t = 10)]
	pub retry_max_attempts: u32,

	#[arg(long, env = "EXPLORER_RETRY_BASE_DELAY_SECS", default_value_t = 5)]
	pub retry_base_delay_secs: u64,

	#[arg(long, env = "EXPLORER_RETRY_MAX_DELAY_SECS", default_value_t = 600)]
	pub retry_max_delay_secs: u64,

	/// Prefix of derived account identifiers
	#[arg(long, env = "EXPLORER_ACCOUNT_PREFIX", default_value = "IOST")]
	pub account_prefix: String,
}

impl ExplorerConfig {
	pub fn rpc_timeout(&self) -> Duration {
		Duration::from_secs(self.rpc_timeout_secs)
	}

	pub fn retry_policy(&self) -> RetryPolicy {
		RetryPolicy {
			max_attempts: self.retry_max_attempts.max(1),
			base_delay: Duration::from_secs(self.retry_base_delay_secs),
			max_delay: Duration::from_secs(self.retry_max_delay_secs),
		}
	}

	pub fn fetch_retry(&self) -> FetchRetryConfig {
		FetchRetryConfig {
			max_elapsed_time: self.rpc_timeout(),
			..FetchRetryConfig::default()
		}
	}
}
