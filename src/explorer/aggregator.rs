//! Block aggregation.
//!
//! Combines an already-fetched block with independently computed side data (its transaction
//! hashes and gas statistics) into a display-ready `BlockSummary`. Nothing here talks to the chain.

use crate::explorer::store::ExplorerStore;
use crate::explorer::types::*;
use crate::utils::{format_age, format_utc_time};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Correction applied to raw block time to compensate for the node reporting it in the wrong unit.
pub const BLOCK_TIME_SCALE: i64 = 3;

/// Build the summary of one block.
///
/// Absent gas stats are reported as zero.
pub fn summarize(
	block: &RawBlock,
	tx_hashes: Vec<String>,
	gas_stats: Option<GasStats>,
	now: DateTime<Utc>,
) -> BlockSummary {
	let timestamp = block.time.saturating_mul(BLOCK_TIME_SCALE);

	let gas_stats = gas_stats.unwrap_or_else(|| {
		debug!("Gas stats for block {} not computed yet", block.height);
		GasStats::default()
	});

	BlockSummary {
		height: block.height,
		parent_hash: block.parent_hash.clone(),
		block_hash: block.hash.clone(),
		witness: block.witness.clone(),
		age: format_age(timestamp, now),
		utc_time_text: format_utc_time(timestamp),
		timestamp,
		tx_hashes,
		total_gas_limit: gas_stats.total_gas_limit,
		avg_gas_price: gas_stats.avg_gas_price,
	}
}

/// Gas aggregate over the distinct transactions among `records`.
pub fn compute_gas_stats(records: &[FlatTransactionRecord]) -> GasStats {
	let per_tx: Vec<(i64, i64)> = records
		.iter()
		.unique_by(|record| record.hash.clone())
		.map(|record| (record.gas_limit, record.gas_price))
		.collect();

	if per_tx.is_empty() {
		return GasStats::default();
	}

	let total_gas_limit = per_tx.iter().map(|(limit, _)| *limit).sum();
	let total_gas_price: f64 = per_tx.iter().map(|(_, price)| *price as f64).sum();

	GasStats {
		total_gas_limit,
		avg_gas_price: total_gas_price / per_tx.len() as f64,
	}
}

/// One page of block summaries, newest first. Pages start at 1.
///
/// Missing side data for a block is logged and left empty; it never fails the page.
pub async fn list_blocks(
	store: &dyn ExplorerStore,
	page: usize,
	page_size: usize,
	now: DateTime<Utc>,
) -> Result<Vec<BlockSummary>, ExplorerError> {
	let offset = page.max(1).saturating_sub(1).saturating_mul(page_size);
	let blocks = store.get_block_page(offset, page_size).await?;

	let heights: Vec<i64> = blocks.iter().map(|block| block.height).collect();
	let gas_by_height = store
		.get_gas_stats_by_heights(&heights)
		.await
		.unwrap_or_else(|e| {
			warn!("Failed to load gas stats for blocks {:?}: {}", heights, e);
			HashMap::new()
		});

	let mut summaries = Vec::with_capacity(blocks.len());
	for block in &blocks {
		let tx_hashes = store
			.get_tx_hashes_for_block(block.height)
			.await
			.unwrap_or_else(|e| {
				warn!("Failed to load transactions of block {}: {}", block.height, e);
				Vec::new()
			});

		summaries.push(summarize(
			block,
			tx_hashes,
			gas_by_height.get(&block.height).copied(),
			now,
		));
	}

	Ok(summaries)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::explorer::store::MemoryStore;
	use crate::testing::{FailingStore, flat_record};

	fn block(height: i64, time: i64) -> RawBlock {
		RawBlock {
			height,
			parent_hash: "parent".to_string(),
			hash: format!("block-{}", height),
			witness: "producer".to_string(),
			time,
		}
	}

	#[test]
	fn test_timestamp_is_scaled_exactly_once() {
		let now = DateTime::<Utc>::from_timestamp(10_000, 0).expect("time");
		let summary = summarize(&block(1, 1_000), vec![], None, now);

		assert_eq!(summary.timestamp, 3_000);
		assert_eq!(summary.utc_time_text, format_utc_time(3_000));
		assert_eq!(summary.age, format_age(3_000, now));
	}

	#[test]
	fn test_missing_gas_stats_report_zero() {
		let now = Utc::now();
		let summary = summarize(&block(1, 1), vec!["tx".to_string()], None, now);

		assert_eq!(summary.total_gas_limit, 0);
		assert_eq!(summary.avg_gas_price, 0.0);
		assert_eq!(summary.tx_hashes, vec!["tx".to_string()]);
	}

	#[test]
	fn test_gas_stats_count_each_transaction_once() {
		let mut a0 = flat_record("a", 1, 0);
		a0.gas_limit = 100;
		a0.gas_price = 2;
		let mut a1 = a0.clone();
		a1.action_index = 1;
		let mut b0 = flat_record("b", 1, 0);
		b0.gas_limit = 300;
		b0.gas_price = 5;

		let stats = compute_gas_stats(&[a0, a1, b0]);

		assert_eq!(stats.total_gas_limit, 400);
		assert_eq!(stats.avg_gas_price, 3.5);
		assert_eq!(compute_gas_stats(&[]), GasStats::default());
	}

	#[tokio::test]
	async fn test_list_blocks_pages_and_enriches() {
		let store = MemoryStore::new();
		for height in 1..=3 {
			store.upsert_block(block(height, height), &[]).await.expect("block");
		}
		store
			.upsert_flat_transactions(2, "tx", vec![flat_record("tx", 2, 0)])
			.await
			.expect("tx");
		store
			.upsert_gas_stats(
				2,
				GasStats {
					total_gas_limit: 10,
					avg_gas_price: 1.0,
				},
				0,
			)
			.await
			.expect("gas");

		let first = list_blocks(&store, 1, 2, Utc::now()).await.expect("page 1");
		let second = list_blocks(&store, 2, 2, Utc::now()).await.expect("page 2");

		assert_eq!(first.iter().map(|s| s.height).collect::<Vec<_>>(), vec![3, 2]);
		assert_eq!(second.iter().map(|s| s.height).collect::<Vec<_>>(), vec![1]);
		assert_eq!(first[1].tx_hashes, vec!["tx".to_string()]);
		assert_eq!(first[1].total_gas_limit, 10);
		assert_eq!(first[0].total_gas_limit, 0);
	}

	#[tokio::test]
	async fn test_list_blocks_survives_failed_enrichment_reads() {
		let store = FailingStore::default();
		for height in 1..=2 {
			store
				.upsert_block(block(height, height), &["tx".to_string()])
				.await
				.expect("block");
		}
		store
			.upsert_flat_transactions(2, "tx", vec![flat_record("tx", 2, 0)])
			.await
			.expect("tx");
		store
			.upsert_gas_stats(
				2,
				GasStats {
					total_gas_limit: 10,
					avg_gas_price: 1.0,
				},
				0,
			)
			.await
			.expect("gas");
		store.fail_read("get_gas_stats_by_heights");
		store.fail_read("get_tx_hashes_for_block");

		let page = list_blocks(&store, 1, 20, Utc::now()).await.expect("page");

		assert_eq!(page.iter().map(|s| s.height).collect::<Vec<_>>(), vec![2, 1]);
		assert!(page.iter().all(|s| s.tx_hashes.is_empty()));
		assert!(page.iter().all(|s| s.total_gas_limit == 0 && s.avg_gas_price == 0.0));
	}

	#[tokio::test]
	async fn test_list_blocks_fails_when_blocks_cannot_be_read() {
		let store = FailingStore::default();
		store.upsert_block(block(1, 1), &[]).await.expect("block");
		store.fail_read("get_block_page");

		assert!(matches!(
			list_blocks(&store, 1, 20, Utc::now()).await,
			Err(ExplorerError::Persistence(_))
		));
	}
}

