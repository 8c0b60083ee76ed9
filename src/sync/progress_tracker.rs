//! Progress tracking for sync cycles.
//!
//! A `SyncProgressTracker` lives for one cycle of one job. It records which units (block heights,
//! queue entries, transaction sequence numbers) were processed, failed or were missing upstream,
//! and produces the `SyncStats` a cycle reports back to the scheduler.

use std::collections::BTreeSet;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct SyncProgressTracker {
	job: &'static str,
	/// The highest unit we've processed successfully
	highest_processed: Option<i64>,
	/// Every unit processed successfully this cycle
	processed_units: BTreeSet<i64>,
	failed_units: Vec<i64>,
	not_found_units: Vec<i64>,
}

impl SyncProgressTracker {
	pub fn new(job: &'static str) -> Self {
		Self {
			job,
			highest_processed: None,
			processed_units: BTreeSet::new(),
			failed_units: Vec::new(),
			not_found_units: Vec::new(),
		}
	}

	pub fn record_processed(&mut self, unit: i64) {
		self.highest_processed = Some(self.highest_processed.map_or(unit, |h| h.max(unit)));
		self.processed_units.insert(unit);
	}

	pub fn record_failed(&mut self, unit: i64) {
		self.failed_units.push(unit);
	}

	pub fn record_not_found(&mut self, unit: i64) {
		self.not_found_units.push(unit);
	}

	/// Ranges between consecutive processed units that were skipped.
	///
	/// Returns (before, after) pairs around each hole.
	pub fn check_for_gaps(&self) -> Vec<(i64, i64)> {
		let sorted: Vec<i64> = self.processed_units.iter().copied().collect();

		sorted
			.windows(2)
			.filter(|window| window[1] - window[0] > 1)
			.map(|window| (window[0], window[1]))
			.collect()
	}

	pub fn get_stats(&self) -> SyncStats {
		SyncStats {
			job: self.job,
			processed: self.processed_units.len(),
			failed: self.failed_units.len(),
			not_found: self.not_found_units.len(),
			highest_processed: self.highest_processed,
			gaps: self.check_for_gaps(),
		}
	}

	/// Warn about every hole left in a contiguous range of units.
	pub fn warn_gaps(&self) {
		for (start, end) in self.check_for_gaps() {
			warn!(
				"{}: units between {} and {} were not processed this cycle",
				self.job, start, end
			);
		}
	}
}

/// Outcome of one sync cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStats {
	pub job: &'static str,
	pub processed: usize,
	pub failed: usize,
	pub not_found: usize,
	pub highest_processed: Option<i64>,
	pub gaps: Vec<(i64, i64)>,
}

impl SyncStats {
	pub fn is_idle(&self) -> bool {
		self.processed == 0 && self.failed == 0 && self.not_found == 0
	}

	/// Get a human-readable summary of the cycle
	pub fn summary(&self) -> String {
		format!(
			"{}: {} processed, {} failed, {} not found{}{}",
			self.job,
			self.processed,
			self.failed,
			self.not_found,
			match self.highest_processed {
				Some(highest) => format!(", up to {}", highest),
				None => String::new(),
			},
			if self.gaps.is_empty() {
				String::new()
			} else {
				format!(" ({} gaps)", self.gaps.len())
			}
		)
	}
}
