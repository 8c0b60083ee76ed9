//! Failure bookkeeping for block heights.
//!
//! A height gets a `SyncFailure` marker when an ingest attempt fails and loses it once an attempt
//! fully succeeds. Retries are spaced with exponential backoff and stop after `max_attempts`, or
//! immediately for causes that cannot improve; the exhausted marker is kept so operators can see
//! which heights were given up on.

use crate::explorer::store::ExplorerStore;
use crate::explorer::types::*;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 10,
			base_delay: Duration::from_secs(5),
			max_delay: Duration::from_secs(600),
		}
	}
}

impl RetryPolicy {
	/// Wait before the next attempt after `attempts` failures.
	pub fn delay_for(&self, attempts: u32) -> Duration {
		let factor = 2u32.saturating_pow(attempts.saturating_sub(1));
		self.base_delay.saturating_mul(factor).min(self.max_delay)
	}
}

/// `now + delay`, saturating at the latest representable time.
fn schedule_after(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
	chrono::Duration::from_std(delay)
		.ok()
		.and_then(|delay| now.checked_add_signed(delay))
		.unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[derive(Clone)]
pub struct FailureRetryTracker {
	store: Arc<dyn ExplorerStore>,
	policy: RetryPolicy,
}

impl FailureRetryTracker {
	pub fn new(store: Arc<dyn ExplorerStore>, policy: RetryPolicy) -> Self {
		Self { store, policy }
	}

	/// Record a failed attempt at `height` and schedule the next one.
	pub async fn record_failure(
		&self,
		height: i64,
		cause: &ExplorerError,
		now: DateTime<Utc>,
	) -> Result<SyncFailure, ExplorerError> {
		let attempts = self
			.store
			.get_sync_failure(height)
			.await?
			.map(|failure| failure.attempts)
			.unwrap_or(0)
			+ 1;

		let delay = self.policy.delay_for(attempts);
		let exhausted = attempts >= self.policy.max_attempts || !cause.is_retryable();
		let failure = SyncFailure {
			height,
			attempts,
			last_error: cause.to_string(),
			next_attempt_at: schedule_after(now, delay),
			exhausted,
		};

		if exhausted {
			error!(
				"Giving up on block {} after {} attempts: {}",
				height, attempts, cause
			);
		} else {
			warn!(
				"Block {} failed (attempt {}), retrying in {:?}: {}",
				height, attempts, delay, cause
			);
		}

		self.store.record_sync_failure(failure.clone()).await?;
		Ok(failure)
	}

	pub async fn record_success(&self, height: i64) -> Result<(), ExplorerError> {
		self.store.clear_sync_failure(height).await
	}

	/// Non-exhausted failures whose next attempt is due, lowest height first.
	pub async fn due_failures(
		&self,
		now: DateTime<Utc>,
		limit: usize,
	) -> Result<Vec<SyncFailure>, ExplorerError> {
		let mut due: Vec<SyncFailure> = self
			.store
			.list_pending_failures()
			.await?
			.into_iter()
			.filter(|failure| !failure.exhausted && failure.next_attempt_at <= now)
			.collect();
		due.sort_by_key(|failure| failure.height);
		due.truncate(limit);
		Ok(due)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::explorer::store::MemoryStore;

	fn tracker(max_attempts: u32) -> (Arc<MemoryStore>, FailureRetryTracker) {
		let store = Arc::new(MemoryStore::new());
		let tracker = FailureRetryTracker::new(
			store.clone(),
			RetryPolicy {
				max_attempts,
				base_delay: Duration::from_secs(10),
				max_delay: Duration::from_secs(60),
			},
		);
		(store, tracker)
	}

	#[test]
	fn test_delay_doubles_and_caps() {
		let policy = RetryPolicy {
			max_attempts: 5,
			base_delay: Duration::from_secs(10),
			max_delay: Duration::from_secs(60),
		};
		assert_eq!(policy.delay_for(1), Duration::from_secs(10));
		assert_eq!(policy.delay_for(2), Duration::from_secs(20));
		assert_eq!(policy.delay_for(3), Duration::from_secs(40));
		assert_eq!(policy.delay_for(4), Duration::from_secs(60));
		assert_eq!(policy.delay_for(40), Duration::from_secs(60));
	}

	#[tokio::test]
	async fn test_failure_then_success_clears_marker() {
		let (store, tracker) = tracker(3);
		let now = Utc::now();
		let cause = ExplorerError::TransientRpc("timeout".to_string());

		tracker.record_failure(100, &cause, now).await.expect("record");
		assert_eq!(store.list_pending_failures().await.expect("list").len(), 1);

		tracker.record_success(100).await.expect("clear");
		assert!(store.list_pending_failures().await.expect("list").is_empty());
	}

	#[tokio::test]
	async fn test_due_failures_respect_schedule_and_budget() {
		let (_store, tracker) = tracker(2);
		let now = Utc::now();
		let cause = ExplorerError::Persistence("disk".to_string());

		tracker.record_failure(7, &cause, now).await.expect("record");
		assert!(tracker.due_failures(now, 10).await.expect("due").is_empty());

		let later = now + chrono::Duration::seconds(11);
		let due = tracker.due_failures(later, 10).await.expect("due");
		assert_eq!(due.len(), 1);
		assert_eq!(due[0].attempts, 1);

		let second = tracker.record_failure(7, &cause, later).await.expect("record");
		assert!(second.exhausted);
		let much_later = later + chrono::Duration::hours(1);
		assert!(tracker.due_failures(much_later, 10).await.expect("due").is_empty());
	}

	#[tokio::test]
	async fn test_permanent_cause_is_not_retried() {
		let (_store, tracker) = tracker(5);
		let cause = ExplorerError::MalformedPayload("bad block".to_string());

		let failure = tracker.record_failure(3, &cause, Utc::now()).await.expect("record");

		assert!(failure.exhausted);
		assert_eq!(failure.attempts, 1);
	}

	#[tokio::test]
	async fn test_huge_delay_saturates_schedule() {
		let store = Arc::new(MemoryStore::new());
		let cause = ExplorerError::TransientRpc("timeout".to_string());
		let now = Utc::now();

		for secs in [u64::MAX, 10_000_000_000_000] {
			let tracker = FailureRetryTracker::new(
				store.clone(),
				RetryPolicy {
					max_attempts: 5,
					base_delay: Duration::from_secs(secs),
					max_delay: Duration::from_secs(secs),
				},
			);
			let failure = tracker.record_failure(1, &cause, now).await.expect("record");
			assert_eq!(failure.next_attempt_at, DateTime::<Utc>::MAX_UTC);
			tracker.record_success(1).await.expect("clear");
		}

		assert_eq!(
			schedule_after(now, Duration::from_secs(60)),
			now + chrono::Duration::seconds(60)
		);
	}
}
