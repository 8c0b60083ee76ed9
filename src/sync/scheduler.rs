//! Job scheduling for the sync service.
//!
//! Every concern (new blocks, failed blocks, transactions, gas aggregates, accounts) is a
//! `SyncTask`: a name, a cadence and a `run_once` cycle. `JobGroup` runs each task on its own tokio
//! task, strictly one cycle at a time, and owns the stop broadcast plus the join point used for
//! orderly shutdown. A failing or panicking cycle only affects its own job, which backs off
//! exponentially until a cycle succeeds again.

use crate::explorer::ExplorerError;
use crate::sync::progress_tracker::SyncStats;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Error returned by a sync cycle
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	#[error("Explorer error: {0}")]
	Explorer(#[from] ExplorerError),

	#[error("Cycle panicked: {0}")]
	Panicked(String),
}

/// One independently paced, indefinitely repeating sync concern.
#[async_trait::async_trait]
pub trait SyncTask: Send + Sync {
	fn name(&self) -> &'static str;

	/// Pause between two successful cycles.
	fn cadence(&self) -> Duration;

	/// Execute a single cycle.
	async fn run_once(&self) -> Result<SyncStats, SyncError>;
}

/// Delay policy applied after consecutive failed cycles.
#[derive(Debug, Clone)]
pub struct FailureBackoff {
	pub initial_interval: Duration,
	pub max_interval: Duration,
}

impl Default for FailureBackoff {
	fn default() -> Self {
		Self {
			initial_interval: Duration::from_secs(1),
			max_interval: Duration::from_secs(300),
		}
	}
}

impl FailureBackoff {
	fn build(&self) -> ExponentialBackoff {
		ExponentialBackoffBuilder::new()
			.with_initial_interval(self.initial_interval)
			.with_max_interval(self.max_interval)
			.with_max_elapsed_time(None)
			.build()
	}
}

/// Broadcasts the stop request to every job of a group.
#[derive(Clone)]
pub struct StopSignal {
	sender: Arc<watch::Sender<bool>>,
}

impl StopSignal {
	pub fn stop(&self) {
		self.sender.send_replace(true);
	}
}

/// Supervisor holding one handle per running job.
pub struct JobGroup {
	stop: StopSignal,
	handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl JobGroup {
	/// Launch every task; each starts its first cycle immediately.
	pub fn start(tasks: Vec<Arc<dyn SyncTask>>, failure_backoff: FailureBackoff) -> Self {
		let (sender, receiver) = watch::channel(false);

		let handles = tasks
			.into_iter()
			.map(|task| {
				let name = task.name();
				let handle = tokio::spawn(run_job(
					task,
					receiver.clone(),
					failure_backoff.clone(),
				));
				(name, handle)
			})
			.collect();

		Self {
			stop: StopSignal {
				sender: Arc::new(sender),
			},
			handles,
		}
	}

	pub fn stop_signal(&self) -> StopSignal {
		self.stop.clone()
	}

	/// Block until every job has exited.
	///
	/// Returns the names of jobs that ended abnormally.
	pub async fn wait(self) -> Vec<&'static str> {
		let mut abnormal = Vec::new();
		for (name, handle) in self.handles {
			if let Err(e) = handle.await {
				error!("Job {} terminated abnormally: {}", name, e);
				abnormal.push(name);
			}
		}
		abnormal
	}
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
	if let Some(message) = panic.downcast_ref::<&str>() {
		message.to_string()
	} else if let Some(message) = panic.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic payload".to_string()
	}
}

async fn run_job(
	task: Arc<dyn SyncTask>,
	mut stop: watch::Receiver<bool>,
	failure_backoff: FailureBackoff,
) {
	let name = task.name();
	let mut backoff = failure_backoff.build();
	info!("Starting job {} (every {:?})", name, task.cadence());

	loop {
		if *stop.borrow() {
			break;
		}

		let outcome = AssertUnwindSafe(task.run_once())
			.catch_unwind()
			.await
			.unwrap_or_else(|panic| Err(SyncError::Panicked(panic_message(panic))));

		let delay = match outcome {
			Ok(stats) => {
				backoff.reset();
				if stats.is_idle() {
					debug!("{}", stats.summary());
				} else {
					info!("{}", stats.summary());
				}
				task.cadence()
			}
			Err(e) => {
				let delay = backoff
					.next_backoff()
					.unwrap_or(failure_backoff.max_interval);
				match e {
					SyncError::Panicked(_) => {
						error!("Job {} cycle panicked, next attempt in {:?}: {}", name, delay, e)
					}
					SyncError::Explorer(_) => {
						warn!("Job {} cycle failed, next attempt in {:?}: {}", name, delay, e)
					}
				}
				delay
			}
		};

		tokio::select! {
			_ = tokio::time::sleep(delay) => {}
			changed = stop.changed() => {
				if changed.is_err() {
					break;
				}
			}
		}
	}

	info!("Job {} stopped", name);
}
