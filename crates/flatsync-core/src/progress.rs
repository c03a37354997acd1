//! Progress snapshots and the sink they are delivered to.
//!
//! A run emits one snapshot per committed batch and exactly one terminal
//! snapshot. Snapshots are plain values; whoever needs history keeps it
//! themselves (see [`SharedProgress`] for the common "latest snapshot"
//! holder a front-end polls).

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Lifecycle state of a run, as seen through its snapshots.
///
/// Transitions `Processing -> Completed` or `Processing -> Error` exactly
/// once, at the end of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    /// Batches are still being committed
    Processing,

    /// The run finished; `processed_rows == total_rows`
    Completed,

    /// The run aborted; the snapshot carries the error message
    Error,
}

/// Point-in-time view of a running import or export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressInfo {
    /// Total rows the run will process; 0 while a streaming run has not
    /// reached end of input
    pub total_rows: u64,

    /// Rows processed so far; only ever increases within a run
    pub processed_rows: u64,

    /// Rounded percentage; 0 while the total is unknown
    pub percentage: u8,

    /// Run status
    pub status: ProgressStatus,

    /// Error message, present only on `Error` snapshots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressInfo {
    /// Snapshot of a run mid-flight.
    pub fn processing(total_rows: u64, processed_rows: u64) -> Self {
        Self {
            total_rows,
            processed_rows,
            percentage: percentage(processed_rows, total_rows),
            status: ProgressStatus::Processing,
            error: None,
        }
    }

    /// Terminal snapshot of a successful run.
    pub fn completed(total_rows: u64) -> Self {
        Self {
            total_rows,
            processed_rows: total_rows,
            percentage: 100,
            status: ProgressStatus::Completed,
            error: None,
        }
    }

    /// Terminal snapshot of an aborted run.
    pub fn failed(total_rows: u64, processed_rows: u64, error: impl Into<String>) -> Self {
        Self {
            total_rows,
            processed_rows,
            percentage: percentage(processed_rows, total_rows),
            status: ProgressStatus::Error,
            error: Some(error.into()),
        }
    }
}

fn percentage(processed: u64, total: u64) -> u8 {
    if total == 0 {
        0
    } else {
        ((processed as f64 / total as f64) * 100.0).round() as u8
    }
}

/// Receiver for progress snapshots.
///
/// Called synchronously from the run, once per committed batch plus once at
/// the end. Implementations should return quickly; there is no coalescing or
/// rate limiting on the emitting side.
pub trait ProgressSink: Send + Sync {
    /// Deliver one snapshot.
    fn report(&self, progress: &ProgressInfo);
}

/// Any `Fn(&ProgressInfo)` closure is a sink.
impl<F> ProgressSink for F
where
    F: Fn(&ProgressInfo) + Send + Sync,
{
    fn report(&self, progress: &ProgressInfo) {
        self(progress)
    }
}

/// Sink that discards every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn report(&self, _progress: &ProgressInfo) {}
}

/// Sink that retains the latest snapshot for polling.
///
/// Clone it, hand one handle to the run as its sink, and poll the other from
/// the front-end. This keeps operation registries out of the engine while
/// still supporting live status displays.
#[derive(Debug, Clone, Default)]
pub struct SharedProgress {
    latest: Arc<Mutex<Option<ProgressInfo>>>,
}

impl SharedProgress {
    /// Create an empty holder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent snapshot, if any has been reported yet.
    pub fn latest(&self) -> Option<ProgressInfo> {
        match self.latest.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ProgressSink for SharedProgress {
    fn report(&self, progress: &ProgressInfo) {
        let mut guard = match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(progress.clone());
    }
}
