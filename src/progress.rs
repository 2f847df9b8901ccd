//! Best-effort progress reporting
//!
//! Progress is telemetry for an observer, never control flow. The sink wraps
//! a drop-tolerant broadcast channel: a send with no subscribers, or into a
//! full buffer, is discarded without affecting the run. Nothing flows back
//! from the sink to the executor: no acknowledgment, no backpressure.

use tokio::sync::broadcast;

/// Default buffer capacity for the progress channel
const DEFAULT_CAPACITY: usize = 64;

/// A progress notification from one measurement run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Scheduler key of the task, when assigned
    pub task_key: Option<String>,
    /// Percent complete, already clamped to the configured ceiling
    pub percent: u32,
}

/// Drop-tolerant sender half of the progress channel
///
/// Clones share the same channel, so a single subscriber observes every run
/// the host submits.
#[derive(Clone, Debug)]
pub struct ProgressSink {
    tx: broadcast::Sender<ProgressUpdate>,
}

impl ProgressSink {
    /// Create a sink whose channel buffers up to `capacity` updates
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to progress updates
    ///
    /// Slow subscribers lag and miss updates rather than slowing the run.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.tx.subscribe()
    }

    /// Push one update, fire-and-forget
    pub fn report(&self, task_key: Option<&str>, percent: u32) {
        self.tx
            .send(ProgressUpdate {
                task_key: task_key.map(str::to_string),
                percent,
            })
            .ok();
    }
}

impl Default for ProgressSink {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
