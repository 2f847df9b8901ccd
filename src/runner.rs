//! Concurrent task execution
//!
//! Each submitted task runs as its own tokio task, so one stalled
//! measurement never blocks another. Outcomes are delivered over a channel
//! rather than a direct return, and every run carries a cancellation token
//! the caller can trip through its [`RunHandle`].

use crate::config::ProbeConfig;
use crate::context::{Clock, DeviceIdentity, RunContext, StaticDevice, SystemClock};
use crate::error::Result;
use crate::progress::{ProgressSink, ProgressUpdate};
use crate::report::MeasurementResult;
use crate::task::MeasurementTask;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Outcome of one task run, delivered on the runner's channel
#[derive(Debug)]
pub struct RunOutcome {
    /// Scheduler key of the task, when assigned
    pub task_key: Option<String>,
    /// Task type that ran
    pub task_type: String,
    /// The classified result of the run
    pub outcome: Result<MeasurementResult>,
}

/// Handle to one in-flight run
pub struct RunHandle {
    task_key: Option<String>,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl RunHandle {
    /// Scheduler key of the task, when assigned
    pub fn task_key(&self) -> Option<&str> {
        self.task_key.as_deref()
    }

    /// Trip the run's cancellation token
    ///
    /// The run observes it at its next suspension point and terminates with
    /// a cancelled error; the outcome is still delivered on the channel.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the spawned run has finished
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Spawns measurement runs and collects their outcomes
///
/// The runner owns the shared collaborators (config, progress sink, clock,
/// device identity); each submission gets its own context and cancellation
/// token built from them.
pub struct TaskRunner {
    config: ProbeConfig,
    progress: ProgressSink,
    clock: Arc<dyn Clock>,
    device: Arc<dyn DeviceIdentity>,
    outcome_tx: mpsc::UnboundedSender<RunOutcome>,
}

impl TaskRunner {
    /// Create a runner and the receiving half of its outcome channel
    pub fn new(config: ProbeConfig) -> (Self, mpsc::UnboundedReceiver<RunOutcome>) {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let runner = Self {
            config,
            progress: ProgressSink::default(),
            clock: Arc::new(SystemClock),
            device: Arc::new(StaticDevice::default()),
            outcome_tx,
        };
        (runner, outcome_rx)
    }

    /// Replace the clock used to stamp results
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the device identity recorded in results
    pub fn with_device(mut self, device: Arc<dyn DeviceIdentity>) -> Self {
        self.device = device;
        self
    }

    /// Subscribe to progress updates from every run this runner spawns
    pub fn subscribe_progress(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.progress.subscribe()
    }

    /// Spawn one run of the given task
    ///
    /// Returns immediately; the outcome arrives on the channel returned by
    /// [`TaskRunner::new`]. A send into a dropped receiver is discarded.
    pub fn submit(&self, task: Box<dyn MeasurementTask>) -> RunHandle {
        let cancel = CancellationToken::new();
        let ctx = RunContext {
            config: self.config.clone(),
            progress: self.progress.clone(),
            clock: Arc::clone(&self.clock),
            device: Arc::clone(&self.device),
            cancel: cancel.clone(),
        };
        let task_key = task.schedule().key.clone();
        let outcome_tx = self.outcome_tx.clone();

        let join = tokio::spawn({
            let task_key = task_key.clone();
            async move {
                info!(
                    task_type = task.type_name(),
                    key = task_key.as_deref().unwrap_or("-"),
                    "measurement run started"
                );
                let outcome = task.execute(&ctx).await;
                outcome_tx
                    .send(RunOutcome {
                        task_key,
                        task_type: task.type_name().to_string(),
                        outcome,
                    })
                    .ok();
            }
        });

        RunHandle {
            task_key,
            cancel,
            join,
        }
    }
}
