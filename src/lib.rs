//! # netprobe
//!
//! Network measurement task library.
//!
//! netprobe runs single-shot HTTP measurements: one request against a
//! caller-supplied URL, method, header block and body, with wall-clock
//! latency timing, a size-bounded capture of the response, and best-effort
//! progress reporting. It is built to sit underneath an external scheduler
//! that fires tasks on a timer and ships the structured results elsewhere.
//!
//! ## Design Philosophy
//!
//! netprobe is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Progress is a drop-tolerant broadcast, no polling required
//! - **Explicitly configured** - Size caps and sentinels are plain config, overridable per test
//! - **Single-attempt** - No retries, no redirects; the caller owns backoff policy
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::collections::HashMap;
//! use netprobe::{HttpDesc, HttpTask, ProbeConfig, TaskRunner, TaskSchedule};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let params = HashMap::from([
//!         ("url".to_string(), "example.com".to_string()),
//!         ("method".to_string(), "get".to_string()),
//!     ]);
//!     let desc = HttpDesc::parse(TaskSchedule::default(), Some(&params))?;
//!     let task = HttpTask::new(desc)?;
//!
//!     let (runner, mut outcomes) = TaskRunner::new(ProbeConfig::default());
//!
//!     // Subscribe to progress updates
//!     let mut progress = runner.subscribe_progress();
//!     tokio::spawn(async move {
//!         while let Ok(update) = progress.recv().await {
//!             println!("{}%", update.percent);
//!         }
//!     });
//!
//!     runner.submit(Box::new(task));
//!     if let Some(outcome) = outcomes.recv().await {
//!         println!("{}", outcome.outcome?);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Executor configuration
pub mod config;
/// Run context and host collaborators
pub mod context;
/// Error types
pub mod error;
/// Best-effort progress reporting
pub mod progress;
/// Measurement result records
pub mod report;
/// Concurrent task execution
pub mod runner;
/// Measurement task abstraction and variants
pub mod task;

// Re-export commonly used types
pub use config::ProbeConfig;
pub use context::{Clock, DeviceIdentity, RunContext, StaticDevice, SystemClock};
pub use error::{Error, Result};
pub use progress::{ProgressSink, ProgressUpdate};
pub use report::{MeasurementResult, MetricValue};
pub use runner::{RunHandle, RunOutcome, TaskRunner};
pub use task::http::{HttpDesc, HttpMethod, HttpTask};
pub use task::{MeasurementTask, TaskDescriptor, TaskSchedule, build_task};
