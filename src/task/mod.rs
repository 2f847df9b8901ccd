//! Measurement task abstraction and variants
//!
//! A measurement task is a validated description plus the probe that
//! executes it: `parse raw parameters -> immutable descriptor -> run ->
//! structured result or classified error`. Variants share the
//! [`MeasurementTask`] capability set and are selected by task type through
//! [`build_task`]; HTTP is the only variant today, with ping/DNS-style
//! probes expected to slot in beside it.

/// HTTP measurement task
pub mod http;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::report::MeasurementResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Scheduling fields owned by the external scheduler
///
/// This core reads them (mostly the key, for labeling) and never mutates
/// them; they travel with the descriptor so repeated runs of the same task
/// stay attributable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSchedule {
    /// Stable identifier assigned by the scheduler
    pub key: Option<String>,
    /// Earliest time the task should run
    pub start_time: Option<DateTime<Utc>>,
    /// Time after which the task should no longer run
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds between repeated runs
    pub interval_secs: f64,
    /// Number of runs the scheduler intends
    pub count: i64,
    /// Scheduler priority
    pub priority: i64,
}

/// Untyped task description as delivered by the scheduler
///
/// The parameter map is deliberately loose; each variant's descriptor parser
/// turns it into a typed configuration and is the single validation gate.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Variant selector (e.g. "http")
    pub task_type: String,
    /// Scheduling fields, passed through unchanged
    #[serde(default)]
    pub schedule: TaskSchedule,
    /// Raw string parameters; `None` parses as all-empty
    #[serde(default)]
    pub parameters: Option<HashMap<String, String>>,
}

/// Capability set shared by every measurement variant
///
/// One run is a single attempt from idle to a terminal state: no retries, no
/// resumption. Implementations allocate per-run buffers inside `execute` so
/// concurrent runs of the same task never share mutable state.
#[async_trait]
pub trait MeasurementTask: Send + Sync + std::fmt::Debug {
    /// Variant tag, matching the descriptor's `task_type`
    fn type_name(&self) -> &'static str;

    /// Scheduling fields this task was created with
    fn schedule(&self) -> &TaskSchedule;

    /// Human-readable description for CLI/log display
    fn describe(&self) -> String;

    /// Run the measurement once
    async fn execute(&self, ctx: &RunContext) -> Result<MeasurementResult>;

    /// A new task with the same configuration, for repeated scheduling
    fn clone_task(&self) -> Box<dyn MeasurementTask>;
}

impl Clone for Box<dyn MeasurementTask> {
    fn clone(&self) -> Self {
        self.clone_task()
    }
}

/// Build the task variant a descriptor selects
///
/// Dispatch is by task type tag; an unknown tag fails with
/// [`Error::UnsupportedTaskType`] before any parameter parsing happens.
pub fn build_task(descriptor: &TaskDescriptor) -> Result<Box<dyn MeasurementTask>> {
    match descriptor.task_type.as_str() {
        http::TYPE => Ok(Box::new(http::HttpTask::from_descriptor(descriptor)?)),
        other => Err(Error::UnsupportedTaskType {
            task_type: other.to_string(),
        }),
    }
}
