//! Run context and host collaborators
//!
//! A measurement run borrows everything it needs from its host through a
//! [`RunContext`]: executor tuning, the progress sink, a wall clock for
//! result timestamps, the device identity recorded in results, and a
//! cancellation token honored at every suspension point. The clock and
//! identity are trait objects so tests can pin them.

use crate::config::ProbeConfig;
use crate::progress::ProgressSink;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Source of "now" for result records
///
/// Elapsed time is always measured with a monotonic instant inside the
/// executor; this clock only stamps the assembled record.
pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;
}

/// System wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Device identity lookup, consumed as given from the host platform
pub trait DeviceIdentity: Send + Sync {
    /// Stable identifier of the measuring device
    fn device_id(&self) -> String;
}

/// Fixed device identity resolved once at startup
#[derive(Clone, Debug)]
pub struct StaticDevice {
    id: String,
}

impl StaticDevice {
    /// Identity with a known id
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl Default for StaticDevice {
    fn default() -> Self {
        Self::new("unknown-device")
    }
}

impl DeviceIdentity for StaticDevice {
    fn device_id(&self) -> String {
        self.id.clone()
    }
}

/// Everything one measurement run borrows from its host
///
/// Each run gets its own context value; contexts share the sink, clock and
/// identity but never any per-run state.
#[derive(Clone)]
pub struct RunContext {
    /// Executor tuning for this run
    pub config: ProbeConfig,
    /// Best-effort progress sink
    pub progress: ProgressSink,
    /// Wall clock for result timestamps
    pub clock: Arc<dyn Clock>,
    /// Device identity recorded in results
    pub device: Arc<dyn DeviceIdentity>,
    /// Cancellation token honored at request-send and stream-read points
    pub cancel: CancellationToken,
}

impl RunContext {
    /// Context with system clock, static identity and a fresh token
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            progress: ProgressSink::default(),
            clock: Arc::new(SystemClock),
            device: Arc::new(StaticDevice::default()),
            cancel: CancellationToken::new(),
        }
    }
}
