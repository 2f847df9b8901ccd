//! Configuration types for netprobe
//!
//! Size caps and sentinels are explicit configuration rather than constants
//! so individual runs (and tests) can override them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Executor tuning for measurement runs
///
/// The defaults match the reference sizing: a 1 MiB cap on total response
/// bytes, a 1 KiB body capture reported in results, and a 16 KiB read buffer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Hard cap on total response bytes read per run (default: 1 MiB)
    ///
    /// Also serves as the progress denominator when the response declares no
    /// usable content length.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: u64,

    /// Capacity of the body capture buffer included in results (default: 1024)
    ///
    /// Responses larger than this are still read and counted in full; only
    /// the reported prefix is bounded.
    #[serde(default = "default_max_capture_bytes")]
    pub max_capture_bytes: usize,

    /// Read-buffer sizing for the streaming loop (default: 16 KiB)
    ///
    /// The transport delivers chunks at its own granularity; this records the
    /// sizing the loop is tuned for and bounds per-chunk copies in hosts that
    /// manage their own buffers.
    #[serde(default = "default_read_chunk_bytes")]
    pub read_chunk_bytes: usize,

    /// Status code recorded when no status line is observable (default: 0)
    #[serde(default)]
    pub default_status_code: u16,

    /// Ceiling for reported progress percentages (default: 100)
    ///
    /// Values below 100 are allowed; hosts with a UI-imposed ceiling clamp
    /// here rather than in the sink.
    #[serde(default = "default_max_progress_percent")]
    pub max_progress_percent: u32,

    /// Deadline for the whole exchange, connect through final body byte
    /// (default: 30s)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_response_bytes: default_max_response_bytes(),
            max_capture_bytes: default_max_capture_bytes(),
            read_chunk_bytes: default_read_chunk_bytes(),
            default_status_code: 0,
            max_progress_percent: default_max_progress_percent(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_max_response_bytes() -> u64 {
    1024 * 1024
}

fn default_max_capture_bytes() -> usize {
    1024
}

fn default_read_chunk_bytes() -> usize {
    16 * 1024
}

fn default_max_progress_percent() -> u32 {
    100
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}
