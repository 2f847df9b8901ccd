//! Error types for netprobe
//!
//! This module provides the classified failure taxonomy for measurement runs:
//! - Construction-time rejection of invalid descriptors
//! - Pre-network aborts (malformed header lines, unsupported methods)
//! - Terminal measurement failures carrying every aggregated transport cause
//!
//! Everything a run can raise is converted into this taxonomy at the run
//! boundary; no raw transport error ever reaches the caller. A non-200 HTTP
//! status is *not* an error: it is recorded in the result's `code` field and
//! the run is considered complete.

use thiserror::Error;

/// Result type alias for netprobe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for netprobe
///
/// Each variant includes enough context to diagnose the failure without the
/// caller having to inspect transport internals.
#[derive(Debug, Error)]
pub enum Error {
    /// Descriptor construction rejected the parameter map
    ///
    /// Fatal to task creation; re-running with the same parameters can never
    /// succeed.
    #[error("invalid parameter: {message}")]
    InvalidParameter {
        /// Human-readable description of the rejected parameter
        message: String,
    },

    /// A request header line did not split into exactly one name/value pair
    ///
    /// Header parsing is strict and all-or-nothing: one bad line aborts the
    /// run before any network I/O.
    #[error("incorrect header line: {line}")]
    MalformedHeader {
        /// The offending header line, verbatim
        line: String,
    },

    /// The descriptor's method matched none of HEAD/GET/POST
    #[error("unsupported HTTP method: {method}")]
    UnsupportedMethod {
        /// The raw method string from the descriptor
        method: String,
    },

    /// No task variant is registered for the descriptor's type
    #[error("unsupported task type: {task_type}")]
    UnsupportedTaskType {
        /// The task type the dispatch could not resolve
        task_type: String,
    },

    /// Terminal measurement failure
    ///
    /// Produced when a run ends without a result: every caught transport or
    /// URL error has its message captured, and the concatenation becomes this
    /// variant's message.
    #[error("cannot get result from {task_type} measurement because {message}")]
    Measurement {
        /// The measurement type that failed (e.g. "http")
        task_type: String,
        /// Concatenated messages of every caught cause
        message: String,
    },

    /// The run was cancelled through its cancellation token
    #[error("measurement cancelled")]
    Cancelled,
}

impl Error {
    /// Machine-readable error code for reporting collaborators
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidParameter { .. } => "invalid_parameter",
            Error::MalformedHeader { .. } => "malformed_header",
            Error::UnsupportedMethod { .. } => "unsupported_method",
            Error::UnsupportedTaskType { .. } => "unsupported_task_type",
            Error::Measurement { .. } => "measurement_failed",
            Error::Cancelled => "cancelled",
        }
    }

    /// Build the terminal measurement failure from accumulated cause messages
    pub(crate) fn measurement(task_type: &str, causes: Vec<String>) -> Self {
        Error::Measurement {
            task_type: task_type.to_string(),
            message: causes.join("\n"),
        }
    }
}
