//! Error Types for the Streaming Pipeline
//!
//! ## Error Categories
//!
//! ### Queue
//! - `ClosedQueueError`: a write reached a queue after `close()`. During
//!   shutdown this is expected; at any other time it points at a wiring bug.
//!
//! ### Sinks (transient I/O)
//! - `SinkError::Unavailable`: the store or notifier could not be reached
//! - `SinkError::Rejected`: the collaborator refused the record
//!
//! Sink failures are logged and counted, never retried: delivery is
//! at-most-once per reading.
//!
//! ### Decoding
//! - `DecodeError`: a telemetry payload could not be turned into a `Reading`
//!
//! `PipelineError` wraps all of the above plus reading validation so stage
//! code can use `?` and decide at the loop boundary what to log.

use sensorwatch_core::ValidationError;
use thiserror::Error;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Write attempted on a closed queue
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Queue '{queue}' is closed")]
pub struct ClosedQueueError {
    /// Name of the closed queue
    pub queue: String,
}

impl ClosedQueueError {
    pub fn new(queue: impl Into<String>) -> Self {
        Self { queue: queue.into() }
    }
}

/// Failure of a persistence or notification collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// Collaborator could not be reached
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    /// Collaborator refused the record
    #[error("Sink rejected record: {0}")]
    Rejected(String),
}

/// Telemetry payload could not be decoded
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Payload is not valid JSON for a reading
    #[error("Invalid payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field was absent
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// The value field is neither a number nor a numeric string
    #[error("Field '{field}' is not numeric")]
    NonNumericValue {
        /// Offending field
        field: &'static str,
    },
}

/// Any failure a pipeline stage can observe
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    ClosedQueue(#[from] ClosedQueueError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
