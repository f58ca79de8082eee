//! SensorWatch streaming pipeline
//!
//! Bounded queues connect long-lived stage tasks; the orchestrator at the
//! end persists, evaluates and publishes every reading.
//!
//! ## Modules
//!
//! - [`queue`]: bounded async FIFO with backpressure, plus a named registry
//! - [`ingest`]: JSON payload decoding and the `Ingestor` front door
//! - [`stages`]: cleaning and enrichment loops
//! - [`orchestrator`]: per-reading processing with failure isolation
//! - [`sinks`]: store and notifier traits with in-memory implementations
//! - [`generator`]: simulated device fleet
//! - [`runtime`]: spawns and shuts down the whole pipeline
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sensorwatch_core::PipelineConfig;
//! use sensorwatch_pipeline::{MemoryNotifier, MemoryStore, Pipeline};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = Pipeline::spawn_with_engine(
//!     PipelineConfig::default(),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MemoryNotifier::new()),
//! )?;
//!
//! handle
//!     .ingestor()
//!     .ingest("sensors/pump-3/pressure", br#"{"type": "pressure", "value": 1013.2}"#)
//!     .await?;
//!
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod generator;
pub mod ingest;
pub mod orchestrator;
pub mod queue;
pub mod runtime;
pub mod sinks;
pub mod stages;

// Public API
pub use errors::{ClosedQueueError, DecodeError, PipelineError, PipelineResult, SinkError};
pub use generator::{DeviceProfile, ReadingGenerator, SensorProfile};
pub use ingest::{decode_payload, device_id_from_topic, Ingestor};
pub use orchestrator::{Orchestrator, ProcessReport, ProcessingStats, ProcessingStatsSnapshot};
pub use queue::{BoundedQueue, QueueRegistry, QueueStatsSnapshot};
pub use runtime::{queues, Pipeline, PipelineHandle};
pub use sinks::{MemoryNotifier, MemoryStore, Notifier, PublishedAnomaly, ReadingQuery, ReadingStore, StoredReading};
