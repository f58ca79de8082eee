//! Core data model and per-reading stages for SensorWatch
//!
//! Holds everything a telemetry reading goes through before anomaly
//! detection sees it:
//! - The `Reading` model and its metadata keys
//! - The Cleaning Stage (range clamping, precision rounding)
//! - The Enrichment Stage (unit conversions, temporal context, quality scoring)
//! - Error taxonomy and the key/value configuration surface
//!
//! Both stages are plain synchronous functions over owned readings. The async
//! plumbing around them lives in `sensorwatch-pipeline`.
//!
//! ```
//! use sensorwatch_core::{Reading, CleaningStage, EnrichmentStage};
//! use sensorwatch_core::time::FixedClock;
//! use chrono::Utc;
//!
//! let now = Utc::now();
//! let reading = Reading::builder("device-001", "temperature")
//!     .value(21.456, "°C")
//!     .timestamp(now)
//!     .build();
//!
//! let cleaned = CleaningStage::new().clean(reading);
//! assert_eq!(cleaned.value, 21.46);
//!
//! let enriched = EnrichmentStage::with_clock(FixedClock::new(now)).enrich(cleaned);
//! assert!(enriched.metadata.contains_key("quality_score"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cleaning;
pub mod config;
pub mod constants;
pub mod enrichment;
pub mod errors;
pub mod reading;
pub mod time;

// Public API
pub use cleaning::CleaningStage;
pub use config::{DetectionConfig, PipelineConfig};
pub use enrichment::{EnrichmentStage, QualityLabel};
pub use errors::{ConfigError, ValidationError, ValidationResult};
pub use reading::{meta, Location, Quality, Reading, ReadingBuilder};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
