//! Anomaly detection for SensorWatch
//!
//! ## Architecture
//!
//! ```text
//!                    ┌─────────────────────── AnomalyEngine ───────────────────────┐
//! Reading ──────────►│ StrategyRegistry ─► statistical │ time_series │ threshold   │──► Option<AnomalyResult>
//!                    │ per-key SensorHistory (bounded, appended after detection)   │
//!                    └─────────────────────────────────────────────────────────────┘
//!
//! Reading ──────────► FallbackDetector (fixed rules, own history) ─────────────────► Option<AnomalyResult>
//! ```
//!
//! Both detectors implement [`Detector`]; the pipeline is generic over it.
//!
//! ## Results
//!
//! `None` means the reading was evaluated and is clean. A returned
//! [`AnomalyResult`] carries a [`DetectionStatus`] telling real anomalies
//! apart from informational results and "not enough history" sentinels.
//!
//! ```
//! use sensorwatch_core::Reading;
//! use sensorwatch_detect::{AnomalyEngine, AnomalyKind};
//!
//! let engine = AnomalyEngine::default();
//! let reading = Reading::builder("pump-3", "pressure").value(1300.0, "hPa").build();
//!
//! let result = engine.detect_with("threshold", &reading).unwrap();
//! assert_eq!(result.kind, AnomalyKind::SuddenSpike);
//! assert!(result.is_alertable());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod fallback;
pub mod history;
pub mod registry;
pub mod result;
pub mod stats;
pub mod strategies;
pub mod traits;

// Public API
pub use engine::AnomalyEngine;
pub use fallback::FallbackDetector;
pub use history::{HistoryKey, HistoryPoint, SensorHistory};
pub use registry::{strategy_for_sensor_type, StrategyConstructor, StrategyRegistry};
pub use result::{AlertLevel, AnomalyKind, AnomalyResult, DetectionStatus};
pub use strategies::{DetectionStrategy, StatisticalStrategy, ThresholdStrategy, TimeSeriesStrategy};
pub use traits::Detector;
