//! Detection strategies
//!
//! Every strategy implements `DetectionStrategy`:
//!
//! ```text
//! detect(reading, history) → None                evaluated, clean
//!                          → Some(Anomalous)     anomaly
//!                          → Some(Informational) noteworthy, not alertable
//!                          → Some(NotEvaluated)  not enough history
//! ```
//!
//! `history` holds past points of the reading's own (device, sensor type)
//! key, oldest first, and never contains the candidate. Strategies must not
//! keep state between calls beyond their tuning parameters.
//!
//! ## Available Strategies
//!
//! - `StatisticalStrategy` ("statistical"): z-score against the full history
//! - `TimeSeriesStrategy` ("time_series"): EMA + trend forecast over 24 hours
//! - `ThresholdStrategy` ("threshold"): static bounds, IQR fences for unknown types

mod statistical;
mod threshold;
mod time_series;

pub use statistical::StatisticalStrategy;
pub use threshold::ThresholdStrategy;
pub use time_series::TimeSeriesStrategy;

use sensorwatch_core::Reading;

use crate::history::HistoryPoint;
use crate::result::AnomalyResult;

/// Pluggable anomaly detection algorithm
pub trait DetectionStrategy: Send + Sync {
    /// Registry name
    fn name(&self) -> &'static str;

    /// Current tuning threshold
    fn threshold(&self) -> f64;

    /// Replace the tuning threshold
    fn set_threshold(&mut self, threshold: f64);

    /// Whether the strategy is meaningful for a sensor type
    fn can_handle(&self, sensor_type: &str) -> bool;

    /// Evaluate `reading` against past points of its key
    fn detect(&self, reading: &Reading, history: &[HistoryPoint]) -> Option<AnomalyResult>;
}
