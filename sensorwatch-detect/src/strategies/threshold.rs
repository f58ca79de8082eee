//! Static bounds with IQR fences for unknown sensor types
//!
//! ## Known Types
//!
//! Bounds come from `static_bounds`. A violation's severity is the distance
//! past the violated bound relative to that bound's magnitude:
//!
//! ```text
//! pressure [800, 1200], value 1300 → (1300 - 1200) / 1200 ≈ 0.083
//! ```
//!
//! Bound magnitudes below 1 are treated as 1 so a zero bound still yields a
//! finite severity.
//!
//! ## Unknown Types
//!
//! Bounds are derived from the key's last 7 days: `[Q1 - k·IQR, Q3 + k·IQR]`
//! with `k` the strategy threshold (1.5 by default). Outside is anomalous
//! with a fixed severity of 0.8; inside is reported as informational.

use chrono::Duration;
use sensorwatch_core::constants::detection::{
    static_bounds, IQR_FENCE_MULTIPLIER, IQR_MIN_SAMPLES, IQR_OUTLIER_SEVERITY, IQR_WINDOW_DAYS,
};
use sensorwatch_core::constants::ValueRange;
use sensorwatch_core::Reading;

use super::DetectionStrategy;
use crate::history::{window_start, HistoryPoint};
use crate::result::{AnomalyKind, AnomalyResult};
use crate::stats::quartiles;

/// Bounds check; the threshold is the IQR fence multiplier
#[derive(Debug, Clone)]
pub struct ThresholdStrategy {
    fence_multiplier: f64,
}

impl ThresholdStrategy {
    /// Registry name
    pub const NAME: &'static str = "threshold";

    /// Strategy using `fence_multiplier` × IQR for dynamic bounds
    pub fn new(fence_multiplier: f64) -> Self {
        Self { fence_multiplier }
    }

    fn check_static(&self, reading: &Reading, bounds: ValueRange) -> Option<AnomalyResult> {
        let value = reading.value;

        let (kind, bound) = if value < bounds.min {
            (AnomalyKind::SuddenDrop, bounds.min)
        } else if value > bounds.max {
            (AnomalyKind::SuddenSpike, bounds.max)
        } else {
            return None;
        };

        let distance = (value - bound).abs();
        let severity = distance / bound.abs().max(1.0);

        Some(
            AnomalyResult::anomaly(
                reading,
                kind,
                severity,
                format!(
                    "value {} outside operating range [{}, {}]",
                    value, bounds.min, bounds.max
                ),
            )
            .with_info("min", bounds.min)
            .with_info("max", bounds.max)
            .with_info("distance", distance),
        )
    }

    fn check_dynamic(&self, reading: &Reading, history: &[HistoryPoint]) -> Option<AnomalyResult> {
        let cutoff = window_start(reading.timestamp, Duration::days(IQR_WINDOW_DAYS));
        let mut values: Vec<f64> = history
            .iter()
            .filter(|p| p.timestamp >= cutoff)
            .map(|p| p.value)
            .collect();

        if values.len() < IQR_MIN_SAMPLES {
            return Some(AnomalyResult::insufficient_data(reading, IQR_MIN_SAMPLES, values.len()));
        }

        values.sort_by(f64::total_cmp);
        let (q1, q3) = quartiles(&values)?;
        let iqr = q3 - q1;
        let fences = ValueRange::new(
            q1 - self.fence_multiplier * iqr,
            q3 + self.fence_multiplier * iqr,
        );

        let result = if fences.contains(reading.value) {
            AnomalyResult::informational(
                reading,
                AnomalyKind::OutOfRange,
                format!("value {} within learned range [{:.2}, {:.2}]", reading.value, fences.min, fences.max),
            )
        } else {
            AnomalyResult::anomaly(
                reading,
                AnomalyKind::OutOfRange,
                IQR_OUTLIER_SEVERITY,
                format!("value {} outside learned range [{:.2}, {:.2}]", reading.value, fences.min, fences.max),
            )
        };

        Some(
            result
                .with_info("q1", q1)
                .with_info("q3", q3)
                .with_info("iqr", iqr)
                .with_info("lower_fence", fences.min)
                .with_info("upper_fence", fences.max),
        )
    }
}

impl Default for ThresholdStrategy {
    fn default() -> Self {
        Self::new(IQR_FENCE_MULTIPLIER)
    }
}

impl DetectionStrategy for ThresholdStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn threshold(&self) -> f64 {
        self.fence_multiplier
    }

    fn set_threshold(&mut self, threshold: f64) {
        self.fence_multiplier = threshold;
    }

    fn can_handle(&self, _sensor_type: &str) -> bool {
        true
    }

    fn detect(&self, reading: &Reading, history: &[HistoryPoint]) -> Option<AnomalyResult> {
        match static_bounds(&reading.sensor_type) {
            Some(bounds) => self.check_static(reading, bounds),
            None => self.check_dynamic(reading, history),
        }
    }
}
