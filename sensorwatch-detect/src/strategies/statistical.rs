//! Z-score detection against the key's full history

use sensorwatch_core::constants::detection::{DEFAULT_STATISTICAL_THRESHOLD, STATISTICAL_MIN_SAMPLES};
use sensorwatch_core::Reading;

use super::DetectionStrategy;
use crate::history::HistoryPoint;
use crate::result::{AnomalyKind, AnomalyResult};
use crate::stats::mean_std_dev;

/// Flags values more than `threshold` standard deviations from the mean
///
/// Needs at least 10 historical values. A history with zero spread yields
/// an informational `FlatLine` result rather than dividing by zero.
#[derive(Debug, Clone)]
pub struct StatisticalStrategy {
    threshold: f64,
}

impl StatisticalStrategy {
    /// Registry name
    pub const NAME: &'static str = "statistical";

    /// Strategy flagging z-scores above `threshold`
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for StatisticalStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_STATISTICAL_THRESHOLD)
    }
}

impl DetectionStrategy for StatisticalStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    fn can_handle(&self, _sensor_type: &str) -> bool {
        true
    }

    fn detect(&self, reading: &Reading, history: &[HistoryPoint]) -> Option<AnomalyResult> {
        if history.len() < STATISTICAL_MIN_SAMPLES {
            return Some(AnomalyResult::insufficient_data(
                reading,
                STATISTICAL_MIN_SAMPLES,
                history.len(),
            ));
        }

        let values: Vec<f64> = history.iter().map(|p| p.value).collect();
        let (mean, std_dev) = mean_std_dev(&values)?;

        // Identical values can leave rounding noise in the spread
        if std_dev <= f64::EPSILON * mean.abs().max(1.0) {
            return Some(
                AnomalyResult::informational(
                    reading,
                    AnomalyKind::FlatLine,
                    format!("no variation over the last {} values", values.len()),
                )
                .with_info("mean", mean)
                .with_info("std_dev", 0.0),
            );
        }

        let z_score = (reading.value - mean).abs() / std_dev;
        if z_score <= self.threshold {
            return None;
        }

        let kind = if reading.value > mean {
            AnomalyKind::SuddenSpike
        } else {
            AnomalyKind::SuddenDrop
        };

        Some(
            AnomalyResult::anomaly(
                reading,
                kind,
                z_score / self.threshold,
                format!(
                    "value {} is {:.2} standard deviations from mean {:.2}",
                    reading.value, z_score, mean
                ),
            )
            .with_info("z_score", z_score)
            .with_info("mean", mean)
            .with_info("std_dev", std_dev)
            .with_info("threshold", self.threshold),
        )
    }
}
