//! EMA + trend forecasting over the trailing 24 hours

use chrono::Duration;
use sensorwatch_core::constants::detection::{
    DEFAULT_TIME_SERIES_THRESHOLD, EMA_ALPHA, NUMERIC_TYPES, TIME_SERIES_MIN_SAMPLES,
    TIME_SERIES_WINDOW_HOURS, TREND_POINTS,
};
use sensorwatch_core::Reading;

use super::DetectionStrategy;
use crate::history::{window_start, HistoryPoint};
use crate::result::{AnomalyKind, AnomalyResult};
use crate::stats::{ema, trend_slope};

/// Compares a reading to a one-step forecast
///
/// ```text
/// window    = history points within 24h before the reading, chronological
/// expected  = EMA(window, α = 0.3) + OLS slope of the last min(10, n) points
/// deviation = |value - expected| / max(|expected|, 1)
/// ```
///
/// Anomalous when `deviation > threshold`.
#[derive(Debug, Clone)]
pub struct TimeSeriesStrategy {
    threshold: f64,
}

impl TimeSeriesStrategy {
    /// Registry name
    pub const NAME: &'static str = "time_series";

    /// Strategy flagging relative deviations above `threshold`
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for TimeSeriesStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_SERIES_THRESHOLD)
    }
}

impl DetectionStrategy for TimeSeriesStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn set_threshold(&mut self, threshold: f64) {
        self.threshold = threshold;
    }

    fn can_handle(&self, sensor_type: &str) -> bool {
        NUMERIC_TYPES.contains(&sensor_type)
    }

    fn detect(&self, reading: &Reading, history: &[HistoryPoint]) -> Option<AnomalyResult> {
        let cutoff = window_start(reading.timestamp, Duration::hours(TIME_SERIES_WINDOW_HOURS));
        let mut window: Vec<HistoryPoint> = history
            .iter()
            .filter(|p| p.timestamp >= cutoff)
            .copied()
            .collect();

        if window.len() < TIME_SERIES_MIN_SAMPLES {
            return Some(AnomalyResult::insufficient_data(
                reading,
                TIME_SERIES_MIN_SAMPLES,
                window.len(),
            ));
        }

        window.sort_by_key(|p| p.timestamp);
        let values: Vec<f64> = window.iter().map(|p| p.value).collect();

        let smoothed = ema(&values, EMA_ALPHA)?;
        let recent = &values[values.len().saturating_sub(TREND_POINTS)..];
        let trend = trend_slope(recent);
        let expected = smoothed + trend;

        let deviation = (reading.value - expected).abs() / expected.abs().max(1.0);
        if deviation <= self.threshold {
            return None;
        }

        let kind = if reading.value > expected {
            AnomalyKind::SuddenSpike
        } else {
            AnomalyKind::SuddenDrop
        };

        Some(
            AnomalyResult::anomaly(
                reading,
                kind,
                deviation / self.threshold,
                format!(
                    "value {} deviates {:.0}% from forecast {:.2}",
                    reading.value,
                    deviation * 100.0,
                    expected
                ),
            )
            .with_info("expected", expected)
            .with_info("ema", smoothed)
            .with_info("trend", trend)
            .with_info("deviation", deviation)
            .with_info("window_points", values.len()),
        )
    }
}
