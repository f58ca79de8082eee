//! Fallback Detector
//!
//! A rule-based detector for deployments that do not wire the full strategy
//! engine. It keeps its own fixed-capacity history per key and uses its own
//! tables (`fallback_range`, `fallback_max_change_pct`,
//! `fallback_min_variance`), which differ from the strategies' on purpose.
//!
//! ## Rules
//!
//! Checked in order; the first match wins:
//!
//! 1. **Range**: value outside the type's valid range → `OutOfRange`,
//!    severity = distance past the bound / range width
//! 2. **Change**: percentage change from the previous value above the type's
//!    limit → `SuddenSpike` / `SuddenDrop`, severity = min(|Δ%| / 100, 1)
//! 3. **Flat line**: variance of the last 10 values (the candidate included)
//!    below the type's minimum → `FlatLine`, severity 0.5
//!
//! The candidate is evaluated first, then appended.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use heapless::Deque;
use sensorwatch_core::constants::detection::{
    fallback_max_change_pct, fallback_min_variance, fallback_range, FALLBACK_HISTORY_SIZE,
    FLAT_LINE_SEVERITY, FLAT_LINE_WINDOW,
};
use sensorwatch_core::reading::meta;
use sensorwatch_core::Reading;

use crate::engine::corruption;
use crate::history::HistoryKey;
use crate::result::{AnomalyKind, AnomalyResult};
use crate::stats::variance;
use crate::traits::Detector;

type ValueHistory = Deque<f64, FALLBACK_HISTORY_SIZE>;

/// Standalone rule-based detector
#[derive(Default)]
pub struct FallbackDetector {
    histories: Mutex<HashMap<HistoryKey, ValueHistory>>,
}

impl FallbackDetector {
    /// Name used in logs and result annotations
    pub const NAME: &'static str = "fallback";

    /// Detector with empty histories
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate a reading against the rules, then record it
    pub fn check(&self, reading: &Reading) -> Option<AnomalyResult> {
        if let Some(corrupt) = corruption(reading, Self::NAME) {
            return Some(corrupt);
        }

        let mut histories = self.lock();
        let history = histories.entry(HistoryKey::of(reading)).or_insert_with(Deque::new);

        let result = check_range(reading)
            .or_else(|| check_change(reading, history))
            .or_else(|| check_flat_line(reading, history))
            .map(|result| result.with_info(meta::DETECTOR, Self::NAME));

        if history.is_full() {
            history.pop_front();
        }
        // Cannot fail: a slot was freed above
        let _ = history.push_back(reading.value);

        result
    }

    /// Number of values recorded for a key
    pub fn history_len(&self, device_id: &str, sensor_type: &str) -> usize {
        self.lock()
            .get(&HistoryKey::new(device_id, sensor_type))
            .map_or(0, |history| history.len())
    }

    /// Forget the history of one key; returns whether it existed
    pub fn clear_history(&self, device_id: &str, sensor_type: &str) -> bool {
        self.lock()
            .remove(&HistoryKey::new(device_id, sensor_type))
            .is_some()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<HistoryKey, ValueHistory>> {
        self.histories.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Detector for FallbackDetector {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn evaluate(&self, reading: &Reading) -> Option<AnomalyResult> {
        self.check(reading)
    }
}

fn check_range(reading: &Reading) -> Option<AnomalyResult> {
    let range = fallback_range(&reading.sensor_type);
    let value = reading.value;
    if range.contains(value) {
        return None;
    }

    let distance = if value < range.min {
        range.min - value
    } else {
        value - range.max
    };

    Some(
        AnomalyResult::anomaly(
            reading,
            AnomalyKind::OutOfRange,
            distance / range.width(),
            format!("value {} outside valid range [{}, {}]", value, range.min, range.max),
        )
        .with_info("min", range.min)
        .with_info("max", range.max),
    )
}

fn check_change(reading: &Reading, history: &ValueHistory) -> Option<AnomalyResult> {
    let previous = *history.back()?;
    // No meaningful percentage from zero
    if previous.abs() < f64::EPSILON {
        return None;
    }

    let change_pct = (reading.value - previous) / previous.abs() * 100.0;
    let limit = fallback_max_change_pct(&reading.sensor_type);
    if change_pct.abs() <= limit {
        return None;
    }

    let kind = if change_pct > 0.0 {
        AnomalyKind::SuddenSpike
    } else {
        AnomalyKind::SuddenDrop
    };

    Some(
        AnomalyResult::anomaly(
            reading,
            kind,
            change_pct.abs() / 100.0,
            format!("value changed {:.1}% from {}", change_pct, previous),
        )
        .with_info("previous", previous)
        .with_info("change_pct", change_pct)
        .with_info("limit_pct", limit),
    )
}

fn check_flat_line(reading: &Reading, history: &ValueHistory) -> Option<AnomalyResult> {
    let needed = FLAT_LINE_WINDOW - 1;
    if history.len() < needed {
        return None;
    }

    let mut window: Vec<f64> = history.iter().skip(history.len() - needed).copied().collect();
    window.push(reading.value);

    let spread = variance(&window)?;
    let min_variance = fallback_min_variance(&reading.sensor_type);
    if spread >= min_variance {
        return None;
    }

    Some(
        AnomalyResult::anomaly(
            reading,
            AnomalyKind::FlatLine,
            FLAT_LINE_SEVERITY,
            format!("variance {:.4} over last {} values", spread, window.len()),
        )
        .with_info("variance", spread)
        .with_info("min_variance", min_variance),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::DetectionStatus;

    fn reading(sensor_type: &str, value: f64) -> Reading {
        Reading::builder("dev-1", sensor_type).raw_value(value).build()
    }

    #[test]
    fn flat_line_on_tenth_identical_reading() {
        let detector = FallbackDetector::new();
        for i in 1..10 {
            assert!(detector.check(&reading("humidity", 45.0)).is_none(), "evaluation {}", i);
        }

        let result = detector.check(&reading("humidity", 45.0)).unwrap();
        assert_eq!(result.kind, AnomalyKind::FlatLine);
        assert_eq!(result.severity, 0.5);
        assert_eq!(result.status, DetectionStatus::Anomalous);
    }

    #[test]
    fn out_of_range_first() {
        let detector = FallbackDetector::new();
        detector.check(&reading("temperature", 20.0));

        let result = detector.check(&reading("temperature", 110.0)).unwrap();
        assert_eq!(result.kind, AnomalyKind::OutOfRange);
        // (110 - 85) / 125
        assert!((result.severity - 0.2).abs() < 1e-12);
    }

    #[test]
    fn sudden_change() {
        let detector = FallbackDetector::new();
        detector.check(&reading("pressure", 1000.0));
        assert!(detector.check(&reading("pressure", 1010.0)).is_none());

        let result = detector.check(&reading("humidity", 40.0));
        assert!(result.is_none());
        let result = detector.check(&reading("humidity", 60.0)).unwrap();
        assert_eq!(result.kind, AnomalyKind::SuddenSpike);
        assert!((result.severity - 0.5).abs() < 1e-12);

        let result = detector.check(&reading("humidity", 20.0)).unwrap();
        assert_eq!(result.kind, AnomalyKind::SuddenDrop);
    }

    #[test]
    fn zero_previous_skips_change_rule() {
        let detector = FallbackDetector::new();
        detector.check(&reading("lux", 0.0));
        assert!(detector.check(&reading("lux", 500.0)).is_none());
    }

    #[test]
    fn history_is_capped() {
        let detector = FallbackDetector::new();
        for i in 0..150 {
            detector.check(&reading("lux", 100.0 + (i % 7) as f64));
        }
        assert_eq!(detector.history_len("dev-1", "lux"), FALLBACK_HISTORY_SIZE);
        assert!(detector.clear_history("dev-1", "lux"));
        assert_eq!(detector.history_len("dev-1", "lux"), 0);
    }

    #[test]
    fn non_finite_is_corruption() {
        let detector = FallbackDetector::new();
        let result = detector.check(&reading("humidity", f64::INFINITY)).unwrap();
        assert_eq!(result.kind, AnomalyKind::DataCorruption);
        assert_eq!(detector.history_len("dev-1", "humidity"), 0);
    }
}
