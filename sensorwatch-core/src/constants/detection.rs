//! Detection Strategy Parameters
//!
//! Defaults and per-type tables for the anomaly detection strategies and the
//! standalone fallback detector. The two policies use separate tables: their
//! ranges and sensitivities differ and are kept that way.

use super::ValueRange;

// ===== HISTORY =====

/// Readings kept per (device, sensor type) key
pub const DEFAULT_HISTORY_SIZE: usize = 100;

/// Readings kept per key by the fallback detector
pub const FALLBACK_HISTORY_SIZE: usize = 100;

// ===== STATISTICAL (Z-SCORE) =====

/// z-score above which a reading is anomalous
pub const DEFAULT_STATISTICAL_THRESHOLD: f64 = 2.5;

/// History needed before z-scores are meaningful
pub const STATISTICAL_MIN_SAMPLES: usize = 10;

// ===== TIME SERIES (EMA + TREND) =====

/// Relative deviation from the forecast above which a reading is anomalous
pub const DEFAULT_TIME_SERIES_THRESHOLD: f64 = 0.3;

/// EMA smoothing factor
pub const EMA_ALPHA: f64 = 0.3;

/// Points needed inside the lookback window
pub const TIME_SERIES_MIN_SAMPLES: usize = 5;

/// Lookback window for the time-series strategy (hours)
pub const TIME_SERIES_WINDOW_HOURS: i64 = 24;

/// Points used for the trend slope
pub const TREND_POINTS: usize = 10;

// ===== THRESHOLD (STATIC + IQR) =====

/// Lookback window for dynamic IQR bounds (days)
pub const IQR_WINDOW_DAYS: i64 = 7;

/// History needed before IQR bounds are computed
pub const IQR_MIN_SAMPLES: usize = 10;

/// Multiplier applied to the IQR to widen the bounds
pub const IQR_FENCE_MULTIPLIER: f64 = 1.5;

/// Severity reported for values outside dynamic bounds
pub const IQR_OUTLIER_SEVERITY: f64 = 0.8;

/// Static operating bounds for the threshold strategy
pub fn static_bounds(sensor_type: &str) -> Option<ValueRange> {
    match sensor_type {
        "temperature" => Some(ValueRange::new(-40.0, 80.0)),
        "humidity" => Some(ValueRange::new(0.0, 100.0)),
        "pressure" => Some(ValueRange::new(800.0, 1200.0)),
        "voltage" => Some(ValueRange::new(0.0, 12.0)),
        "current" => Some(ValueRange::new(0.0, 10.0)),
        "ph" => Some(ValueRange::new(0.0, 14.0)),
        "co2" => Some(ValueRange::new(350.0, 5000.0)),
        _ => None,
    }
}

// ===== STRATEGY SELECTION =====

/// Continuous environmental types routed to the time-series strategy
pub const CONTINUOUS_TYPES: &[&str] = &["temperature", "humidity", "pressure"];

/// Discrete or binary types routed to the threshold strategy
pub const DISCRETE_TYPES: &[&str] = &["switch", "motion", "door"];

/// Types whose signal is smooth enough for EMA forecasting
pub const NUMERIC_TYPES: &[&str] = &[
    "temperature",
    "humidity",
    "pressure",
    "voltage",
    "current",
    "ph",
    "co2",
];

// ===== FALLBACK DETECTOR =====

/// Valid range checked first by the fallback detector
pub fn fallback_range(sensor_type: &str) -> ValueRange {
    match sensor_type {
        "temperature" => ValueRange::new(-40.0, 85.0),
        "humidity" => ValueRange::new(0.0, 100.0),
        "pressure" => ValueRange::new(300.0, 1100.0),
        _ => ValueRange::unbounded(),
    }
}

/// Largest percentage change from the previous value before it counts as a spike/drop
pub fn fallback_max_change_pct(sensor_type: &str) -> f64 {
    match sensor_type {
        "temperature" => 50.0,
        "humidity" => 30.0,
        "pressure" => 20.0,
        _ => 100.0,
    }
}

/// Variance below which the last values count as a flat line
pub fn fallback_min_variance(sensor_type: &str) -> f64 {
    match sensor_type {
        "temperature" | "humidity" | "pressure" => 0.1,
        _ => 0.001,
    }
}

/// Window the fallback flat-line check looks at
pub const FLAT_LINE_WINDOW: usize = 10;

/// Severity reported for a flat line
pub const FLAT_LINE_SEVERITY: f64 = 0.5;

// ===== ALERT ROUTING =====

/// Lowest severity routed as a critical alert
pub const ALERT_CRITICAL: f64 = 0.8;

/// Lowest severity routed as a high alert
pub const ALERT_HIGH: f64 = 0.6;

/// Lowest severity routed as a medium alert
pub const ALERT_MEDIUM: f64 = 0.4;

/// Lowest severity routed as a low alert; below is recorded only
pub const ALERT_LOW: f64 = 0.2;
