//! Detection results
//!
//! ## Status
//!
//! A strategy answers one of three ways:
//!
//! | Return | Status | Meaning |
//! |--------|--------|---------|
//! | `None` | - | evaluated, nothing wrong |
//! | `Some(r)` | `Anomalous` | evaluated, anomaly with severity > 0 |
//! | `Some(r)` | `Informational` | evaluated, noteworthy but not an anomaly (zero variance, in-range IQR check) |
//! | `Some(r)` | `NotEvaluated` | could not evaluate (not enough history) |
//!
//! Only `Anomalous` results are ever alerted on; see `AnomalyResult::is_alertable`.
//!
//! ## Severity
//!
//! Severity is clamped into [0, 1] on construction. Non-anomalous results
//! always carry severity 0.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use sensorwatch_core::constants::detection::{ALERT_CRITICAL, ALERT_HIGH, ALERT_LOW, ALERT_MEDIUM};
use sensorwatch_core::Reading;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Value outside the valid or dynamic range
    OutOfRange,
    /// Value well above what history predicts
    SuddenSpike,
    /// Value well below what history predicts
    SuddenDrop,
    /// Recent values barely vary
    FlatLine,
    /// Too little history to evaluate
    InsufficientData,
    /// Value is not a finite number
    DataCorruption,
}

impl AnomalyKind {
    /// Snake-case name, as serialized
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OutOfRange => "out_of_range",
            Self::SuddenSpike => "sudden_spike",
            Self::SuddenDrop => "sudden_drop",
            Self::FlatLine => "flat_line",
            Self::InsufficientData => "insufficient_data",
            Self::DataCorruption => "data_corruption",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a result reports an anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    /// Evaluated, and the reading is anomalous
    Anomalous,
    /// Evaluated, result worth recording but not an anomaly
    Informational,
    /// Could not evaluate
    NotEvaluated,
}

/// Alert routing level derived from severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    /// Recorded, not alerted
    None,
    /// Severity ≥ 0.2
    Low,
    /// Severity ≥ 0.4
    Medium,
    /// Severity ≥ 0.6
    High,
    /// Severity ≥ 0.8
    Critical,
}

impl AlertLevel {
    /// Route a severity: ≥0.8 critical, ≥0.6 high, ≥0.4 medium, ≥0.2 low
    pub fn from_severity(severity: f64) -> Self {
        if severity >= ALERT_CRITICAL {
            Self::Critical
        } else if severity >= ALERT_HIGH {
            Self::High
        } else if severity >= ALERT_MEDIUM {
            Self::Medium
        } else if severity >= ALERT_LOW {
            Self::Low
        } else {
            Self::None
        }
    }

    /// Snake-case name, as serialized
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a detection strategy or detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    /// Device of the evaluated reading
    pub device_id: String,
    /// Sensor type of the evaluated reading
    pub sensor_type: String,
    /// What kind of anomaly (or sentinel)
    pub kind: AnomalyKind,
    /// Anomalous, informational or not evaluated
    pub status: DetectionStatus,
    /// Severity in [0, 1]
    pub severity: f64,
    /// Human readable summary
    pub description: String,
    /// When the result was produced
    pub detected_at: DateTime<Utc>,
    /// The evaluated reading
    pub reading: Reading,
    /// Diagnostic fields (z-score, mean, bounds, ...)
    #[serde(default)]
    pub additional_info: HashMap<String, Value>,
}

impl AnomalyResult {
    fn build(
        reading: &Reading,
        kind: AnomalyKind,
        status: DetectionStatus,
        severity: f64,
        description: String,
    ) -> Self {
        Self {
            device_id: reading.device_id.clone(),
            sensor_type: reading.sensor_type.clone(),
            kind,
            status,
            severity,
            description,
            detected_at: Utc::now(),
            reading: reading.clone(),
            additional_info: HashMap::new(),
        }
    }

    /// An anomaly; severity is clamped into [0, 1] (NaN becomes 0)
    pub fn anomaly(
        reading: &Reading,
        kind: AnomalyKind,
        severity: f64,
        description: impl Into<String>,
    ) -> Self {
        Self::build(
            reading,
            kind,
            DetectionStatus::Anomalous,
            clamp_severity(severity),
            description.into(),
        )
    }

    /// A zero-severity, non-alertable observation
    pub fn informational(reading: &Reading, kind: AnomalyKind, description: impl Into<String>) -> Self {
        Self::build(reading, kind, DetectionStatus::Informational, 0.0, description.into())
    }

    /// Sentinel for "not enough history to evaluate"
    pub fn insufficient_data(reading: &Reading, required: usize, available: usize) -> Self {
        Self::build(
            reading,
            AnomalyKind::InsufficientData,
            DetectionStatus::NotEvaluated,
            0.0,
            format!("insufficient history: {} of {} required points", available, required),
        )
        .with_info("required", required)
        .with_info("available", available)
    }

    /// Attach a diagnostic field
    pub fn with_info(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.additional_info.insert(key.to_string(), value.into());
        self
    }

    /// Diagnostic field as a number
    pub fn info_f64(&self, key: &str) -> Option<f64> {
        self.additional_info.get(key).and_then(Value::as_f64)
    }

    /// Whether this result should raise an alert
    pub fn is_alertable(&self) -> bool {
        self.status == DetectionStatus::Anomalous && self.severity > 0.0
    }

    /// Alert level; anything not alertable routes to `AlertLevel::None`
    pub fn alert_level(&self) -> AlertLevel {
        if self.is_alertable() {
            AlertLevel::from_severity(self.severity)
        } else {
            AlertLevel::None
        }
    }
}

fn clamp_severity(severity: f64) -> f64 {
    if severity.is_nan() {
        0.0
    } else {
        severity.clamp(0.0, 1.0)
    }
}
