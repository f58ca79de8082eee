//! Telemetry Reading Model
//!
//! ## Overview
//!
//! A `Reading` is one timestamped measurement from one sensor on one device.
//! It is the unit of work for every pipeline stage:
//!
//! ```text
//! Decoder → Cleaning → Enrichment → Orchestrator → Store / Notifier / Downstream
//!              ↓            ↓             ↓
//!            value      metadata      metadata
//! ```
//!
//! ## Mutability Model
//!
//! Identity fields (`device_id`, `sensor_type`) and `timestamp` are set once
//! when the reading is built. The Cleaning Stage may replace `value` (clamping
//! and rounding), and each later stage only adds annotations to `metadata`.
//! Stages take readings by value and hand them on, so a reading is never
//! shared mutably between two stages.
//!
//! ## Sensor Types
//!
//! Sensor types are open strings (`"temperature"`, `"co2"`, `"door"`, ...)
//! rather than a closed enum: devices in the field report types the pipeline
//! has never seen, and those readings must still flow. Lookup tables keyed by
//! type carry a default entry for anything unrecognised.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ValidationError, ValidationResult};

/// Metadata keys written by the pipeline stages
pub mod meta {
    /// Value as received, before cleaning touched it
    pub const RAW_VALUE: &str = "raw_value";
    /// Set when the received value was NaN or infinite
    pub const NON_FINITE: &str = "non_finite_value";
    /// Set when cleaning had to clamp the value into range
    pub const CLAMPED: &str = "clamped";
    /// Temperature converted to Fahrenheit
    pub const FAHRENHEIT: &str = "value_fahrenheit";
    /// Temperature converted to Kelvin
    pub const KELVIN: &str = "value_kelvin";
    /// Pressure converted to pounds per square inch
    pub const PSI: &str = "value_psi";
    /// Pressure converted to inches of mercury
    pub const INHG: &str = "value_inhg";
    /// Hour of day (0-23, UTC) the reading was taken
    pub const HOUR_OF_DAY: &str = "hour_of_day";
    /// Day of week the reading was taken
    pub const DAY_OF_WEEK: &str = "day_of_week";
    /// Whether the reading was taken on Saturday or Sunday
    pub const IS_WEEKEND: &str = "is_weekend";
    /// Computed quality score in [0, 1]
    pub const QUALITY_SCORE: &str = "quality_score";
    /// Discretized quality label
    pub const QUALITY_LABEL: &str = "quality_label";
    /// Whether the reading is younger than the freshness window
    pub const IS_FRESH: &str = "is_fresh";
    /// Age of the reading in seconds when it was enriched
    pub const AGE_SECONDS: &str = "age_seconds";
    /// When the orchestrator picked up the reading
    pub const PROCESSED_AT: &str = "processed_at";
    /// Strategy (or detector) that evaluated the reading
    pub const DETECTOR: &str = "detector";
}

/// Device-reported quality of a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Sensor reports nominal operation
    Good,
    /// Sensor reports a possibly degraded measurement
    Uncertain,
    /// Sensor reports a faulty measurement
    Bad,
    /// Quality was not reported
    #[default]
    Unknown,
}

/// Geographic position of a device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Altitude in metres, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
}

/// One timestamped sensor measurement from a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Device that produced the reading
    pub device_id: String,
    /// Kind of measurement (e.g. "temperature")
    pub sensor_type: String,
    /// Measured value
    pub value: f64,
    /// Unit of `value` (e.g. "°C", "hPa")
    pub unit: String,
    /// When the measurement was taken
    pub timestamp: DateTime<Utc>,
    /// Where the device was, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Device-reported quality
    #[serde(default)]
    pub quality: Quality,
    /// Annotations accumulated by the pipeline stages
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Reading {
    /// Start building a reading for a device and sensor type
    pub fn builder(device_id: impl Into<String>, sensor_type: impl Into<String>) -> ReadingBuilder {
        ReadingBuilder::new(device_id, sensor_type)
    }

    /// Check the fields every downstream stage relies on
    pub fn validate(&self) -> ValidationResult<()> {
        if self.device_id.trim().is_empty() {
            return Err(ValidationError::MissingField("device_id"));
        }
        if self.sensor_type.trim().is_empty() {
            return Err(ValidationError::MissingField("sensor_type"));
        }
        Ok(())
    }

    /// Add or replace a metadata annotation
    pub fn annotate(&mut self, key: &str, value: impl Into<Value>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    /// Read a boolean annotation, treating absence as false
    pub fn flag(&self, key: &str) -> bool {
        self.metadata.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Read a numeric annotation
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metadata.get(key).and_then(Value::as_f64)
    }

    /// Age of the reading relative to `now`; negative for future timestamps
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.timestamp
    }
}

/// Builder for readings
///
/// Defaults: value 0.0, unit from the sensor type's canonical unit,
/// timestamp now, quality `Good`, empty metadata.
pub struct ReadingBuilder {
    device_id: String,
    sensor_type: String,
    value: f64,
    unit: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    location: Option<Location>,
    quality: Quality,
    metadata: HashMap<String, Value>,
}

impl ReadingBuilder {
    /// Create a builder for a device and sensor type
    pub fn new(device_id: impl Into<String>, sensor_type: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            sensor_type: sensor_type.into(),
            value: 0.0,
            unit: None,
            timestamp: None,
            location: None,
            quality: Quality::Good,
            metadata: HashMap::new(),
        }
    }

    /// Set the measured value and its unit
    pub fn value(mut self, value: f64, unit: impl Into<String>) -> Self {
        self.value = value;
        self.unit = Some(unit.into());
        self
    }

    /// Set the measured value, keeping the default unit for the sensor type
    pub fn raw_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    /// Set the measurement time
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set the device location
    pub fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the device-reported quality
    pub fn quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Attach a metadata entry
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Finish the reading
    pub fn build(self) -> Reading {
        let unit = self
            .unit
            .unwrap_or_else(|| crate::constants::ranges::canonical_unit(&self.sensor_type).to_string());

        Reading {
            device_id: self.device_id,
            sensor_type: self.sensor_type,
            value: self.value,
            unit,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            location: self.location,
            quality: self.quality,
            metadata: self.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let reading = Reading::builder("dev-1", "pressure").raw_value(1013.2).build();

        assert_eq!(reading.unit, "hPa");
        assert_eq!(reading.quality, Quality::Good);
        assert!(reading.metadata.is_empty());
        assert!(reading.location.is_none());
    }

    #[test]
    fn validate_rejects_missing_identity() {
        let reading = Reading::builder("", "temperature").build();
        assert_eq!(reading.validate(), Err(ValidationError::MissingField("device_id")));

        let reading = Reading::builder("dev-1", "  ").build();
        assert_eq!(reading.validate(), Err(ValidationError::MissingField("sensor_type")));

        let reading = Reading::builder("dev-1", "temperature").build();
        assert!(reading.validate().is_ok());
    }

    #[test]
    fn annotations() {
        let mut reading = Reading::builder("dev-1", "temperature").build();
        assert!(!reading.flag(meta::CLAMPED));

        reading.annotate(meta::CLAMPED, true);
        reading.annotate(meta::QUALITY_SCORE, 0.8);

        assert!(reading.flag(meta::CLAMPED));
        assert_eq!(reading.metric(meta::QUALITY_SCORE), Some(0.8));
    }

    #[test]
    fn serde_shape() {
        let reading = Reading::builder("dev-1", "humidity")
            .value(45.0, "%")
            .quality(Quality::Uncertain)
            .build();

        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["device_id"], "dev-1");
        assert_eq!(json["quality"], "uncertain");
        assert!(json.get("location").is_none());
    }
}
