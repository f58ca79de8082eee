//! Cleaning Stage: range clamping and precision rounding
//!
//! ## Steps
//!
//! For sensor types with a plausibility range:
//! 1. Non-finite values (NaN, ±∞) are replaced by the range midpoint
//! 2. The value is clamped into the range
//! 3. The value is rounded to the type's decimal precision
//!
//! ```text
//! temperature  NaN      → 25.0     (midpoint of [-100, 150])
//! temperature  212.3456 → 150.0    (clamped)
//! humidity     45.66    → 45.7     (1 decimal)
//! co2          812.345  → 812.345  (unknown type, untouched)
//! ```
//!
//! Sensor types without a range pass through with their value untouched;
//! the stage only flags a non-finite value so enrichment can score it.
//!
//! ## Annotations
//!
//! When the value changes, the original is kept under `meta::RAW_VALUE`.
//! `meta::NON_FINITE` and `meta::CLAMPED` record what happened. Flags are
//! only ever set, never cleared, so cleaning an already-cleaned reading is a
//! no-op.

use crate::constants::ranges::{clamp_range, precision, round_to};
use crate::reading::{meta, Reading};

/// Outcome of cleaning a single value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanedValue {
    /// Value after repair, clamping and rounding
    pub value: f64,
    /// Input was NaN or infinite
    pub non_finite: bool,
    /// Input lay outside the plausibility range
    pub clamped: bool,
}

/// Clean one value for a sensor type
///
/// Deterministic and total: every input maps to an output.
pub fn clean_value(sensor_type: &str, value: f64) -> CleanedValue {
    let non_finite = !value.is_finite();

    let Some(range) = clamp_range(sensor_type) else {
        return CleanedValue { value, non_finite, clamped: false };
    };

    let repaired = if non_finite { range.midpoint() } else { value };
    let clamped = !range.contains(repaired);
    let bounded = range.clamp(repaired);

    CleanedValue {
        value: round_to(bounded, precision(sensor_type)),
        non_finite,
        clamped,
    }
}

/// Stage applying `clean_value` to whole readings
#[derive(Debug, Clone, Copy, Default)]
pub struct CleaningStage;

impl CleaningStage {
    /// Create the stage
    pub fn new() -> Self {
        Self
    }

    /// Clean a reading, annotating what was changed
    pub fn clean(&self, mut reading: Reading) -> Reading {
        let original = reading.value;
        let cleaned = clean_value(&reading.sensor_type, original);

        if cleaned.non_finite {
            reading.annotate(meta::NON_FINITE, true);
        }
        if cleaned.clamped {
            reading.annotate(meta::CLAMPED, true);
        }
        // Bitwise so an untouched NaN counts as unchanged
        if cleaned.value.to_bits() != original.to_bits() && !reading.metadata.contains_key(meta::RAW_VALUE) {
            reading.annotate(meta::RAW_VALUE, original);
        }

        if cleaned.clamped || cleaned.non_finite {
            log::debug!(
                "cleaning: {}/{} value {} repaired to {}",
                reading.device_id,
                reading.sensor_type,
                original,
                cleaned.value
            );
        }

        reading.value = cleaned.value;
        reading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ranges::TEMPERATURE_CLAMP;

    fn reading(sensor_type: &str, value: f64) -> Reading {
        Reading::builder("dev-1", sensor_type).raw_value(value).build()
    }

    #[test]
    fn clamps_to_type_range() {
        assert_eq!(clean_value("temperature", 212.3456).value, 150.0);
        assert_eq!(clean_value("humidity", -4.0).value, 0.0);
        assert_eq!(clean_value("pressure", 2500.0).value, 2000.0);
        assert_eq!(clean_value("ph", 15.2).value, 14.0);
        assert_eq!(clean_value("voltage", -60.0).value, -50.0);
        assert_eq!(clean_value("current", 101.0).value, 100.0);
    }

    #[test]
    fn non_finite_maps_to_midpoint() {
        let cleaned = clean_value("temperature", f64::NAN);
        assert_eq!(cleaned.value, TEMPERATURE_CLAMP.midpoint());
        assert!(cleaned.non_finite);
        assert!(!cleaned.clamped);

        assert_eq!(clean_value("humidity", f64::INFINITY).value, 50.0);
        assert_eq!(clean_value("voltage", f64::NEG_INFINITY).value, 0.0);
    }

    #[test]
    fn rounds_to_type_precision() {
        assert_eq!(clean_value("temperature", 21.456).value, 21.46);
        assert_eq!(clean_value("humidity", 45.66).value, 45.7);
        assert_eq!(clean_value("voltage", 3.30049).value, 3.3);
        assert_eq!(clean_value("current", 1.23456).value, 1.235);
    }

    #[test]
    fn unknown_types_pass_through() {
        assert_eq!(clean_value("co2", 812.345).value, 812.345);
        assert!(clean_value("co2", f64::NAN).value.is_nan());
        assert!(clean_value("co2", f64::NAN).non_finite);
    }

    #[test]
    fn annotates_changes() {
        let stage = CleaningStage::new();

        let cleaned = stage.clean(reading("temperature", 500.0));
        assert_eq!(cleaned.value, 150.0);
        assert!(cleaned.flag(meta::CLAMPED));
        assert_eq!(cleaned.metric(meta::RAW_VALUE), Some(500.0));

        let untouched = stage.clean(reading("temperature", 20.5));
        assert!(untouched.metadata.is_empty());

        let broken = stage.clean(reading("humidity", f64::NAN));
        assert!(broken.flag(meta::NON_FINITE));
        assert_eq!(broken.value, 50.0);
    }

    #[test]
    fn cleaning_twice_is_stable() {
        let stage = CleaningStage::new();
        let once = stage.clean(reading("pressure", f64::NAN));
        let twice = stage.clean(once.clone());

        assert_eq!(once.value, twice.value);
        assert_eq!(once.metadata, twice.metadata);
    }
}
