//! Constants for SensorWatch
//!
//! Every per-sensor-type table and tuning parameter lives here instead of as
//! magic numbers in the stages and strategies.
//!
//! ## Organization
//!
//! - **Ranges**: plausibility (clamp) ranges, expected ranges, rounding
//!   precision, canonical units and unit conversion factors
//! - **Quality**: quality-score penalties, label cut-offs, freshness windows
//! - **Detection**: strategy defaults, static bounds, fallback detector
//!   tables, alert-level cut-offs
//!
//! Sensor types are matched case-sensitively on their lower-case names.
//! Unknown types take the default entry of each table.

/// Plausibility ranges, precision and unit tables.
pub mod ranges;

/// Quality scoring parameters.
pub mod quality;

/// Detection strategy parameters and lookup tables.
pub mod detection;

/// Closed interval of acceptable values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    /// Lower bound (inclusive)
    pub min: f64,
    /// Upper bound (inclusive)
    pub max: f64,
}

impl ValueRange {
    /// Create a range from its bounds
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Create a range, swapping the bounds if given in the wrong order
    pub fn ordered(a: f64, b: f64) -> Self {
        if a > b {
            Self::new(b, a)
        } else {
            Self::new(a, b)
        }
    }

    /// Range covering every finite f64
    pub const fn unbounded() -> Self {
        Self { min: f64::MIN, max: f64::MAX }
    }

    /// Whether `value` lies inside the range
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Centre of the range
    pub fn midpoint(&self) -> f64 {
        self.min / 2.0 + self.max / 2.0
    }

    /// Distance between the bounds
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Clamp `value` into the range
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

pub use detection::{
    DEFAULT_HISTORY_SIZE, DEFAULT_STATISTICAL_THRESHOLD, DEFAULT_TIME_SERIES_THRESHOLD,
};
pub use ranges::{clamp_range, expected_range, precision};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_helpers() {
        let range = ValueRange::new(0.0, 100.0);
        assert!(range.contains(0.0));
        assert!(range.contains(100.0));
        assert!(!range.contains(100.1));
        assert_eq!(range.midpoint(), 50.0);
        assert_eq!(range.width(), 100.0);
        assert_eq!(range.clamp(-3.0), 0.0);
    }

    #[test]
    fn swapped_bounds() {
        let range = ValueRange::ordered(10.0, -10.0);
        assert_eq!(range.min, -10.0);
        assert_eq!(range.max, 10.0);
    }

    #[test]
    fn unbounded_midpoint_is_finite() {
        assert!(ValueRange::unbounded().midpoint().is_finite());
    }
}
