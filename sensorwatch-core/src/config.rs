//! Pipeline configuration
//!
//! Configuration is owned by the caller and handed in as plain key/value
//! pairs (environment, a settings file, a test). `PipelineConfig::from_pairs`
//! parses that surface; the builder methods cover programmatic setup.
//!
//! ```
//! use sensorwatch_core::PipelineConfig;
//!
//! let config = PipelineConfig::from_pairs([
//!     ("queue_capacity", "250"),
//!     ("statistical_threshold", "3.0"),
//! ])?;
//! assert_eq!(config.queue_capacity, 250);
//! assert_eq!(config.history_size, 100);
//! # Ok::<(), sensorwatch_core::ConfigError>(())
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::detection::{
    DEFAULT_HISTORY_SIZE, DEFAULT_STATISTICAL_THRESHOLD, DEFAULT_TIME_SERIES_THRESHOLD,
};
use crate::errors::ConfigError;

/// Default capacity of every pipeline queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Default number of simulated devices
pub const DEFAULT_DEVICE_COUNT: usize = 5;

/// Default lower bound of the generator interval (ms)
pub const DEFAULT_GENERATION_INTERVAL_MIN_MS: u64 = 5_000;

/// Default upper bound of the generator interval (ms)
pub const DEFAULT_GENERATION_INTERVAL_MAX_MS: u64 = 10_000;

/// Name of the strategy used when a lookup misses
pub const DEFAULT_STRATEGY: &str = "statistical";

/// Settings for the whole pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Capacity of each bounded queue
    pub queue_capacity: usize,
    /// Per-key history length kept by the detection engine
    pub history_size: usize,
    /// z-score above which the statistical strategy reports an anomaly
    pub statistical_threshold: f64,
    /// Relative deviation above which the time-series strategy reports an anomaly
    pub time_series_threshold: f64,
    /// Strategy used when a name lookup misses
    pub default_strategy: String,
    /// Number of simulated devices driven by the generator
    pub device_count: usize,
    /// Shortest pause between two readings of a simulated device (ms)
    pub generation_interval_min_ms: u64,
    /// Longest pause between two readings of a simulated device (ms)
    pub generation_interval_max_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            history_size: DEFAULT_HISTORY_SIZE,
            statistical_threshold: DEFAULT_STATISTICAL_THRESHOLD,
            time_series_threshold: DEFAULT_TIME_SERIES_THRESHOLD,
            default_strategy: DEFAULT_STRATEGY.to_string(),
            device_count: DEFAULT_DEVICE_COUNT,
            generation_interval_min_ms: DEFAULT_GENERATION_INTERVAL_MIN_MS,
            generation_interval_max_ms: DEFAULT_GENERATION_INTERVAL_MAX_MS,
        }
    }
}

impl PipelineConfig {
    /// Parse the key/value configuration surface
    ///
    /// Keys not given keep their defaults. Unknown keys are rejected so a
    /// typo does not silently fall back to a default.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();

        for (key, value) in pairs {
            let (key, value) = (key.as_ref().trim(), value.as_ref().trim());
            match key {
                "queue_capacity" => config.queue_capacity = parse(key, value)?,
                "history_size" => config.history_size = parse(key, value)?,
                "statistical_threshold" => config.statistical_threshold = parse(key, value)?,
                "time_series_threshold" => config.time_series_threshold = parse(key, value)?,
                "default_strategy" => config.default_strategy = value.to_string(),
                "device_count" => config.device_count = parse(key, value)?,
                "generation_interval_min_ms" => config.generation_interval_min_ms = parse(key, value)?,
                "generation_interval_max_ms" => config.generation_interval_max_ms = parse(key, value)?,
                other => return Err(ConfigError::UnknownKey(other.to_string())),
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check bounds that the type system cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::invalid("queue_capacity", self.queue_capacity, "must be at least 1"));
        }
        if self.history_size == 0 {
            return Err(ConfigError::invalid("history_size", self.history_size, "must be at least 1"));
        }
        if !(self.statistical_threshold.is_finite() && self.statistical_threshold > 0.0) {
            return Err(ConfigError::invalid(
                "statistical_threshold",
                self.statistical_threshold,
                "must be a positive number",
            ));
        }
        if !(self.time_series_threshold.is_finite() && self.time_series_threshold > 0.0) {
            return Err(ConfigError::invalid(
                "time_series_threshold",
                self.time_series_threshold,
                "must be a positive number",
            ));
        }
        if self.default_strategy.is_empty() {
            return Err(ConfigError::invalid("default_strategy", "", "must not be empty"));
        }
        if self.generation_interval_min_ms > self.generation_interval_max_ms {
            return Err(ConfigError::invalid(
                "generation_interval_min_ms",
                self.generation_interval_min_ms,
                "must not exceed generation_interval_max_ms",
            ));
        }
        Ok(())
    }

    /// Set queue capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set per-key history length
    pub fn with_history_size(mut self, size: usize) -> Self {
        self.history_size = size;
        self
    }

    /// Set statistical (z-score) threshold
    pub fn with_statistical_threshold(mut self, threshold: f64) -> Self {
        self.statistical_threshold = threshold;
        self
    }

    /// Set time-series deviation threshold
    pub fn with_time_series_threshold(mut self, threshold: f64) -> Self {
        self.time_series_threshold = threshold;
        self
    }

    /// Set the fallback strategy name
    pub fn with_default_strategy(mut self, name: impl Into<String>) -> Self {
        self.default_strategy = name.into();
        self
    }

    /// Set the number of simulated devices
    pub fn with_device_count(mut self, count: usize) -> Self {
        self.device_count = count;
        self
    }

    /// Set the generator interval range
    pub fn with_generation_interval(mut self, min: Duration, max: Duration) -> Self {
        self.generation_interval_min_ms = min.as_millis() as u64;
        self.generation_interval_max_ms = max.as_millis() as u64;
        self
    }

    /// Generator interval range as durations
    pub fn generation_interval(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.generation_interval_min_ms),
            Duration::from_millis(self.generation_interval_max_ms),
        )
    }

    /// Settings relevant to the detection engine
    pub fn detection(&self) -> DetectionConfig {
        DetectionConfig {
            history_size: self.history_size,
            statistical_threshold: self.statistical_threshold,
            time_series_threshold: self.time_series_threshold,
            default_strategy: self.default_strategy.clone(),
        }
    }
}

/// Detection engine settings derived from `PipelineConfig`
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Per-key history length
    pub history_size: usize,
    /// Statistical strategy threshold
    pub statistical_threshold: f64,
    /// Time-series strategy threshold
    pub time_series_threshold: f64,
    /// Strategy used when a name lookup misses
    pub default_strategy: String,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        PipelineConfig::default().detection()
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::invalid(key, value, "could not be parsed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.queue_capacity, 1000);
        assert_eq!(config.history_size, 100);
        assert_eq!(config.statistical_threshold, 2.5);
        assert_eq!(config.time_series_threshold, 0.3);
        assert_eq!(config.default_strategy, "statistical");
        assert_eq!(
            config.generation_interval(),
            (Duration::from_secs(5), Duration::from_secs(10))
        );
    }

    #[test]
    fn from_pairs_overrides() {
        let config = PipelineConfig::from_pairs([
            ("queue_capacity", "16"),
            ("history_size", " 50 "),
            ("time_series_threshold", "0.5"),
            ("device_count", "3"),
        ])
        .unwrap();

        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.history_size, 50);
        assert_eq!(config.time_series_threshold, 0.5);
        assert_eq!(config.device_count, 3);
        assert_eq!(config.statistical_threshold, 2.5);
    }

    #[test]
    fn from_pairs_rejects_unknown_key() {
        let err = PipelineConfig::from_pairs([("queue_capactiy", "16")]).unwrap_err();
        assert_eq!(err, ConfigError::UnknownKey("queue_capactiy".to_string()));
    }

    #[test]
    fn from_pairs_rejects_bad_values() {
        assert!(matches!(
            PipelineConfig::from_pairs([("queue_capacity", "lots")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            PipelineConfig::from_pairs([("queue_capacity", "0")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            PipelineConfig::from_pairs([("statistical_threshold", "-1")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            PipelineConfig::from_pairs([
                ("generation_interval_min_ms", "2000"),
                ("generation_interval_max_ms", "1000"),
            ]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn deserializes_partial_json() {
        let config: PipelineConfig = serde_json::from_str(r#"{"history_size": 20}"#).unwrap();
        assert_eq!(config.history_size, 20);
        assert_eq!(config.queue_capacity, 1000);
    }

    #[test]
    fn detection_view() {
        let detection = PipelineConfig::default()
            .with_statistical_threshold(3.0)
            .with_default_strategy("threshold")
            .detection();

        assert_eq!(detection.statistical_threshold, 3.0);
        assert_eq!(detection.default_strategy, "threshold");
        assert_eq!(detection.history_size, 100);
    }
}
