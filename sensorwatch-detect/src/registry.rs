//! Strategy registry
//!
//! Maps strategy names to constructors. Lookups that miss fall back to the
//! configured default strategy, so a misconfigured name degrades to the
//! statistical check instead of disabling detection.
//!
//! ## Auto-selection
//!
//! | Sensor type | Strategy |
//! |-------------|----------|
//! | temperature, humidity, pressure | time_series |
//! | switch, motion, door | threshold |
//! | anything else | statistical |

use std::collections::BTreeMap;

use sensorwatch_core::constants::detection::{CONTINUOUS_TYPES, DISCRETE_TYPES};
use sensorwatch_core::DetectionConfig;

use crate::strategies::{
    DetectionStrategy, StatisticalStrategy, ThresholdStrategy, TimeSeriesStrategy,
};

/// Builds a strategy from detection settings
pub type StrategyConstructor = fn(&DetectionConfig) -> Box<dyn DetectionStrategy>;

fn statistical(config: &DetectionConfig) -> Box<dyn DetectionStrategy> {
    Box::new(StatisticalStrategy::new(config.statistical_threshold))
}

fn time_series(config: &DetectionConfig) -> Box<dyn DetectionStrategy> {
    Box::new(TimeSeriesStrategy::new(config.time_series_threshold))
}

fn threshold(_config: &DetectionConfig) -> Box<dyn DetectionStrategy> {
    Box::new(ThresholdStrategy::default())
}

/// Strategy name auto-selected for a sensor type
pub fn strategy_for_sensor_type(sensor_type: &str) -> &'static str {
    if CONTINUOUS_TYPES.contains(&sensor_type) {
        TimeSeriesStrategy::NAME
    } else if DISCRETE_TYPES.contains(&sensor_type) {
        ThresholdStrategy::NAME
    } else {
        StatisticalStrategy::NAME
    }
}

/// Name → constructor table
#[derive(Clone)]
pub struct StrategyRegistry {
    constructors: BTreeMap<&'static str, StrategyConstructor>,
}

impl StrategyRegistry {
    /// Registry without any strategies
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Registry with the three built-in strategies
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(StatisticalStrategy::NAME, statistical);
        registry.register(TimeSeriesStrategy::NAME, time_series);
        registry.register(ThresholdStrategy::NAME, threshold);
        registry
    }

    /// Add or replace a constructor
    pub fn register(&mut self, name: &'static str, constructor: StrategyConstructor) {
        self.constructors.insert(name, constructor);
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        self.constructors.keys().copied().collect()
    }

    /// Construct `name`, or the configured default if `name` is unknown
    ///
    /// Returns `None` only when neither is registered.
    pub fn create(&self, name: &str, config: &DetectionConfig) -> Option<Box<dyn DetectionStrategy>> {
        let constructor = match self.constructors.get(name) {
            Some(constructor) => constructor,
            None => {
                log::debug!(
                    "registry: unknown strategy {:?}, using {:?}",
                    name,
                    config.default_strategy
                );
                self.constructors.get(config.default_strategy.as_str())?
            }
        };
        Some(constructor(config))
    }

    /// Auto-selected strategy for a sensor type
    pub fn for_sensor_type(
        &self,
        sensor_type: &str,
        config: &DetectionConfig,
    ) -> Option<Box<dyn DetectionStrategy>> {
        self.create(strategy_for_sensor_type(sensor_type), config)
    }

    /// Every registered strategy that can handle `sensor_type`
    pub fn applicable(&self, sensor_type: &str, config: &DetectionConfig) -> Vec<Box<dyn DetectionStrategy>> {
        self.instantiate_all(config)
            .into_values()
            .filter(|strategy| strategy.can_handle(sensor_type))
            .collect()
    }

    /// One instance of every registered strategy, keyed by name
    pub fn instantiate_all(&self, config: &DetectionConfig) -> BTreeMap<&'static str, Box<dyn DetectionStrategy>> {
        self.constructors
            .iter()
            .map(|(name, constructor)| (*name, constructor(config)))
            .collect()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names() {
        let registry = StrategyRegistry::builtin();
        assert_eq!(registry.names(), vec!["statistical", "threshold", "time_series"]);
    }

    #[test]
    fn create_uses_configured_thresholds() {
        let config = DetectionConfig {
            statistical_threshold: 3.5,
            time_series_threshold: 0.25,
            ..DetectionConfig::default()
        };
        let registry = StrategyRegistry::builtin();

        assert_eq!(registry.create("statistical", &config).unwrap().threshold(), 3.5);
        assert_eq!(registry.create("time_series", &config).unwrap().threshold(), 0.25);
    }

    #[test]
    fn unknown_name_falls_back_to_default() {
        let registry = StrategyRegistry::builtin();
        let strategy = registry.create("isolation_forest", &DetectionConfig::default()).unwrap();
        assert_eq!(strategy.name(), "statistical");

        let config = DetectionConfig {
            default_strategy: "threshold".to_string(),
            ..DetectionConfig::default()
        };
        assert_eq!(registry.create("nope", &config).unwrap().name(), "threshold");

        assert!(StrategyRegistry::empty().create("statistical", &config).is_none());
    }

    #[test]
    fn auto_selection() {
        assert_eq!(strategy_for_sensor_type("temperature"), "time_series");
        assert_eq!(strategy_for_sensor_type("pressure"), "time_series");
        assert_eq!(strategy_for_sensor_type("door"), "threshold");
        assert_eq!(strategy_for_sensor_type("motion"), "threshold");
        assert_eq!(strategy_for_sensor_type("voltage"), "statistical");
        assert_eq!(strategy_for_sensor_type("lux"), "statistical");

        let registry = StrategyRegistry::builtin();
        let strategy = registry.for_sensor_type("humidity", &DetectionConfig::default()).unwrap();
        assert_eq!(strategy.name(), "time_series");
    }

    #[test]
    fn applicable_filters_by_can_handle() {
        let registry = StrategyRegistry::builtin();
        let config = DetectionConfig::default();

        let names: Vec<&str> = registry.applicable("door", &config).iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["statistical", "threshold"]);

        assert_eq!(registry.applicable("temperature", &config).len(), 3);
    }
}
