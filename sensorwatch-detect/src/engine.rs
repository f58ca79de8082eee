//! Anomaly Detection Engine
//!
//! Owns one bounded `SensorHistory` per (device, sensor type) key and the
//! instantiated strategies. Every public detection call follows the same
//! sequence under the history lock:
//!
//! ```text
//! lock → snapshot key history → run strategy → append candidate → unlock
//! ```
//!
//! Appending after detection keeps a reading from being compared against
//! itself. Holding the lock across the whole sequence makes concurrent
//! callers for the same key observe each other's readings in a single,
//! consistent order.
//!
//! Non-finite values never reach a strategy: they are reported as
//! `DataCorruption` with severity 1.0 and are not recorded.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use sensorwatch_core::reading::meta;
use sensorwatch_core::{DetectionConfig, Reading};

use crate::history::{HistoryKey, HistoryPoint, SensorHistory};
use crate::registry::{strategy_for_sensor_type, StrategyRegistry};
use crate::result::{AnomalyKind, AnomalyResult};
use crate::strategies::DetectionStrategy;
use crate::traits::Detector;

/// Strategy-driven detector with explicit per-key history
pub struct AnomalyEngine {
    strategies: BTreeMap<&'static str, Box<dyn DetectionStrategy>>,
    default_strategy: String,
    history_size: usize,
    histories: Mutex<HashMap<HistoryKey, SensorHistory>>,
}

impl AnomalyEngine {
    /// Engine with the built-in strategies
    pub fn new(config: DetectionConfig) -> Self {
        Self::with_registry(&StrategyRegistry::builtin(), config)
    }

    /// Engine instantiating every strategy in `registry`
    pub fn with_registry(registry: &StrategyRegistry, config: DetectionConfig) -> Self {
        let strategies = registry.instantiate_all(&config);
        if !strategies.contains_key(config.default_strategy.as_str()) {
            log::warn!(
                "engine: default strategy {:?} is not registered",
                config.default_strategy
            );
        }

        Self {
            strategies,
            default_strategy: config.default_strategy,
            history_size: config.history_size,
            histories: Mutex::new(HashMap::new()),
        }
    }

    /// Detect with the strategy auto-selected for the reading's sensor type
    pub fn detect(&self, reading: &Reading) -> Option<AnomalyResult> {
        self.detect_with(strategy_for_sensor_type(&reading.sensor_type), reading)
    }

    /// Detect with a named strategy, falling back to the default strategy
    pub fn detect_with(&self, name: &str, reading: &Reading) -> Option<AnomalyResult> {
        let Some(strategy) = self.strategy(name) else {
            log::warn!(
                "engine: no strategy {:?} or default {:?}; {}/{} recorded unevaluated",
                name,
                self.default_strategy,
                reading.device_id,
                reading.sensor_type
            );
            self.with_history(reading, |_| ());
            return None;
        };

        if let Some(corrupt) = corruption(reading, strategy.name()) {
            return Some(corrupt);
        }

        self.with_history(reading, |history| {
            strategy
                .detect(reading, history)
                .map(|result| result.with_info(meta::DETECTOR, strategy.name()))
        })
    }

    /// Run every strategy that can handle the reading's sensor type
    ///
    /// The candidate is recorded once, after all strategies ran.
    pub fn detect_all(&self, reading: &Reading) -> Vec<AnomalyResult> {
        if let Some(corrupt) = corruption(reading, "engine") {
            return vec![corrupt];
        }

        self.with_history(reading, |history| {
            self.strategies
                .values()
                .filter(|strategy| strategy.can_handle(&reading.sensor_type))
                .filter_map(|strategy| {
                    strategy
                        .detect(reading, history)
                        .map(|result| result.with_info(meta::DETECTOR, strategy.name()))
                })
                .collect()
        })
    }

    /// Names of the instantiated strategies
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.keys().copied().collect()
    }

    /// Number of points recorded for a key
    pub fn history_len(&self, device_id: &str, sensor_type: &str) -> usize {
        self.lock()
            .get(&HistoryKey::new(device_id, sensor_type))
            .map_or(0, SensorHistory::len)
    }

    /// Forget the history of one key; returns whether it existed
    pub fn clear_history(&self, device_id: &str, sensor_type: &str) -> bool {
        self.lock()
            .remove(&HistoryKey::new(device_id, sensor_type))
            .is_some()
    }

    /// Forget every key
    pub fn clear_all(&self) {
        self.lock().clear();
    }

    /// Keys with recorded history, sorted
    pub fn tracked_keys(&self) -> Vec<HistoryKey> {
        let mut keys: Vec<HistoryKey> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn strategy(&self, name: &str) -> Option<&dyn DetectionStrategy> {
        self.strategies
            .get(name)
            .or_else(|| self.strategies.get(self.default_strategy.as_str()))
            .map(|strategy| strategy.as_ref())
    }

    /// Run `f` over the key's history, then record the candidate
    fn with_history<R>(&self, reading: &Reading, f: impl FnOnce(&[HistoryPoint]) -> R) -> R {
        let mut histories = self.lock();
        let history = histories
            .entry(HistoryKey::of(reading))
            .or_insert_with(|| SensorHistory::new(self.history_size));

        let outcome = f(history.as_slice());
        history.push(HistoryPoint::from(reading));
        outcome
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<HistoryKey, SensorHistory>> {
        self.histories.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for AnomalyEngine {
    fn default() -> Self {
        Self::new(DetectionConfig::default())
    }
}

impl Detector for AnomalyEngine {
    fn name(&self) -> &str {
        "anomaly_engine"
    }

    fn evaluate(&self, reading: &Reading) -> Option<AnomalyResult> {
        self.detect(reading)
    }
}

/// `DataCorruption` result for readings whose value is not a number
pub(crate) fn corruption(reading: &Reading, detector: &str) -> Option<AnomalyResult> {
    if reading.value.is_finite() {
        return None;
    }
    Some(
        AnomalyResult::anomaly(
            reading,
            AnomalyKind::DataCorruption,
            1.0,
            format!("non-finite value {}", reading.value),
        )
        .with_info(meta::DETECTOR, detector),
    )
}
