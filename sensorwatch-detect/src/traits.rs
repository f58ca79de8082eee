//! Detector abstraction used by the orchestrator

use std::sync::Arc;

use sensorwatch_core::Reading;

use crate::result::AnomalyResult;

/// Stateful anomaly detector
///
/// Implementations own their per-key history and record the candidate after
/// evaluating it. Implemented by both `AnomalyEngine` (registered strategies)
/// and `FallbackDetector` (fixed rules); callers pick one, the two are never
/// merged.
pub trait Detector: Send + Sync {
    /// Name used in logs and result annotations
    fn name(&self) -> &str;

    /// Evaluate a reading and record it into history
    fn evaluate(&self, reading: &Reading) -> Option<AnomalyResult>;
}

impl<D: Detector + ?Sized> Detector for Arc<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn evaluate(&self, reading: &Reading) -> Option<AnomalyResult> {
        (**self).evaluate(reading)
    }
}
