//! Processing Orchestrator
//!
//! Last stage of the pipeline. For every reading, in order:
//!
//! 1. validate device id and sensor type (invalid readings are dropped)
//! 2. stamp `meta::PROCESSED_AT`
//! 3. persist through the `ReadingStore`
//! 4. run the detector and publish any result with its alert level
//! 5. publish the reading through the `Notifier`
//! 6. forward the reading to the downstream queue, if one is attached
//!
//! Steps 3 to 6 are independent: a failing store does not stop detection,
//! a failing notifier does not stop forwarding. Every failure is logged and
//! counted, nothing is retried, and the loop moves on to the next reading.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sensorwatch_core::time::{Clock, SystemClock};
use sensorwatch_core::{meta, Reading};
use sensorwatch_detect::{AlertLevel, AnomalyResult, Detector};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::errors::PipelineResult;
use crate::queue::BoundedQueue;
use crate::sinks::{Notifier, ReadingStore};

/// Orchestrator counters
#[derive(Debug, Default)]
pub struct ProcessingStats {
    received: AtomicU64,
    invalid: AtomicU64,
    persisted: AtomicU64,
    persist_failures: AtomicU64,
    anomalies: AtomicU64,
    alerts: AtomicU64,
    publish_failures: AtomicU64,
    forwarded: AtomicU64,
    forward_failures: AtomicU64,
}

/// Point-in-time copy of `ProcessingStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingStatsSnapshot {
    /// Readings handed to `process`
    pub received: u64,
    /// Readings dropped by validation
    pub invalid: u64,
    pub persisted: u64,
    pub persist_failures: u64,
    /// Detection results published, alertable or not
    pub anomalies: u64,
    /// Results routed to an alert level above `None`
    pub alerts: u64,
    /// Failed anomaly or reading publications
    pub publish_failures: u64,
    pub forwarded: u64,
    pub forward_failures: u64,
}

impl ProcessingStats {
    pub fn snapshot(&self) -> ProcessingStatsSnapshot {
        let get = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        ProcessingStatsSnapshot {
            received: get(&self.received),
            invalid: get(&self.invalid),
            persisted: get(&self.persisted),
            persist_failures: get(&self.persist_failures),
            anomalies: get(&self.anomalies),
            alerts: get(&self.alerts),
            publish_failures: get(&self.publish_failures),
            forwarded: get(&self.forwarded),
            forward_failures: get(&self.forward_failures),
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// What happened to one processed reading
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessReport {
    /// Id assigned by the store, if persisting succeeded
    pub stored_id: Option<String>,
    /// Detection result, if the detector produced one
    pub anomaly: Option<AnomalyResult>,
    /// Routed level of `anomaly` (`None` when absent or not alertable)
    pub alert_level: AlertLevel,
    /// Whether the reading itself was published
    pub published: bool,
    /// Whether the reading reached the downstream queue
    pub forwarded: bool,
}

/// Sequences validation, persistence, detection, publishing and forwarding
pub struct Orchestrator<D: Detector, C: Clock = SystemClock> {
    detector: Arc<D>,
    store: Arc<dyn ReadingStore>,
    notifier: Arc<dyn Notifier>,
    downstream: Option<Arc<BoundedQueue<Reading>>>,
    clock: C,
    stats: Arc<ProcessingStats>,
}

impl<D: Detector> Orchestrator<D, SystemClock> {
    pub fn new(detector: Arc<D>, store: Arc<dyn ReadingStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            detector,
            store,
            notifier,
            downstream: None,
            clock: SystemClock,
            stats: Arc::new(ProcessingStats::default()),
        }
    }
}

impl<D: Detector, C: Clock> Orchestrator<D, C> {
    /// Use `clock` for the processing stamp
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Orchestrator<D, C2> {
        Orchestrator {
            detector: self.detector,
            store: self.store,
            notifier: self.notifier,
            downstream: self.downstream,
            clock,
            stats: self.stats,
        }
    }

    /// Forward processed readings to `queue`
    pub fn with_downstream(mut self, queue: Arc<BoundedQueue<Reading>>) -> Self {
        self.downstream = Some(queue);
        self
    }

    /// Shared handle to the counters
    pub fn stats(&self) -> Arc<ProcessingStats> {
        Arc::clone(&self.stats)
    }

    pub fn detector(&self) -> &Arc<D> {
        &self.detector
    }

    /// Process one reading
    ///
    /// Only validation failures are returned; every later step reports its
    /// outcome in the `ProcessReport`.
    pub async fn process(&self, mut reading: Reading) -> PipelineResult<ProcessReport> {
        bump(&self.stats.received);

        if let Err(e) = reading.validate() {
            bump(&self.stats.invalid);
            log::warn!(
                "orchestrator: dropping reading {}/{}: {}",
                reading.device_id,
                reading.sensor_type,
                e
            );
            return Err(e.into());
        }

        reading.annotate(meta::PROCESSED_AT, self.clock.now().to_rfc3339());

        let stored_id = match self.store.save(&reading).await {
            Ok(id) => {
                bump(&self.stats.persisted);
                Some(id)
            }
            Err(e) => {
                bump(&self.stats.persist_failures);
                log::error!(
                    "orchestrator: persist failed for {}/{}: {}",
                    reading.device_id,
                    reading.sensor_type,
                    e
                );
                None
            }
        };

        let anomaly = self.detector.evaluate(&reading);
        let mut alert_level = AlertLevel::None;
        if let Some(result) = &anomaly {
            alert_level = result.alert_level();
            bump(&self.stats.anomalies);
            if alert_level != AlertLevel::None {
                bump(&self.stats.alerts);
            }
            log::debug!(
                "orchestrator: {}/{} {} ({:?}, severity {:.2}) routed to {}",
                result.device_id,
                result.sensor_type,
                result.kind,
                result.status,
                result.severity,
                alert_level
            );

            if let Err(e) = self.notifier.publish_anomaly(result, alert_level).await {
                bump(&self.stats.publish_failures);
                log::error!(
                    "orchestrator: anomaly publish failed for {}/{}: {}",
                    reading.device_id,
                    reading.sensor_type,
                    e
                );
            }
        }

        let published = match self.notifier.publish_reading(&reading).await {
            Ok(()) => true,
            Err(e) => {
                bump(&self.stats.publish_failures);
                log::error!(
                    "orchestrator: reading publish failed for {}/{}: {}",
                    reading.device_id,
                    reading.sensor_type,
                    e
                );
                false
            }
        };

        let forwarded = match &self.downstream {
            None => false,
            Some(queue) => match queue.write(reading).await {
                Ok(()) => {
                    bump(&self.stats.forwarded);
                    true
                }
                Err(e) => {
                    bump(&self.stats.forward_failures);
                    log::error!("orchestrator: forward failed: {}", e);
                    false
                }
            },
        };

        Ok(ProcessReport {
            stored_id,
            anomaly,
            alert_level,
            published,
            forwarded,
        })
    }

    /// Process readings from `input` until cancelled or drained
    ///
    /// A reading in flight when the token fires is abandoned.
    pub async fn run(&self, input: Arc<BoundedQueue<Reading>>, token: CancellationToken) {
        log::info!(
            "stage orchestrator: started ({}, detector {})",
            input.name(),
            self.detector.name()
        );

        loop {
            let reading = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                next = input.recv() => match next {
                    Some(reading) => reading,
                    None => break,
                },
            };

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                // Validation failures are already logged and counted
                _ = self.process(reading) => {}
            }
        }

        let stats = self.stats.snapshot();
        log::info!(
            "stage orchestrator: stopped after {} readings ({} invalid, {} alerts)",
            stats.received,
            stats.invalid,
            stats.alerts
        );
    }
}
