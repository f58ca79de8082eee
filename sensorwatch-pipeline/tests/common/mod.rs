//! Shared fixtures for pipeline integration tests
//!
//! - collaborators that fail on demand, for failure-isolation scenarios
//! - reading and payload builders
//! - a helper draining a queue with a deadline

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sensorwatch_core::{PipelineConfig, Reading};
use sensorwatch_detect::{AlertLevel, AnomalyResult};
use sensorwatch_pipeline::{
    BoundedQueue, MemoryNotifier, MemoryStore, Notifier, ReadingQuery, ReadingStore, SinkError, StoredReading,
};

/// Fixed reference instant for deterministic timestamps
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
}

/// Small, fast configuration for tests
pub fn test_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_queue_capacity(64)
        .with_device_count(3)
        .with_generation_interval(Duration::from_millis(2), Duration::from_millis(5))
}

pub fn reading(device: &str, sensor_type: &str, value: f64) -> Reading {
    Reading::builder(device, sensor_type).raw_value(value).build()
}

/// JSON payload in the ingest wire format
pub fn payload(device: &str, sensor_type: &str, value: f64) -> Vec<u8> {
    serde_json::json!({
        "device_id": device,
        "sensor_type": sensor_type,
        "value": value,
    })
    .to_string()
    .into_bytes()
}

/// Receive `count` items, failing the test if they do not arrive in time
pub async fn drain<T>(queue: &BoundedQueue<T>, count: usize) -> Vec<T> {
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        let item = tokio::time::timeout(Duration::from_secs(2), queue.recv())
            .await
            .expect("queue drained too slowly")
            .expect("queue closed early");
        items.push(item);
    }
    items
}

/// Store delegating to a `MemoryStore` until switched off
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub failing: AtomicBool,
    pub attempts: AtomicUsize,
}

impl FlakyStore {
    pub fn failing() -> Self {
        let store = Self::default();
        store.failing.store(true, Ordering::SeqCst);
        store
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReadingStore for FlakyStore {
    async fn save(&self, reading: &Reading) -> Result<String, SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Unavailable("store offline".into()));
        }
        self.inner.save(reading).await
    }

    async fn query(&self, query: &ReadingQuery) -> Result<Vec<StoredReading>, SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Unavailable("store offline".into()));
        }
        self.inner.query(query).await
    }
}

/// Notifier rejecting anomaly events while recording readings
#[derive(Default)]
pub struct RejectingNotifier {
    pub inner: MemoryNotifier,
    pub rejected: AtomicUsize,
}

#[async_trait]
impl Notifier for RejectingNotifier {
    async fn publish_anomaly(&self, _result: &AnomalyResult, _level: AlertLevel) -> Result<(), SinkError> {
        self.rejected.fetch_add(1, Ordering::SeqCst);
        Err(SinkError::Rejected("topic full".into()))
    }

    async fn publish_reading(&self, reading: &Reading) -> Result<(), SinkError> {
        self.inner.publish_reading(reading).await
    }
}

pub fn memory_sinks() -> (Arc<MemoryStore>, Arc<MemoryNotifier>) {
    (Arc::new(MemoryStore::new()), Arc::new(MemoryNotifier::new()))
}
