//! Persistence and notification collaborators
//!
//! The orchestrator talks to the outside world through two async traits:
//!
//! - `ReadingStore`: durable storage of processed readings, keyed by an
//!   opaque id and queryable by device, sensor type and time range
//! - `Notifier`: fan-out of anomaly events and processed readings to
//!   whoever is listening (dashboards, alerting)
//!
//! Real deployments implement these against a document store and a push
//! transport. `MemoryStore` and `MemoryNotifier` are complete in-process
//! implementations for tests, demos and single-node use.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sensorwatch_core::Reading;
use sensorwatch_detect::{AlertLevel, AnomalyResult};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::SinkError;

/// Reading as stored, with its assigned id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredReading {
    pub id: String,
    pub reading: Reading,
}

/// Filter for `ReadingStore::query`; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingQuery {
    pub device_id: Option<String>,
    pub sensor_type: Option<String>,
    /// Inclusive lower bound on the reading timestamp
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the reading timestamp
    pub to: Option<DateTime<Utc>>,
}

impl ReadingQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn sensor_type(mut self, sensor_type: impl Into<String>) -> Self {
        self.sensor_type = Some(sensor_type.into());
        self
    }

    pub fn since(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn until(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    /// Whether a reading passes the filter
    pub fn matches(&self, reading: &Reading) -> bool {
        self.device_id.as_deref().map_or(true, |d| d == reading.device_id)
            && self.sensor_type.as_deref().map_or(true, |t| t == reading.sensor_type)
            && self.from.map_or(true, |from| reading.timestamp >= from)
            && self.to.map_or(true, |to| reading.timestamp <= to)
    }
}

/// Durable store for processed readings
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Persist a reading; returns the id it was stored under
    async fn save(&self, reading: &Reading) -> Result<String, SinkError>;

    /// Readings matching `query`, oldest first
    async fn query(&self, query: &ReadingQuery) -> Result<Vec<StoredReading>, SinkError>;
}

/// Fan-out for anomalies and processed readings
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publish a detection result with its routed alert level
    async fn publish_anomaly(&self, result: &AnomalyResult, level: AlertLevel) -> Result<(), SinkError>;

    /// Publish a processed reading
    async fn publish_reading(&self, reading: &Reading) -> Result<(), SinkError>;
}

/// In-memory `ReadingStore`
///
/// Grows without bound; meant for tests and bounded demo runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<StoredReading>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored readings
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reading stored under `id`
    pub fn get(&self, id: &str) -> Option<StoredReading> {
        self.lock().iter().find(|r| r.id == id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StoredReading>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn save(&self, reading: &Reading) -> Result<String, SinkError> {
        let id = Uuid::new_v4().to_string();
        self.lock().push(StoredReading {
            id: id.clone(),
            reading: reading.clone(),
        });
        Ok(id)
    }

    async fn query(&self, query: &ReadingQuery) -> Result<Vec<StoredReading>, SinkError> {
        let mut matches: Vec<StoredReading> = self
            .lock()
            .iter()
            .filter(|stored| query.matches(&stored.reading))
            .cloned()
            .collect();
        matches.sort_by_key(|stored| stored.reading.timestamp);
        Ok(matches)
    }
}

/// Anomaly event as recorded by `MemoryNotifier`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedAnomaly {
    pub result: AnomalyResult,
    pub level: AlertLevel,
}

/// In-memory `Notifier` recording everything published
///
/// Grows without bound; meant for tests and bounded demo runs.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    anomalies: Mutex<Vec<PublishedAnomaly>>,
    readings: Mutex<Vec<Reading>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every published detection result
    pub fn anomalies(&self) -> Vec<PublishedAnomaly> {
        lock(&self.anomalies).clone()
    }

    /// Published results that were routed to an alert level
    pub fn alerts(&self) -> Vec<PublishedAnomaly> {
        lock(&self.anomalies)
            .iter()
            .filter(|published| published.level != AlertLevel::None)
            .cloned()
            .collect()
    }

    /// Every published reading
    pub fn readings(&self) -> Vec<Reading> {
        lock(&self.readings).clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn publish_anomaly(&self, result: &AnomalyResult, level: AlertLevel) -> Result<(), SinkError> {
        lock(&self.anomalies).push(PublishedAnomaly {
            result: result.clone(),
            level,
        });
        Ok(())
    }

    async fn publish_reading(&self, reading: &Reading) -> Result<(), SinkError> {
        lock(&self.readings).push(reading.clone());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use sensorwatch_detect::AnomalyKind;

    fn at(device: &str, sensor_type: &str, minute: i64) -> Reading {
        Reading::builder(device, sensor_type)
            .raw_value(minute as f64)
            .timestamp(Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap() + Duration::minutes(minute))
            .build()
    }

    #[tokio::test]
    async fn store_assigns_unique_ids() {
        let store = MemoryStore::new();
        let a = store.save(&at("dev-1", "ph", 0)).await.unwrap();
        let b = store.save(&at("dev-1", "ph", 1)).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&a).map(|r| r.reading.value), Some(0.0));
    }

    #[tokio::test]
    async fn query_filters_and_orders() {
        let store = MemoryStore::new();
        for minute in [5, 1, 3] {
            store.save(&at("dev-1", "ph", minute)).await.unwrap();
        }
        store.save(&at("dev-2", "ph", 2)).await.unwrap();
        store.save(&at("dev-1", "voltage", 2)).await.unwrap();

        let all_ph = store
            .query(&ReadingQuery::new().device("dev-1").sensor_type("ph"))
            .await
            .unwrap();
        let minutes: Vec<f64> = all_ph.iter().map(|r| r.reading.value).collect();
        assert_eq!(minutes, vec![1.0, 3.0, 5.0]);

        let base = Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap();
        let window = store
            .query(
                &ReadingQuery::new()
                    .device("dev-1")
                    .since(base + Duration::minutes(2))
                    .until(base + Duration::minutes(3)),
            )
            .await
            .unwrap();
        assert_eq!(window.len(), 2);

        assert_eq!(store.query(&ReadingQuery::new()).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn notifier_records_levels() {
        let notifier = MemoryNotifier::new();
        let reading = at("dev-1", "pressure", 0);
        let spike = AnomalyResult::anomaly(&reading, AnomalyKind::SuddenSpike, 0.9, "spike");
        let info = AnomalyResult::insufficient_data(&reading, 10, 2);

        notifier.publish_anomaly(&spike, spike.alert_level()).await.unwrap();
        notifier.publish_anomaly(&info, info.alert_level()).await.unwrap();
        notifier.publish_reading(&reading).await.unwrap();

        assert_eq!(notifier.anomalies().len(), 2);
        assert_eq!(notifier.alerts().len(), 1);
        assert_eq!(notifier.alerts()[0].level, AlertLevel::Critical);
        assert_eq!(notifier.readings().len(), 1);
    }
}
