//! Telemetry ingestion
//!
//! Turns transport payloads into `Reading`s and writes them onto the ingest
//! queue. The transport itself (MQTT, HTTP, ...) is not part of this crate:
//! whatever receives a message hands `(topic, payload)` to an `Ingestor`.
//!
//! ## Payload Contract
//!
//! ```json
//! {
//!   "device_id": "greenhouse-07",        // optional, see below
//!   "sensor_type": "temperature",        // required ("sensorType" / "type" accepted)
//!   "value": 21.4,                       // required, number or numeric string
//!   "unit": "°C",                        // optional, canonical unit of the type
//!   "timestamp": "2024-05-01T12:00:00Z", // optional, ingestion time
//!   "location": { "latitude": 52.1, "longitude": 4.3 },
//!   "quality": "good",                   // optional, unknown
//!   "metadata": { "firmware": "1.4.2" }
//! }
//! ```
//!
//! Without a device id the second `/`-separated segment of the topic is
//! used (`sensors/greenhouse-07/temperature` → `greenhouse-07`), falling
//! back to `"unknown"`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sensorwatch_core::constants::ranges::canonical_unit;
use sensorwatch_core::time::{Clock, SystemClock};
use sensorwatch_core::{Location, Quality, Reading};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::{DecodeError, PipelineResult};
use crate::queue::BoundedQueue;

/// Device id used when neither payload nor topic carries one
pub const UNKNOWN_DEVICE: &str = "unknown";

#[derive(Debug, Deserialize)]
struct TelemetryPayload {
    #[serde(default, alias = "deviceId")]
    device_id: Option<String>,
    #[serde(default, alias = "sensorType", alias = "type")]
    sensor_type: Option<String>,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    location: Option<Location>,
    #[serde(default)]
    quality: Option<Quality>,
    #[serde(default)]
    metadata: HashMap<String, Value>,
}

/// Device id from a path-like topic: its second `/`-separated segment
pub fn device_id_from_topic(topic: &str) -> &str {
    topic
        .split('/')
        .nth(1)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .unwrap_or(UNKNOWN_DEVICE)
}

/// Decode one JSON telemetry payload
pub fn decode_payload(
    topic: &str,
    payload: &[u8],
    received_at: DateTime<Utc>,
) -> Result<Reading, DecodeError> {
    let raw: TelemetryPayload = serde_json::from_slice(payload)?;

    let sensor_type = raw
        .sensor_type
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(DecodeError::MissingField("sensor_type"))?;

    let value = match raw.value {
        None | Some(Value::Null) => return Err(DecodeError::MissingField("value")),
        Some(Value::Number(n)) => n.as_f64().ok_or(DecodeError::NonNumericValue { field: "value" })?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| DecodeError::NonNumericValue { field: "value" })?,
        Some(_) => return Err(DecodeError::NonNumericValue { field: "value" }),
    };

    let device_id = raw
        .device_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| device_id_from_topic(topic).to_string());

    let unit = raw
        .unit
        .unwrap_or_else(|| canonical_unit(&sensor_type).to_string());

    Ok(Reading {
        device_id,
        sensor_type,
        value,
        unit,
        timestamp: raw.timestamp.unwrap_or(received_at),
        location: raw.location,
        quality: raw.quality.unwrap_or_default(),
        metadata: raw.metadata,
    })
}

/// Counters kept by an `Ingestor`
#[derive(Debug, Default)]
struct IngestCounters {
    accepted: AtomicU64,
    rejected: AtomicU64,
}

/// Decodes payloads and feeds the ingest queue
pub struct Ingestor<C: Clock = SystemClock> {
    queue: Arc<BoundedQueue<Reading>>,
    clock: C,
    counters: IngestCounters,
}

impl Ingestor<SystemClock> {
    pub fn new(queue: Arc<BoundedQueue<Reading>>) -> Self {
        Self::with_clock(queue, SystemClock)
    }
}

impl<C: Clock> Ingestor<C> {
    /// Ingestor stamping missing timestamps from `clock`
    pub fn with_clock(queue: Arc<BoundedQueue<Reading>>, clock: C) -> Self {
        Self {
            queue,
            clock,
            counters: IngestCounters::default(),
        }
    }

    /// Decode a payload and enqueue it, waiting while the queue is full
    ///
    /// Undecodable payloads are counted, logged and returned as errors;
    /// nothing is enqueued for them.
    pub async fn ingest(&self, topic: &str, payload: &[u8]) -> PipelineResult<()> {
        let reading = match decode_payload(topic, payload, self.clock.now()) {
            Ok(reading) => reading,
            Err(e) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                log::warn!("ingest: dropping payload on {}: {}", topic, e);
                return Err(e.into());
            }
        };
        self.submit(reading).await
    }

    /// Enqueue an already decoded reading
    pub async fn submit(&self, reading: Reading) -> PipelineResult<()> {
        log::trace!("ingest: {}/{}", reading.device_id, reading.sensor_type);
        self.queue.write(reading).await?;
        self.counters.accepted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Readings enqueued so far
    pub fn accepted(&self) -> u64 {
        self.counters.accepted.load(Ordering::Relaxed)
    }

    /// Payloads that failed to decode
    pub fn rejected(&self) -> u64 {
        self.counters.rejected.load(Ordering::Relaxed)
    }
}
