//! Bounded per-key reading history
//!
//! One `SensorHistory` exists per (device, sensor type) key. It is an
//! append-only ring: when full, the oldest point is evicted. Strategies only
//! ever see a borrowed slice of it; appending is the engine's job and always
//! happens after the candidate was evaluated.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use sensorwatch_core::Reading;
use serde::{Deserialize, Serialize};

/// A past value of one key
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Value as recorded
    pub value: f64,
    /// Timestamp of the reading it came from
    pub timestamp: DateTime<Utc>,
}

impl HistoryPoint {
    /// Point with the given value and timestamp
    pub fn new(value: f64, timestamp: DateTime<Utc>) -> Self {
        Self { value, timestamp }
    }
}

impl From<&Reading> for HistoryPoint {
    fn from(reading: &Reading) -> Self {
        Self::new(reading.value, reading.timestamp)
    }
}

/// Start of a trailing window of length `span` ending at `end`
///
/// Saturates at the earliest representable instant instead of overflowing.
pub fn window_start(end: DateTime<Utc>, span: Duration) -> DateTime<Utc> {
    end.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Identity of a history: device and sensor type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HistoryKey {
    /// Device that produced the readings
    pub device_id: String,
    /// Sensor type of the readings
    pub sensor_type: String,
}

impl HistoryKey {
    /// Key for a device and sensor type
    pub fn new(device_id: impl Into<String>, sensor_type: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            sensor_type: sensor_type.into(),
        }
    }

    /// Key a reading belongs to
    pub fn of(reading: &Reading) -> Self {
        Self::new(reading.device_id.as_str(), reading.sensor_type.as_str())
    }
}

impl fmt::Display for HistoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device_id, self.sensor_type)
    }
}

/// Bounded history of one key, oldest first
#[derive(Debug, Clone)]
pub struct SensorHistory {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
}

impl SensorHistory {
    /// Create an empty history; capacity is at least 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a point, evicting the oldest when full
    pub fn push(&mut self, point: HistoryPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// Points oldest first, as one slice
    pub fn as_slice(&mut self) -> &[HistoryPoint] {
        self.points.make_contiguous()
    }

    /// Points from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    /// Number of points held
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no point is held
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Maximum number of points kept
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every point
    pub fn clear(&mut self) {
        self.points.clear();
    }
}
