//! Reading Generator (simulated fleet)
//!
//! Drives the pipeline without real hardware. Each simulated device runs as
//! its own task, so per-device order is preserved end-to-end while devices
//! interleave freely:
//!
//! ```text
//! device-001 ──┐
//! device-002 ──┼──► ingest queue
//! device-003 ──┘
//!    every tick (jittered between min and max interval):
//!    one reading per sensor of the device, baseline ± noise,
//!    occasionally an injected spike
//! ```
//!
//! Tasks stop when the cancellation token fires or the queue closes.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sensorwatch_core::{Location, PipelineConfig, Reading};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::queue::BoundedQueue;

/// Chance that a generated value is replaced by a spike
const SPIKE_PROBABILITY: f64 = 0.02;

/// Simulated sensor: baseline value and noise amplitude
#[derive(Debug, Clone, PartialEq)]
pub struct SensorProfile {
    pub sensor_type: String,
    pub baseline: f64,
    pub noise: f64,
    /// Offset added to the baseline for injected spikes
    pub spike: f64,
}

impl SensorProfile {
    pub fn new(sensor_type: impl Into<String>, baseline: f64, noise: f64, spike: f64) -> Self {
        Self {
            sensor_type: sensor_type.into(),
            baseline,
            noise,
            spike,
        }
    }
}

/// Simulated device and the sensors it carries
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceProfile {
    pub device_id: String,
    pub location: Option<Location>,
    pub sensors: Vec<SensorProfile>,
}

impl DeviceProfile {
    /// Profile `index` of a mixed fleet
    ///
    /// Every device reports temperature and humidity; every second device
    /// adds pressure, every third a supply voltage.
    pub fn fleet_member(index: usize) -> Self {
        let mut sensors = vec![
            SensorProfile::new("temperature", 21.0 + (index % 4) as f64, 0.4, 25.0),
            SensorProfile::new("humidity", 45.0 + (index % 3) as f64 * 5.0, 1.5, 40.0),
        ];
        if index % 2 == 0 {
            sensors.push(SensorProfile::new("pressure", 1013.0, 1.2, 250.0));
        }
        if index % 3 == 0 {
            sensors.push(SensorProfile::new("voltage", 12.0, 0.05, 6.0));
        }

        Self {
            device_id: format!("device-{:03}", index + 1),
            location: Some(Location {
                latitude: 52.0 + index as f64 * 0.01,
                longitude: 4.3 + index as f64 * 0.01,
                altitude: None,
            }),
            sensors,
        }
    }

    /// Generate one reading per sensor
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Vec<Reading> {
        self.sensors
            .iter()
            .map(|sensor| {
                let mut value = sensor.baseline + rng.gen_range(-1.0f64..=1.0) * sensor.noise;
                if rng.gen_bool(SPIKE_PROBABILITY) {
                    value += sensor.spike;
                }

                let mut builder = Reading::builder(self.device_id.as_str(), sensor.sensor_type.as_str())
                    .raw_value(value)
                    .meta("simulated", true);
                if let Some(location) = self.location {
                    builder = builder.location(location);
                }
                builder.build()
            })
            .collect()
    }
}

/// Spawns one producer task per simulated device
pub struct ReadingGenerator {
    devices: Vec<DeviceProfile>,
    interval_min: Duration,
    interval_max: Duration,
}

impl ReadingGenerator {
    /// Generator for `config.device_count` fleet devices
    pub fn from_config(config: &PipelineConfig) -> Self {
        let (interval_min, interval_max) = config.generation_interval();
        Self::new(
            (0..config.device_count).map(DeviceProfile::fleet_member).collect(),
            interval_min,
            interval_max,
        )
    }

    pub fn new(devices: Vec<DeviceProfile>, interval_min: Duration, interval_max: Duration) -> Self {
        Self {
            devices,
            interval_min: interval_min.min(interval_max),
            interval_max: interval_max.max(interval_min),
        }
    }

    pub fn devices(&self) -> &[DeviceProfile] {
        &self.devices
    }

    /// Start one task per device writing into `queue`
    pub fn spawn(
        &self,
        queue: Arc<BoundedQueue<Reading>>,
        token: CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        log::info!(
            "generator: starting {} devices, interval {:?}..{:?}",
            self.devices.len(),
            self.interval_min,
            self.interval_max
        );

        self.devices
            .iter()
            .cloned()
            .map(|device| {
                tokio::spawn(run_device(
                    device,
                    Arc::clone(&queue),
                    token.clone(),
                    self.interval_min,
                    self.interval_max,
                ))
            })
            .collect()
    }
}

async fn run_device(
    device: DeviceProfile,
    queue: Arc<BoundedQueue<Reading>>,
    token: CancellationToken,
    interval_min: Duration,
    interval_max: Duration,
) {
    let mut rng = StdRng::from_entropy();

    'ticks: loop {
        let pause = jitter(&mut rng, interval_min, interval_max);
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(pause) => {}
        }

        for reading in device.sample(&mut rng) {
            tokio::select! {
                biased;
                _ = token.cancelled() => break 'ticks,
                written = queue.write(reading) => {
                    if let Err(e) = written {
                        log::info!("generator: {} stopping: {}", device.device_id, e);
                        break 'ticks;
                    }
                }
            }
        }
    }

    log::debug!("generator: {} stopped", device.device_id);
}

fn jitter<R: Rng>(rng: &mut R, min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let min_ms = min.as_millis() as u64;
    let max_ms = max.as_millis() as u64;
    Duration::from_millis(rng.gen_range(min_ms..=max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fleet_profiles() {
        let first = DeviceProfile::fleet_member(0);
        assert_eq!(first.device_id, "device-001");
        assert_eq!(first.sensors.len(), 4);

        let second = DeviceProfile::fleet_member(1);
        assert_eq!(second.sensors.len(), 2);
    }

    #[test]
    fn samples_stay_near_baseline() {
        let device = DeviceProfile {
            device_id: "d".into(),
            location: None,
            sensors: vec![SensorProfile::new("humidity", 50.0, 2.0, 0.0)],
        };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let readings = device.sample(&mut rng);
            assert_eq!(readings.len(), 1);
            assert!((48.0..=52.0).contains(&readings[0].value));
            assert!(readings[0].flag("simulated"));
        }
    }

    #[test]
    fn jitter_within_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        let (min, max) = (Duration::from_millis(5), Duration::from_millis(10));
        for _ in 0..100 {
            let pause = jitter(&mut rng, min, max);
            assert!(pause >= min && pause <= max);
        }
        assert_eq!(jitter(&mut rng, max, max), max);
    }

    #[tokio::test]
    async fn tasks_produce_until_cancelled() {
        let queue = Arc::new(BoundedQueue::new("ingest", 1000));
        let token = CancellationToken::new();
        let generator = ReadingGenerator::new(
            vec![DeviceProfile::fleet_member(0), DeviceProfile::fleet_member(1)],
            Duration::from_millis(1),
            Duration::from_millis(3),
        );

        let tasks = generator.spawn(Arc::clone(&queue), token.clone());
        assert_eq!(tasks.len(), 2);

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        for task in tasks {
            task.await.unwrap();
        }

        assert!(!queue.is_empty());
    }
}
