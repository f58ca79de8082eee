//! Simulated fleet demo
//!
//! Drives a handful of simulated devices through the full pipeline for a
//! few seconds, then prints what reached the store and the notifier.
//!
//! ```text
//! cargo run -p sensorwatch-pipeline --example simulated_fleet
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use sensorwatch_core::PipelineConfig;
use sensorwatch_pipeline::{MemoryNotifier, MemoryStore, Pipeline};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = PipelineConfig::default()
        .with_device_count(4)
        .with_generation_interval(Duration::from_millis(20), Duration::from_millis(60));

    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(MemoryNotifier::new());

    let mut handle = Pipeline::spawn_with_engine(config, store.clone(), notifier.clone())?;
    handle.spawn_fleet();

    // Downstream consumer for processed readings
    let processed = handle.processed_queue();
    let consumer = tokio::spawn(async move { processed.read().count().await });

    tokio::time::sleep(Duration::from_secs(3)).await;

    let stats = handle.stats();
    handle.shutdown().await;
    let consumed = consumer.await?;

    let stats = stats.snapshot();
    println!("=== SensorWatch simulated fleet ===");
    println!("received:          {}", stats.received);
    println!("persisted:         {}", stats.persisted);
    println!("forwarded:         {}", stats.forwarded);
    println!("consumed:          {}", consumed);
    println!("detection results: {}", stats.anomalies);
    println!("alerts:            {}", stats.alerts);
    println!("stored readings:   {}", store.len());

    for alert in notifier.alerts().iter().take(10) {
        println!(
            "  [{}] {}/{} {}: {}",
            alert.level, alert.result.device_id, alert.result.sensor_type, alert.result.kind, alert.result.description
        );
    }

    Ok(())
}
