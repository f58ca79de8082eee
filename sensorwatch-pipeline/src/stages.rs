//! Stage loops
//!
//! A stage is a long-lived task reading from one queue, transforming each
//! reading and writing it to the next queue. Every loop races the shared
//! cancellation token against its current suspension point, so a cancelled
//! stage abandons the item it holds instead of finishing it.

use std::sync::Arc;

use sensorwatch_core::time::Clock;
use sensorwatch_core::{CleaningStage, EnrichmentStage, Reading};
use tokio_util::sync::CancellationToken;

use crate::queue::BoundedQueue;

/// Run `transform` over every reading of `input`, writing results to `output`
///
/// Stops on cancellation, when `input` is closed and drained, or when
/// `output` is closed. Returns the number of readings forwarded.
pub async fn run_stage<F>(
    name: &'static str,
    input: Arc<BoundedQueue<Reading>>,
    output: Arc<BoundedQueue<Reading>>,
    token: CancellationToken,
    mut transform: F,
) -> u64
where
    F: FnMut(Reading) -> Reading + Send,
{
    log::info!("stage {}: started ({} -> {})", name, input.name(), output.name());
    let mut forwarded = 0u64;

    loop {
        let reading = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            next = input.recv() => match next {
                Some(reading) => reading,
                None => break,
            },
        };

        let reading = transform(reading);
        log::trace!("stage {}: {}/{}", name, reading.device_id, reading.sensor_type);

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            written = output.write(reading) => match written {
                Ok(()) => forwarded += 1,
                Err(e) => {
                    log::error!("stage {}: {}", name, e);
                    break;
                }
            },
        }
    }

    log::info!("stage {}: stopped after {} readings", name, forwarded);
    forwarded
}

/// Cleaning stage loop
pub async fn run_cleaning(
    input: Arc<BoundedQueue<Reading>>,
    output: Arc<BoundedQueue<Reading>>,
    token: CancellationToken,
) -> u64 {
    let stage = CleaningStage::new();
    run_stage("cleaning", input, output, token, move |reading| stage.clean(reading)).await
}

/// Enrichment stage loop
pub async fn run_enrichment<C: Clock>(
    stage: EnrichmentStage<C>,
    input: Arc<BoundedQueue<Reading>>,
    output: Arc<BoundedQueue<Reading>>,
    token: CancellationToken,
) -> u64 {
    run_stage("enrichment", input, output, token, move |reading| stage.enrich(reading)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorwatch_core::meta;
    use std::time::Duration;
    use tokio::time::timeout;

    fn queues() -> (Arc<BoundedQueue<Reading>>, Arc<BoundedQueue<Reading>>) {
        (
            Arc::new(BoundedQueue::new("in", 16)),
            Arc::new(BoundedQueue::new("out", 16)),
        )
    }

    #[tokio::test]
    async fn cleaning_forwards_until_input_drains() {
        let (input, output) = queues();
        input
            .write(Reading::builder("dev-1", "humidity").raw_value(140.0).build())
            .await
            .unwrap();
        input
            .write(Reading::builder("dev-1", "humidity").raw_value(40.0).build())
            .await
            .unwrap();
        input.close();

        let forwarded = run_cleaning(Arc::clone(&input), Arc::clone(&output), CancellationToken::new()).await;
        assert_eq!(forwarded, 2);

        let first = output.recv().await.unwrap();
        assert_eq!(first.value, 100.0);
        assert!(first.flag(meta::CLAMPED));
        assert_eq!(output.recv().await.unwrap().value, 40.0);
    }

    #[tokio::test]
    async fn enrichment_annotates() {
        let (input, output) = queues();
        input
            .write(Reading::builder("dev-1", "temperature").value(25.0, "°C").build())
            .await
            .unwrap();
        input.close();

        run_enrichment(EnrichmentStage::new(), input, Arc::clone(&output), CancellationToken::new()).await;

        let reading = output.recv().await.unwrap();
        assert_eq!(reading.metric(meta::FAHRENHEIT), Some(77.0));
        assert!(reading.metadata.contains_key(meta::QUALITY_LABEL));
    }

    #[tokio::test]
    async fn cancellation_stops_idle_stage() {
        let (input, output) = queues();
        let token = CancellationToken::new();
        let task = tokio::spawn(run_cleaning(input, output, token.clone()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let forwarded = timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert_eq!(forwarded, 0);
    }

    #[tokio::test]
    async fn closed_output_stops_stage() {
        let (input, output) = queues();
        output.close();
        input
            .write(Reading::builder("dev-1", "ph").raw_value(7.0).build())
            .await
            .unwrap();

        let forwarded = timeout(
            Duration::from_secs(1),
            run_cleaning(input, output, CancellationToken::new()),
        )
        .await
        .unwrap();
        assert_eq!(forwarded, 0);
    }
}
