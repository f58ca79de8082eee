//! Pipeline runtime
//!
//! Wires the stages together, one tokio task each:
//!
//! ```text
//! Ingestor / generator
//!        │
//!   [ingest] ──cleaning──► [cleaned] ──enrichment──► [enriched] ──orchestrator──► [processed]
//!                                                                     │
//!                                                      ReadingStore ◄─┴─► Notifier
//! ```
//!
//! All tasks share one `CancellationToken`. `PipelineHandle::shutdown`
//! cancels it, closes every queue and waits for the tasks to exit.
//!
//! The `processed` queue is bounded like the others: attach a consumer, or
//! the orchestrator stalls once it fills.

use std::sync::Arc;

use sensorwatch_core::{ConfigError, EnrichmentStage, PipelineConfig, Reading};
use sensorwatch_detect::{AnomalyEngine, Detector};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::generator::ReadingGenerator;
use crate::ingest::Ingestor;
use crate::orchestrator::{Orchestrator, ProcessingStats};
use crate::queue::{BoundedQueue, QueueRegistry};
use crate::sinks::{Notifier, ReadingStore};
use crate::stages::{run_cleaning, run_enrichment};

/// Names of the queues created by `Pipeline::spawn`
pub mod queues {
    pub const INGEST: &str = "ingest";
    pub const CLEANED: &str = "cleaned";
    pub const ENRICHED: &str = "enriched";
    pub const PROCESSED: &str = "processed";
}

/// Entry point for starting a pipeline
pub struct Pipeline;

impl Pipeline {
    /// Start every stage with `detector` behind the orchestrator
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<D>(
        config: PipelineConfig,
        detector: Arc<D>,
        store: Arc<dyn ReadingStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<PipelineHandle, ConfigError>
    where
        D: Detector + 'static,
    {
        config.validate()?;

        let registry = Arc::new(QueueRegistry::new(config.queue_capacity));
        let ingest = registry.get(queues::INGEST);
        let cleaned = registry.get(queues::CLEANED);
        let enriched = registry.get(queues::ENRICHED);
        let processed = registry.get(queues::PROCESSED);

        let token = CancellationToken::new();
        let orchestrator =
            Orchestrator::new(detector, store, notifier).with_downstream(Arc::clone(&processed));
        let stats = orchestrator.stats();

        let mut tasks = Vec::with_capacity(3);
        {
            let (input, output, token) = (Arc::clone(&ingest), Arc::clone(&cleaned), token.clone());
            tasks.push(tokio::spawn(async move {
                run_cleaning(input, output, token).await;
            }));
        }
        {
            let (input, output, token) = (Arc::clone(&cleaned), Arc::clone(&enriched), token.clone());
            tasks.push(tokio::spawn(async move {
                run_enrichment(EnrichmentStage::new(), input, output, token).await;
            }));
        }
        {
            let (input, token) = (Arc::clone(&enriched), token.clone());
            tasks.push(tokio::spawn(async move {
                orchestrator.run(input, token).await;
            }));
        }

        log::info!(
            "pipeline: started with queue capacity {}",
            config.queue_capacity
        );

        Ok(PipelineHandle {
            ingestor: Arc::new(Ingestor::new(Arc::clone(&ingest))),
            config,
            registry,
            ingest,
            processed,
            stats,
            token,
            tasks,
        })
    }

    /// Start a pipeline backed by an `AnomalyEngine` built from `config`
    pub fn spawn_with_engine(
        config: PipelineConfig,
        store: Arc<dyn ReadingStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<PipelineHandle, ConfigError> {
        let engine = Arc::new(AnomalyEngine::new(config.detection()));
        Self::spawn(config, engine, store, notifier)
    }
}

/// Running pipeline
pub struct PipelineHandle {
    config: PipelineConfig,
    registry: Arc<QueueRegistry<Reading>>,
    ingest: Arc<BoundedQueue<Reading>>,
    processed: Arc<BoundedQueue<Reading>>,
    ingestor: Arc<Ingestor>,
    stats: Arc<ProcessingStats>,
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl PipelineHandle {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Queue feeding the cleaning stage
    pub fn ingest_queue(&self) -> Arc<BoundedQueue<Reading>> {
        Arc::clone(&self.ingest)
    }

    /// Queue receiving every processed reading
    pub fn processed_queue(&self) -> Arc<BoundedQueue<Reading>> {
        Arc::clone(&self.processed)
    }

    /// Decoder writing into the ingest queue
    pub fn ingestor(&self) -> Arc<Ingestor> {
        Arc::clone(&self.ingestor)
    }

    /// Orchestrator counters
    pub fn stats(&self) -> Arc<ProcessingStats> {
        Arc::clone(&self.stats)
    }

    pub fn registry(&self) -> &QueueRegistry<Reading> {
        &self.registry
    }

    /// Token shared by every task of this pipeline
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run `generator` against the ingest queue until shutdown
    pub fn spawn_generator(&mut self, generator: &ReadingGenerator) {
        let tasks = generator.spawn(Arc::clone(&self.ingest), self.token.clone());
        self.tasks.extend(tasks);
    }

    /// Run the simulated fleet described by the configuration
    pub fn spawn_fleet(&mut self) {
        let generator = ReadingGenerator::from_config(&self.config);
        self.spawn_generator(&generator);
    }

    /// Cancel every task, close the queues and wait for the tasks to exit
    ///
    /// Readings still buffered in the queues are discarded.
    pub async fn shutdown(self) {
        self.token.cancel();
        self.registry.close_all();

        for task in self.tasks {
            if let Err(e) = task.await {
                log::error!("pipeline: task failed during shutdown: {}", e);
            }
        }

        let stats = self.stats.snapshot();
        log::info!(
            "pipeline: shut down ({} received, {} persisted, {} alerts)",
            stats.received,
            stats.persisted,
            stats.alerts
        );
    }
}
