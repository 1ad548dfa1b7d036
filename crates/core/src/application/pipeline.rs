// Pipeline - wires queue, producer, consumer and completion coordinator

use super::completion::CompletionCoordinator;
use super::constants::*;
use super::consumer::{Consumer, ConsumerReport};
use super::producer::{Producer, ProducerReport};
use super::queue::BoundedQueue;
use super::shutdown::{shutdown_channel, ShutdownSender};
use crate::domain::{Item, ItemId};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, instrument, warn};

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub queue_name: String,
    pub queue_capacity: usize,
    pub item_count: ItemId,
    /// Producer pause between items (0 = none)
    pub publish_delay_ms: u64,
    /// Consumer pause after each handled item (0 = none)
    pub handle_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            item_count: DEFAULT_ITEM_COUNT,
            publish_delay_ms: 0,
            handle_delay_ms: 0,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(AppError::Config(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.item_count <= 0 {
            return Err(AppError::Config(format!(
                "item_count must be positive, got {}",
                self.item_count
            )));
        }
        if self.queue_name.trim().is_empty() {
            return Err(AppError::Config("queue_name cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Summary of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub item_count: ItemId,
    pub published: ItemId,
    pub handled: ItemId,
    pub last_handled: ItemId,
    /// False when an external shutdown stopped the run early
    pub completed: bool,
    /// Time from start until completion (or until the run stopped)
    pub elapsed: Duration,
}

impl PipelineReport {
    pub fn ms_per_item(&self) -> f64 {
        if self.handled == 0 {
            return 0.0;
        }
        self.elapsed.as_secs_f64() * 1000.0 / self.handled as f64
    }

    pub fn items_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.handled as f64 / secs
    }
}

/// Single-producer / single-consumer pipeline over one bounded queue
///
/// Producer and consumer run as independent tokio tasks. The run ends when
/// the final item is handled, when the consumer fails validation, or when
/// the shutdown handle is triggered from outside.
pub struct Pipeline {
    config: PipelineConfig,
    shutdown_tx: ShutdownSender,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let (shutdown_tx, _) = shutdown_channel();
        Ok(Self {
            config,
            shutdown_tx,
        })
    }

    /// Handle for stopping the run from outside (e.g. Ctrl+C)
    pub fn shutdown_handle(&self) -> ShutdownSender {
        self.shutdown_tx.clone()
    }

    /// Run until the final item is handled
    ///
    /// A consumer validation failure stops both tasks and is returned as the
    /// error. An external shutdown is not an error: the report comes back with
    /// `completed == false`.
    #[instrument(
        name = "pipeline",
        skip_all,
        fields(queue = %self.config.queue_name, item_count = self.config.item_count)
    )]
    pub async fn run(self) -> Result<PipelineReport> {
        let config = &self.config;
        let queue: Arc<BoundedQueue<Item>> = Arc::new(BoundedQueue::new(
            config.queue_capacity,
            config.queue_name.clone(),
        )?);
        let (handled_tx, handled_rx) = mpsc::unbounded_channel();
        let (coordinator, mut completion) =
            CompletionCoordinator::new(config.item_count, self.shutdown_tx.clone());

        let producer = Producer::new(Arc::clone(&queue), config.item_count)
            .with_publish_delay(Duration::from_millis(config.publish_delay_ms));
        let consumer = Consumer::new(Arc::clone(&queue), handled_tx)
            .with_handle_delay(Duration::from_millis(config.handle_delay_ms));

        let started = Instant::now();
        let coordinator_handle = tokio::spawn(coordinator.run(handled_rx));
        let producer_handle = tokio::spawn(producer.run(self.shutdown_tx.subscribe()));
        let mut consumer_handle = tokio::spawn(consumer.run(self.shutdown_tx.subscribe()));

        info!(capacity = config.queue_capacity, "Started, waiting for items to be handled...");

        let consumer_exit = tokio::select! {
            completed = completion.wait() => {
                if completed {
                    info!("Items handled!");
                }
                None
            }
            joined = &mut consumer_handle => Some(joined),
        };
        let elapsed = started.elapsed();

        // Both tasks stop at their next checkpoint (or mid-wait)
        self.shutdown_tx.shutdown();

        let consumer_joined = match consumer_exit {
            Some(joined) => joined,
            None => join_within_grace(consumer_handle, "consumer").await?,
        };
        let producer_joined = join_within_grace(producer_handle, "producer").await?;
        join_within_grace(coordinator_handle, "coordinator").await??;

        let consumer_report: ConsumerReport = consumer_joined?.inspect_err(|e| {
            error!(error = %e, "Pipeline stopped by consumer failure");
        })?;
        let producer_report: ProducerReport = producer_joined??;

        let completed = completion.is_complete();
        if !completed {
            warn!(
                handled = consumer_report.accepted,
                "Pipeline stopped before the final item was handled"
            );
        }

        Ok(PipelineReport {
            item_count: config.item_count,
            published: producer_report.published,
            handled: consumer_report.accepted,
            last_handled: consumer_report.last_accepted,
            completed,
            elapsed,
        })
    }
}

/// Await a task after shutdown, abandoning it if it does not stop in time
async fn join_within_grace<T>(
    mut handle: JoinHandle<T>,
    task: &str,
) -> Result<std::result::Result<T, JoinError>> {
    match tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, &mut handle).await {
        Ok(joined) => Ok(joined),
        Err(_) => {
            handle.abort();
            warn!(task, "Task did not stop within the grace period");
            Err(AppError::InvalidState(format!(
                "{task} did not stop within {GRACEFUL_SHUTDOWN_TIMEOUT:?}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    fn small_config(item_count: ItemId, capacity: usize) -> PipelineConfig {
        PipelineConfig {
            queue_name: "test".to_string(),
            queue_capacity: capacity,
            item_count,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.queue_name, "The Queue");
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.item_count, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let zero_capacity = small_config(10, 0);
        assert!(matches!(Pipeline::new(zero_capacity), Err(AppError::Config(_))));

        let no_items = small_config(0, 4);
        assert!(matches!(Pipeline::new(no_items), Err(AppError::Config(_))));

        let unnamed = PipelineConfig {
            queue_name: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(unnamed.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_report_rates() {
        let report = PipelineReport {
            item_count: 100,
            published: 100,
            handled: 100,
            last_handled: 100,
            completed: true,
            elapsed: Duration::from_millis(50),
        };
        assert!((report.ms_per_item() - 0.5).abs() < 1e-9);
        assert!((report.items_per_sec() - 2000.0).abs() < 1e-6);

        let empty = PipelineReport {
            handled: 0,
            elapsed: Duration::ZERO,
            ..report
        };
        assert_eq!(empty.ms_per_item(), 0.0);
        assert_eq!(empty.items_per_sec(), 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pipeline_runs_to_completion() {
        let pipeline = Pipeline::new(small_config(200, 4)).unwrap();

        let report = timeout(Duration::from_secs(10), pipeline.run())
            .await
            .unwrap()
            .unwrap();

        assert!(report.completed);
        assert_eq!(report.published, 200);
        assert_eq!(report.handled, 200);
        assert_eq!(report.last_handled, 200);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pipeline_external_shutdown_is_not_an_error() {
        let config = PipelineConfig {
            handle_delay_ms: 5,
            ..small_config(10_000, 4)
        };
        let pipeline = Pipeline::new(config).unwrap();
        let shutdown = pipeline.shutdown_handle();

        let run = tokio::spawn(pipeline.run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.shutdown();

        let report = timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert!(!report.completed);
        assert!(report.handled < 10_000);
        assert_eq!(report.last_handled, report.handled);
    }
}
