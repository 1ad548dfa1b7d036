// Producer - publishes items 1..=N in order

use super::queue::{BoundedQueue, QueueError};
use super::shutdown::ShutdownToken;
use crate::domain::{Item, ItemId};
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Outcome of a producer run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProducerReport {
    /// Items successfully enqueued
    pub published: ItemId,
    /// True when shutdown stopped the run before the last item
    pub interrupted: bool,
}

/// Publishes a bounded, strictly increasing sequence of items
///
/// Performs no validation of its own: order and capacity are the queue's job.
pub struct Producer {
    queue: Arc<BoundedQueue<Item>>,
    item_count: ItemId,
    publish_delay: Option<Duration>,
}

impl Producer {
    pub fn new(queue: Arc<BoundedQueue<Item>>, item_count: ItemId) -> Self {
        Self {
            queue,
            item_count,
            publish_delay: None,
        }
    }

    /// Pause between items
    pub fn with_publish_delay(mut self, delay: Duration) -> Self {
        self.publish_delay = (!delay.is_zero()).then_some(delay);
        self
    }

    /// Enqueue items 1..=item_count, then return
    ///
    /// Shutdown observed before or during an enqueue ends the run early with a
    /// warning; that is not an error. A closed queue is.
    #[instrument(name = "producer", skip_all, fields(queue = %self.queue.name()))]
    pub async fn run(self, mut shutdown: ShutdownToken) -> Result<ProducerReport> {
        info!(item_count = self.item_count, "Producer running");

        let mut published = 0;
        for id in 1..=self.item_count {
            let item = Item::new(id);
            match self.queue.enqueue_or_shutdown(item, &mut shutdown).await {
                Ok(()) => {
                    published = id;
                    debug!(item_id = id, "Published item");
                }
                Err(QueueError::Interrupted) => {
                    warn!(published, "Producer aborted by shutdown");
                    return Ok(ProducerReport {
                        published,
                        interrupted: true,
                    });
                }
                Err(e) => return Err(e.into()),
            }

            if let Some(delay) = self.publish_delay {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {},
                    _ = shutdown.wait() => {}
                }
            }
        }

        info!(published, "Producer finished");
        Ok(ProducerReport {
            published,
            interrupted: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::shutdown::shutdown_channel;
    use crate::error::AppError;
    use tokio::time::{timeout, Duration};

    fn queue(capacity: usize) -> Arc<BoundedQueue<Item>> {
        Arc::new(BoundedQueue::new(capacity, "test").unwrap())
    }

    #[tokio::test]
    async fn test_producer_publishes_ascending_ids() {
        let queue = queue(10);
        let (_shutdown_tx, token) = shutdown_channel();

        let report = Producer::new(Arc::clone(&queue), 5).run(token).await.unwrap();

        assert_eq!(
            report,
            ProducerReport {
                published: 5,
                interrupted: false
            }
        );
        let ids: Vec<_> = std::iter::from_fn(|| queue.try_dequeue().unwrap())
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_producer_without_sender_publishes_everything() {
        let queue = queue(10);
        let (shutdown_tx, token) = shutdown_channel();
        drop(shutdown_tx);

        let producer = Producer::new(Arc::clone(&queue), 5);
        let report = timeout(Duration::from_secs(1), producer.run(token))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            report,
            ProducerReport {
                published: 5,
                interrupted: false
            }
        );
        assert_eq!(queue.len(), 5);
    }

    #[tokio::test]
    async fn test_producer_zero_items() {
        let queue = queue(1);
        let (_shutdown_tx, token) = shutdown_channel();

        let report = Producer::new(Arc::clone(&queue), 0).run(token).await.unwrap();

        assert_eq!(report.published, 0);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_producer_blocked_on_full_queue_stops_on_shutdown() {
        let queue = queue(2);
        let (shutdown_tx, token) = shutdown_channel();

        let handle = tokio::spawn(Producer::new(Arc::clone(&queue), 10).run(token));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(queue.len(), 2);

        shutdown_tx.shutdown();
        let report = timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(
            report,
            ProducerReport {
                published: 2,
                interrupted: true
            }
        );
    }

    #[tokio::test]
    async fn test_producer_closed_queue_is_an_error() {
        let queue = queue(1);
        queue.close();
        let (_shutdown_tx, token) = shutdown_channel();

        let result = Producer::new(queue, 3).run(token).await;
        assert!(matches!(result, Err(AppError::Queue(QueueError::Closed))));
    }

    #[tokio::test]
    async fn test_publish_delay_paces_items() {
        let queue = queue(10);
        let (_shutdown_tx, token) = shutdown_channel();

        let producer = Producer::new(Arc::clone(&queue), 3)
            .with_publish_delay(Duration::from_millis(10));
        let started = std::time::Instant::now();
        producer.run(token).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(30));
        assert_eq!(queue.len(), 3);
    }
}
