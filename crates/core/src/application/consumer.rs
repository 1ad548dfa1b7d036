// Consumer - pulls items and enforces exactly-once, in-order delivery

use super::queue::{BoundedQueue, QueueError};
use super::shutdown::ShutdownToken;
use crate::domain::{DeliveryValidator, DomainError, Item, ItemId};
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

/// Progress made by a consumer run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerReport {
    pub accepted: ItemId,
    pub last_accepted: ItemId,
}

/// Dequeues items in a loop and validates each one
///
/// Every accepted item is announced on the `handled` channel. The channel is
/// unbounded so announcing never blocks the loop.
pub struct Consumer {
    queue: Arc<BoundedQueue<Item>>,
    validator: DeliveryValidator,
    handled_tx: mpsc::UnboundedSender<Item>,
    handle_delay: Option<Duration>,
}

impl Consumer {
    pub fn new(queue: Arc<BoundedQueue<Item>>, handled_tx: mpsc::UnboundedSender<Item>) -> Self {
        Self {
            queue,
            validator: DeliveryValidator::new(),
            handled_tx,
            handle_delay: None,
        }
    }

    /// Pause after each handled item
    pub fn with_handle_delay(mut self, delay: Duration) -> Self {
        self.handle_delay = (!delay.is_zero()).then_some(delay);
        self
    }

    /// Validate one item and announce it when accepted
    ///
    /// Nothing is announced for a rejected item.
    pub fn handle(&mut self, item: Item) -> std::result::Result<(), DomainError> {
        self.validator.validate(&item)?;

        if self.handled_tx.send(item).is_err() {
            // Nobody is listening anymore (coordinator finished); keep going.
            debug!(item_id = item.id, "Handled notification dropped, no subscriber");
        }
        Ok(())
    }

    pub fn report(&self) -> ConsumerReport {
        ConsumerReport {
            accepted: self.validator.accepted_count(),
            last_accepted: self.validator.last_accepted(),
        }
    }

    /// Consume until shutdown, a closed queue, or a validation failure
    ///
    /// A validation failure is fatal: the loop stops without dequeuing anything
    /// else and the error is returned to the caller.
    #[instrument(name = "consumer", skip_all, fields(queue = %self.queue.name()))]
    pub async fn run(mut self, mut shutdown: ShutdownToken) -> Result<ConsumerReport> {
        info!("Consumer running");

        loop {
            debug!("Waiting for item...");
            let item = match self.queue.dequeue_or_shutdown(&mut shutdown).await {
                Ok(item) => item,
                Err(QueueError::Interrupted) => {
                    info!(accepted = self.validator.accepted_count(), "Consumer shutting down");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Consumer stopped by queue failure");
                    return Err(e.into());
                }
            };

            if let Err(e) = self.handle(item) {
                error!(
                    item_id = e.item_id(),
                    accepted = self.validator.accepted_count(),
                    last_accepted = self.validator.last_accepted(),
                    error = %e,
                    "Delivery contract violated, stopping consumer"
                );
                return Err(e.into());
            }
            debug!(item_id = item.id, "Handled item");

            if let Some(delay) = self.handle_delay {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {},
                    _ = shutdown.wait() => {}
                }
            }
        }

        Ok(self.report())
    }
}
