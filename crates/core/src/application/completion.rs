// Completion Coordinator - detects the final item and ends the pipeline once

use super::shutdown::ShutdownSender;
use crate::domain::{Item, ItemId};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument};

/// Awaitable, set-once completion flag observed by the driver
#[derive(Clone)]
pub struct CompletionSignal {
    rx: watch::Receiver<bool>,
}

impl CompletionSignal {
    pub fn is_complete(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the final item has been handled
    ///
    /// Returns `false` if the coordinator went away without completing.
    pub async fn wait(&mut self) -> bool {
        self.rx.wait_for(|done| *done).await.is_ok()
    }
}

/// Watches handled notifications for the final expected item
///
/// Completion fires exactly once no matter how often, or from how many tasks,
/// the final item is reported.
pub struct CompletionCoordinator {
    final_id: ItemId,
    completed: AtomicBool,
    shutdown: ShutdownSender,
    done_tx: watch::Sender<bool>,
}

impl CompletionCoordinator {
    /// Create a coordinator that completes on `final_id`
    ///
    /// # Arguments
    /// * `final_id` - Identifier of the last expected item (the item count)
    /// * `shutdown` - Signalled on completion to stop producer and consumer
    pub fn new(final_id: ItemId, shutdown: ShutdownSender) -> (Self, CompletionSignal) {
        let (done_tx, done_rx) = watch::channel(false);
        let coordinator = Self {
            final_id,
            completed: AtomicBool::new(false),
            shutdown,
            done_tx,
        };
        (coordinator, CompletionSignal { rx: done_rx })
    }

    pub fn is_complete(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// React to one handled notification
    ///
    /// Returns `true` only for the call that triggered completion.
    pub fn on_item_handled(&self, item: &Item) -> bool {
        debug!(item_id = item.id, "Item reported handled");
        if item.id != self.final_id {
            return false;
        }

        if self
            .completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(item_id = item.id, "Completion already signalled");
            return false;
        }

        info!(final_id = self.final_id, "All items have been handled, stopping");
        self.shutdown.shutdown();
        self.done_tx.send_replace(true);
        true
    }

    /// Drain notifications until completion or until the channel closes
    ///
    /// Returns whether completion was reached.
    #[instrument(name = "coordinator", skip_all, fields(final_id = self.final_id))]
    pub async fn run(self, mut handled_rx: mpsc::UnboundedReceiver<Item>) -> bool {
        while let Some(item) = handled_rx.recv().await {
            if self.on_item_handled(&item) {
                return true;
            }
        }

        debug!("Handled channel closed");
        self.is_complete()
    }
}
