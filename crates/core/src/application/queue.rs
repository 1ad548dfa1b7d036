//! Bounded Queue
//!
//! Thread-safe FIFO with a fixed item capacity. `enqueue` suspends while the
//! queue is full and `dequeue` suspends while it is empty. Waiting tasks park
//! on [`Notify`] instead of polling the lock, and the deque mutex is never held
//! across an await point.

use super::shutdown::ShutdownToken;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::Notify;
use tracing::debug;

/// Errors returned by blocking queue operations
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,

    #[error("queue operation interrupted by shutdown")]
    Interrupted,

    #[error("queue is closed")]
    Closed,
}

/// Error returned by [`BoundedQueue::try_enqueue`], handing the item back
pub enum TryEnqueueError<T> {
    /// No free slot right now
    Full(T),
    /// The queue was closed
    Closed(T),
}

impl<T> TryEnqueueError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TryEnqueueError::Full(item) | TryEnqueueError::Closed(item) => item,
        }
    }
}

impl<T> fmt::Debug for TryEnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryEnqueueError::Full(_) => f.write_str("Full(..)"),
            TryEnqueueError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Display for TryEnqueueError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryEnqueueError::Full(_) => f.write_str("queue is full"),
            TryEnqueueError::Closed(_) => f.write_str("queue is closed"),
        }
    }
}

impl<T> std::error::Error for TryEnqueueError<T> {}

/// Capacity-bounded, order-preserving queue shared between tasks
///
/// Safe for any number of concurrent producers and consumers. Items are
/// delivered in insertion order and never dropped; `len() <= capacity()` holds
/// at every point because insertion checks the length under the lock.
pub struct BoundedQueue<T> {
    name: String,
    capacity: usize,
    items: Mutex<VecDeque<T>>,
    closed: AtomicBool,
    item_available: Notify,
    slot_freed: Notify,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of items (must be at least 1)
    /// * `name` - Label used in diagnostics
    pub fn new(capacity: usize, name: impl Into<String>) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }

        Ok(Self {
            name: name.into(),
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            closed: AtomicBool::new(false),
            item_available: Notify::new(),
            slot_freed: Notify::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().len() >= self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Insert at the tail, waiting for a free slot if the queue is full
    ///
    /// No upper bound on the wait. Fails only when the queue is closed.
    pub async fn enqueue(&self, mut item: T) -> Result<(), QueueError> {
        loop {
            // Register interest before checking, so a slot freed in between
            // still wakes us up.
            let slot_freed = self.slot_freed.notified();
            tokio::pin!(slot_freed);
            slot_freed.as_mut().enable();

            match self.try_enqueue(item) {
                Ok(()) => return Ok(()),
                Err(TryEnqueueError::Closed(_)) => return Err(QueueError::Closed),
                Err(TryEnqueueError::Full(rejected)) => {
                    debug!(
                        queue = %self.name,
                        capacity = self.capacity,
                        "Queue is full, waiting for a free slot"
                    );
                    item = rejected;
                }
            }

            slot_freed.await;
        }
    }

    /// Remove the head item, waiting until one is available
    ///
    /// No timeout. Fails only when the queue is closed.
    pub async fn dequeue(&self) -> Result<T, QueueError> {
        loop {
            let item_available = self.item_available.notified();
            tokio::pin!(item_available);
            item_available.as_mut().enable();

            if let Some(item) = self.try_dequeue()? {
                return Ok(item);
            }

            item_available.await;
        }
    }

    /// Like [`enqueue`](Self::enqueue), but gives up once shutdown is signalled
    ///
    /// On interruption the item is dropped and `QueueError::Interrupted` returned.
    pub async fn enqueue_or_shutdown(
        &self,
        item: T,
        shutdown: &mut ShutdownToken,
    ) -> Result<(), QueueError> {
        if shutdown.is_shutdown() {
            return Err(QueueError::Interrupted);
        }

        tokio::select! {
            biased;
            _ = shutdown.wait() => Err(QueueError::Interrupted),
            result = self.enqueue(item) => result,
        }
    }

    /// Like [`dequeue`](Self::dequeue), but gives up once shutdown is signalled
    pub async fn dequeue_or_shutdown(&self, shutdown: &mut ShutdownToken) -> Result<T, QueueError> {
        if shutdown.is_shutdown() {
            return Err(QueueError::Interrupted);
        }

        tokio::select! {
            biased;
            _ = shutdown.wait() => Err(QueueError::Interrupted),
            result = self.dequeue() => result,
        }
    }

    /// Insert without waiting
    pub fn try_enqueue(&self, item: T) -> Result<(), TryEnqueueError<T>> {
        if self.is_closed() {
            return Err(TryEnqueueError::Closed(item));
        }

        {
            let mut items = self.lock();
            if items.len() >= self.capacity {
                return Err(TryEnqueueError::Full(item));
            }
            items.push_back(item);
        }

        self.item_available.notify_one();
        Ok(())
    }

    /// Remove the head item without waiting (`Ok(None)` when empty)
    pub fn try_dequeue(&self) -> Result<Option<T>, QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }

        let item = self.lock().pop_front();
        if item.is_some() {
            self.slot_freed.notify_one();
        }
        Ok(item)
    }

    /// Stop the queue for good
    ///
    /// Every pending and future enqueue/dequeue fails with `QueueError::Closed`.
    /// Items still held are released when the queue is dropped.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(queue = %self.name, "Queue closed");
            self.item_available.notify_waiters();
            self.slot_freed.notify_waiters();
        }
    }

    // A panic elsewhere cannot leave the deque half-modified, so a poisoned
    // lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> fmt::Display for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Queue {}", self.name)
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
