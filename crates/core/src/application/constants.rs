// Pipeline constants (No magic values)
use crate::domain::ItemId;
use std::time::Duration;

/// Default queue label, used in diagnostics
pub const DEFAULT_QUEUE_NAME: &str = "The Queue";

/// Default queue capacity (items, not bytes)
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Default number of items published by the producer
pub const DEFAULT_ITEM_COUNT: ItemId = 1000;

/// How long the driver waits for tasks to stop after shutdown (5 seconds)
pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
