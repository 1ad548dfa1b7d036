// Application Layer - Queue, pipeline actors and orchestration

pub mod completion;
pub mod constants;
pub mod consumer;
pub mod pipeline;
pub mod producer;
pub mod queue;
mod shutdown;

// Re-exports
pub use completion::{CompletionCoordinator, CompletionSignal};
pub use consumer::{Consumer, ConsumerReport};
pub use pipeline::{Pipeline, PipelineConfig, PipelineReport};
pub use producer::{Producer, ProducerReport};
pub use queue::{BoundedQueue, QueueError, TryEnqueueError};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
