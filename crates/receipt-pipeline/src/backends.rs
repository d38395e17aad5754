//! # Backend Wiring
//!
//! Builds the queue, store and optional dead-letter queue named by a
//! [`PipelineConfig`], as trait objects shared by intake and workers.

use std::sync::Arc;

use receipt_store::{
    MemoryQueue, MemoryStore, ReceiptStore, RedisBroker, RedisConfig, WorkQueue,
};
use tracing::info;

use crate::config::{BrokerBackend, PipelineConfig};
use crate::error::PipelineResult;

/// The shared resources of one pipeline.
#[derive(Debug, Clone)]
pub struct Backends {
    pub queue: Arc<dyn WorkQueue>,
    pub store: Arc<dyn ReceiptStore>,
    pub dead_letter: Option<Arc<dyn WorkQueue>>,
}

impl Backends {
    /// Opens the backends selected by `config.broker.backend`.
    ///
    /// ## Errors
    /// `ConnectionFailed` if the Redis server cannot be reached.
    pub async fn connect(config: &PipelineConfig) -> PipelineResult<Self> {
        match config.broker.backend {
            BrokerBackend::Memory => Ok(Self::in_memory(config)),
            BrokerBackend::Redis => {
                let broker = RedisBroker::connect(
                    RedisConfig::new(config.broker.redis_url.as_str())
                        .block_timeout(config.block_timeout()),
                )
                .await?;
                broker.ping().await?;

                info!(
                    queue = %config.queue.name,
                    namespace = %config.store.namespace,
                    dead_letter = ?config.queue.dead_letter,
                    "Using Redis backends"
                );

                Ok(Backends {
                    queue: Arc::new(broker.queue(config.queue.name.as_str())),
                    store: Arc::new(broker.store(config.store.namespace.as_str())),
                    dead_letter: config
                        .queue
                        .dead_letter
                        .as_deref()
                        .map(|name| Arc::new(broker.queue(name)) as Arc<dyn WorkQueue>),
                })
            }
        }
    }

    /// Process-local backends. Submissions are only visible to workers in
    /// the same process.
    pub fn in_memory(config: &PipelineConfig) -> Self {
        info!(queue = %config.queue.name, "Using in-memory backends");

        Backends {
            queue: Arc::new(MemoryQueue::new(config.queue.name.as_str())),
            store: Arc::new(MemoryStore::new(config.store.namespace.as_str())),
            dead_letter: config
                .queue
                .dead_letter
                .as_deref()
                .map(|name| Arc::new(MemoryQueue::new(name)) as Arc<dyn WorkQueue>),
        }
    }
}
