//! # Work Queue
//!
//! FIFO hand-off between the submission path and the workers.
//!
//! ## Delivery Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  producer ──enqueue──►  [ e3 | e2 | e1 ]  ──dequeue──► consumer A      │
//! │  producer ──enqueue──►                    ──dequeue──► consumer B      │
//! │                                                                         │
//! │  • Entries come out in the order they went in                          │
//! │  • Each entry is delivered to exactly one consumer                     │
//! │  • dequeue() waits while the queue is empty                            │
//! │  • try_dequeue(wait) gives up after `wait` and returns None            │
//! │  • enqueue() never waits for a consumer                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use receipt_core::QueueEntry;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Trait
// =============================================================================

/// A named FIFO queue of receipts awaiting storage.
#[async_trait]
pub trait WorkQueue: Send + Sync + fmt::Debug {
    /// Queue name (the Redis list key, or a label for in-memory queues).
    fn name(&self) -> &str;

    /// Appends an entry to the tail of the queue.
    ///
    /// ## Errors
    /// `QueueUnavailable` when the backend cannot accept the entry.
    async fn enqueue(&self, entry: QueueEntry) -> StoreResult<()>;

    /// Removes and returns the head of the queue, waiting while it is empty.
    ///
    /// Only [`MemoryQueue`] is cancel-safe here. A cancelled Redis pop can
    /// drop an entry the server already removed, so loops that must stop on
    /// a signal use [`try_dequeue`](Self::try_dequeue) instead of racing this.
    ///
    /// ## Errors
    /// `QueueUnavailable` when the backend is gone.
    async fn dequeue(&self) -> StoreResult<QueueEntry>;

    /// Waits at most about `wait` for the head of the queue.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. Backends may shorten
    /// `wait` to their own blocking limit.
    ///
    /// ## Errors
    /// `QueueUnavailable` when the backend is gone.
    async fn try_dequeue(&self, wait: Duration) -> StoreResult<Option<QueueEntry>>;
}

// =============================================================================
// In-Memory Queue
// =============================================================================

/// Process-local queue backed by an unbounded tokio channel.
///
/// Consumers share the receiving half behind a mutex, so concurrent
/// `dequeue` calls each get a distinct entry.
pub struct MemoryQueue {
    name: String,
    tx: mpsc::UnboundedSender<QueueEntry>,
    rx: Mutex<mpsc::UnboundedReceiver<QueueEntry>>,
}

impl MemoryQueue {
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        MemoryQueue {
            name: name.into(),
            tx,
            rx: Mutex::new(rx),
        }
    }
}

impl fmt::Debug for MemoryQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryQueue")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enqueue(&self, entry: QueueEntry) -> StoreResult<()> {
        let id = entry.id;
        self.tx
            .send(entry)
            .map_err(|_| StoreError::queue(format!("queue '{}' is closed", self.name)))?;

        debug!(queue = %self.name, id = %id, "Entry enqueued");
        Ok(())
    }

    async fn dequeue(&self) -> StoreResult<QueueEntry> {
        let mut rx = self.rx.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| StoreError::queue(format!("queue '{}' is closed", self.name)))
    }

    async fn try_dequeue(&self, wait: Duration) -> StoreResult<Option<QueueEntry>> {
        match tokio::time::timeout(wait, self.dequeue()).await {
            Ok(entry) => entry.map(Some),
            Err(_) => Ok(None),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
