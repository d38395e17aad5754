//! # Submission Pipeline
//!
//! The two operations exposed to intake: `submit` and `retrieve`.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  submit(receipt)                                                       │
//! │     ├── id = ReceiptId::new()                     state: Received      │
//! │     ├── queue.enqueue((id, receipt))              state: Queued        │
//! │     └── return id          (not yet retrievable)                       │
//! │                                                                         │
//! │           ... a worker later runs store.put(id, receipt) → Stored ...  │
//! │                                                                         │
//! │  retrieve(id)                                                          │
//! │     ├── parse id           (malformed → NotFound)                      │
//! │     ├── store.get(id)      (absent → NotFound)                         │
//! │     └── engine.total_points(receipt)                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Points are computed on every read; the store only ever holds receipts.

use std::sync::Arc;

use receipt_core::{QueueEntry, Receipt, ReceiptId, ReceiptPayload, ScoringEngine, SubmissionState};
use receipt_store::{ReceiptStore, WorkQueue};
use tracing::{debug, info};

use crate::backends::Backends;
use crate::error::{PipelineError, PipelineResult};

/// Intake-facing half of the pipeline. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SubmissionPipeline {
    queue: Arc<dyn WorkQueue>,
    store: Arc<dyn ReceiptStore>,
    engine: Arc<ScoringEngine>,
}

impl SubmissionPipeline {
    pub fn new(
        queue: Arc<dyn WorkQueue>,
        store: Arc<dyn ReceiptStore>,
        engine: Arc<ScoringEngine>,
    ) -> Self {
        SubmissionPipeline {
            queue,
            store,
            engine,
        }
    }

    /// Builds a pipeline over `backends` with the standard scoring rules.
    pub fn from_backends(backends: &Backends) -> Self {
        Self::new(
            backends.queue.clone(),
            backends.store.clone(),
            Arc::new(ScoringEngine::standard()),
        )
    }

    /// Queues a validated receipt and returns its new id.
    ///
    /// The id is returned as soon as the queue accepts the entry; retrieving
    /// it yields `NotFound` until a worker has stored the receipt.
    ///
    /// ## Errors
    /// `QueueUnavailable` if the entry could not be queued. Nothing is
    /// retained in that case.
    pub async fn submit(&self, receipt: Receipt) -> PipelineResult<ReceiptId> {
        let id = ReceiptId::new();
        debug!(id = %id, state = %SubmissionState::Received, "Receipt received");

        self.queue.enqueue(QueueEntry::new(id, receipt)).await?;

        info!(id = %id, state = %SubmissionState::Queued, "Receipt queued");
        Ok(id)
    }

    /// Validates a raw payload, then [`submit`](Self::submit)s it.
    pub async fn submit_payload(&self, payload: ReceiptPayload) -> PipelineResult<ReceiptId> {
        let receipt = Receipt::try_from(payload)?;
        self.submit(receipt).await
    }

    /// Returns the points for a stored receipt.
    ///
    /// ## Errors
    /// - `NotFound` if `id` is not a receipt id, or nothing is stored under it
    /// - `StoreUnavailable` if the store cannot be read
    pub async fn retrieve(&self, id: &str) -> PipelineResult<u64> {
        let receipt_id: ReceiptId = id
            .parse()
            .map_err(|_| PipelineError::NotFound { id: id.to_string() })?;

        let receipt = self.store.get(&receipt_id).await?;
        let points = self.engine.total_points(&receipt);

        debug!(
            id = %receipt_id,
            points,
            breakdown = ?self.engine.breakdown(&receipt),
            "Receipt scored"
        );

        Ok(points)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
