//! # receipt-pipeline: Submission Pipeline
//!
//! Accepts validated receipts, queues them, stores them in the background and
//! scores them on request.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   HTTP handler                                                         │
//! │        │ submit(receipt)                 retrieve(id) ▲                │
//! │        ▼                                              │                │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                    SubmissionPipeline                            │  │
//! │  │   enqueue ──────────┐                   ┌───── get + score       │  │
//! │  └─────────────────────┼───────────────────┼────────────────────────┘  │
//! │                        ▼                   │                           │
//! │                 ┌─────────────┐     ┌──────┴──────┐                    │
//! │                 │  WorkQueue  │     │ReceiptStore │                    │
//! │                 └──────┬──────┘     └──────▲──────┘                    │
//! │                        │ dequeue           │ put                       │
//! │                        ▼                   │                           │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │   WorkerPool: ReceiptWorker × N  (retry, backoff, dead letter)   │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Pipeline configuration (TOML + environment)
//! - [`backends`] - Builds queue/store trait objects from the config
//! - [`pipeline`] - `SubmissionPipeline` (submit / retrieve)
//! - [`worker`] - `ReceiptWorker`, `WorkerHandle`, `WorkerPool`
//! - [`error`] - Pipeline error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use receipt_pipeline::{Backends, PipelineConfig, SubmissionPipeline, WorkerPool};
//!
//! let config = PipelineConfig::load(None)?;
//! let backends = Backends::connect(&config).await?;
//!
//! let pool = WorkerPool::spawn(&backends, &config.worker);
//! let pipeline = SubmissionPipeline::from_backends(&backends);
//!
//! let id = pipeline.submit(receipt).await?;
//! // ... later ...
//! let points = pipeline.retrieve(&id.to_string()).await?;
//!
//! pool.shutdown().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backends;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod worker;

// =============================================================================
// Re-exports
// =============================================================================

pub use backends::Backends;
pub use config::{BrokerBackend, PipelineConfig, WorkerSettings};
pub use error::{PipelineError, PipelineResult};
pub use pipeline::SubmissionPipeline;
pub use worker::{ReceiptWorker, WorkerHandle, WorkerPool, WorkerStats};

// =============================================================================
// End-to-End Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use receipt_core::ReceiptPayload;

    fn payload(json: &str) -> ReceiptPayload {
        serde_json::from_str(json).unwrap()
    }

    async fn points_when_ready(pipeline: &SubmissionPipeline, id: &str) -> u64 {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match pipeline.retrieve(id).await {
                    Ok(points) => return points,
                    Err(PipelineError::NotFound { .. }) => {
                        tokio::time::sleep(Duration::from_millis(5)).await
                    }
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_submit_then_retrieve_with_workers() {
        let config = PipelineConfig::default();
        let backends = Backends::connect(&config).await.unwrap();
        let pool = WorkerPool::spawn(&backends, &config.worker);
        let pipeline = SubmissionPipeline::from_backends(&backends);

        let corner_market = pipeline
            .submit_payload(payload(
                r#"{
                    "retailer": "M&M Corner Market",
                    "purchaseDate": "2022-03-20",
                    "purchaseTime": "14:33",
                    "items": [
                        {"shortDescription": "Gatorade", "price": "2.25"},
                        {"shortDescription": "Gatorade", "price": "2.25"},
                        {"shortDescription": "Gatorade", "price": "2.25"},
                        {"shortDescription": "Gatorade", "price": "2.25"}
                    ],
                    "total": "9.00"
                }"#,
            ))
            .await
            .unwrap();

        let pepsi = pipeline
            .submit_payload(payload(
                r#"{
                    "retailer": "Target",
                    "purchaseDate": "2022-01-02",
                    "purchaseTime": "13:13",
                    "total": "1.25",
                    "items": [
                        {"shortDescription": "Pepsi - 12-oz", "price": "1.25"}
                    ]
                }"#,
            ))
            .await
            .unwrap();

        assert_eq!(points_when_ready(&pipeline, &corner_market.to_string()).await, 109);
        assert_eq!(points_when_ready(&pipeline, &pepsi.to_string()).await, 31);

        pool.shutdown().await;
    }
}
