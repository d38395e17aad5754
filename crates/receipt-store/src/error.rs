//! # Store Error Types
//!
//! Error types for queue and store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  Broker error (redis::RedisError) / closed channel                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Says WHICH resource failed                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PipelineError (receipt-pipeline) ← Same kind, pipeline boundary       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError (apps/api) ← 404 / 500 / 503                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Queue and store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The work queue cannot be reached.
    ///
    /// ## When This Occurs
    /// - Redis is down or the connection dropped
    /// - The in-memory channel was closed
    ///
    /// Typically transient; callers may retry.
    #[error("Queue unavailable: {0}")]
    QueueUnavailable(String),

    /// The receipt store cannot be reached.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// No receipt is stored under the id.
    ///
    /// ## When This Occurs
    /// - The id was never issued
    /// - The worker has not stored it yet
    #[error("Receipt not found: {id}")]
    NotFound { id: String },

    /// A queued message or stored value could not be (de)serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Initial connection to the broker failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

impl StoreError {
    /// Creates a NotFound error for the given id.
    pub fn not_found(id: impl ToString) -> Self {
        StoreError::NotFound { id: id.to_string() }
    }

    /// Wraps a broker error raised by a queue operation.
    pub fn queue(err: impl std::fmt::Display) -> Self {
        StoreError::QueueUnavailable(err.to_string())
    }

    /// Wraps a broker error raised by a store operation.
    pub fn store(err: impl std::fmt::Display) -> Self {
        StoreError::StoreUnavailable(err.to_string())
    }

    /// True for failures that may succeed if tried again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::QueueUnavailable(_)
                | StoreError::StoreUnavailable(_)
                | StoreError::ConnectionFailed(_)
        )
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type for queue and store operations.
pub type StoreResult<T> = Result<T, StoreError>;
