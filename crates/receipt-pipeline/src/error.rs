//! # Pipeline Error Types
//!
//! Errors surfaced by [`SubmissionPipeline`](crate::SubmissionPipeline) and the
//! worker machinery.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Intake        │  │   Resources     │  │   Configuration         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Validation     │  │  QueueUnavail.  │  │  InvalidConfig          │ │
//! │  │  NotFound       │  │  StoreUnavail.  │  │  ConfigLoadFailed       │ │
//! │  │                 │  │  Connection     │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use receipt_core::ValidationError;
use receipt_store::StoreError;
use thiserror::Error;

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Pipeline error type.
#[derive(Debug, Error)]
pub enum PipelineError {
    // =========================================================================
    // Intake Errors
    // =========================================================================
    /// The submitted receipt failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No receipt is stored under the id (unknown, malformed or not yet
    /// processed).
    #[error("No receipt found for id '{id}'")]
    NotFound { id: String },

    // =========================================================================
    // Resource Errors
    // =========================================================================
    /// The work queue rejected or could not accept the entry.
    #[error("Queue unavailable: {0}")]
    QueueUnavailable(String),

    /// The receipt store could not be read or written.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The broker could not be reached at startup.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A queued or stored value could not be decoded.
    #[error("Corrupt data: {0}")]
    CorruptData(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid pipeline configuration.
    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Shutdown channel closed before the signal was delivered.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::QueueUnavailable(msg) => PipelineError::QueueUnavailable(msg),
            StoreError::StoreUnavailable(msg) => PipelineError::StoreUnavailable(msg),
            StoreError::NotFound { id } => PipelineError::NotFound { id },
            StoreError::Serialization(msg) => PipelineError::CorruptData(msg),
            StoreError::ConnectionFailed(msg) => PipelineError::ConnectionFailed(msg),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::ConfigLoadFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl PipelineError {
    /// Returns true if the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::QueueUnavailable(_)
                | PipelineError::StoreUnavailable(_)
                | PipelineError::ConnectionFailed(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidConfig(_) | PipelineError::ConfigLoadFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_keep_their_kind() {
        assert!(matches!(
            PipelineError::from(StoreError::queue("down")),
            PipelineError::QueueUnavailable(_)
        ));
        assert!(matches!(
            PipelineError::from(StoreError::store("down")),
            PipelineError::StoreUnavailable(_)
        ));
        assert!(matches!(
            PipelineError::from(StoreError::not_found("abc")),
            PipelineError::NotFound { id } if id == "abc"
        ));
    }

    #[test]
    fn test_error_categories() {
        assert!(PipelineError::QueueUnavailable("x".into()).is_retryable());
        assert!(!PipelineError::NotFound { id: "x".into() }.is_retryable());
        assert!(PipelineError::InvalidConfig("x".into()).is_config_error());
        assert!(!PipelineError::StoreUnavailable("x".into()).is_config_error());
    }
}
