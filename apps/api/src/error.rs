//! HTTP error responses.
//!
//! Every failure leaves the server as `{"error": "<message>"}` with the
//! status below.
//!
//! | Pipeline error        | Status | Message                         |
//! |-----------------------|--------|---------------------------------|
//! | Validation            | 400    | The receipt is invalid.         |
//! | NotFound              | 404    | No receipt found for that ID.   |
//! | QueueUnavailable      | 503    | Receipt queue is unavailable.   |
//! | anything else         | 500    | Internal server error.          |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use receipt_pipeline::PipelineError;
use serde_json::json;
use tracing::{debug, error, warn};

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("The receipt is invalid.")]
    InvalidReceipt(String),

    #[error("No receipt found for that ID.")]
    NotFound,

    #[error("Receipt queue is unavailable.")]
    Unavailable(String),

    #[error("Internal server error.")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidReceipt(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(e) => ApiError::InvalidReceipt(e.to_string()),
            PipelineError::NotFound { .. } => ApiError::NotFound,
            PipelineError::QueueUnavailable(msg) => ApiError::Unavailable(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidReceipt(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::InvalidReceipt(reason) => debug!(%reason, "Rejected receipt"),
            ApiError::NotFound => {}
            ApiError::Unavailable(reason) => warn!(%reason, "Queue unavailable"),
            ApiError::Internal(reason) => error!(%reason, "Request failed"),
        }

        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use receipt_core::ValidationError;

    #[test]
    fn test_pipeline_error_mapping() {
        let invalid = ApiError::from(PipelineError::Validation(ValidationError::Empty {
            field: "items".to_string(),
        }));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(invalid.to_string(), "The receipt is invalid.");

        let missing = ApiError::from(PipelineError::NotFound { id: "x".into() });
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_string(), "No receipt found for that ID.");

        let queue = ApiError::from(PipelineError::QueueUnavailable("down".into()));
        assert_eq!(queue.status(), StatusCode::SERVICE_UNAVAILABLE);

        let store = ApiError::from(PipelineError::StoreUnavailable("down".into()));
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
