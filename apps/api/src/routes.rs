//! HTTP routes.
//!
//! ```text
//! POST /receipts/process       body: receipt JSON   → 200 {"id": "<uuid>"}
//! GET  /receipts/{id}/points                        → 200 {"points": N}
//! GET  /health                                      → 200 OK
//! ```

use axum::{
    body::Bytes,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use receipt_core::{ReceiptId, ReceiptPayload};
use receipt_pipeline::SubmissionPipeline;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

/// Response body of `POST /receipts/process`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub id: ReceiptId,
}

/// Response body of `GET /receipts/{id}/points`.
#[derive(Debug, Serialize, Deserialize)]
pub struct PointsResponse {
    pub points: u64,
}

/// Builds the application router.
pub fn router(pipeline: SubmissionPipeline) -> Router {
    Router::new()
        .route("/receipts/process", post(process_receipt))
        .route("/receipts/{id}/points", get(receipt_points))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    "OK"
}

/// Validates and queues a receipt.
///
/// The body is parsed as JSON whatever the `Content-Type`; a body that is not
/// a receipt document is rejected the same way as one that fails validation.
async fn process_receipt(
    State(pipeline): State<SubmissionPipeline>,
    body: Bytes,
) -> Result<Json<ProcessResponse>, ApiError> {
    let payload: ReceiptPayload = serde_json::from_slice(&body)?;
    let id = pipeline.submit_payload(payload).await?;
    Ok(Json(ProcessResponse { id }))
}

async fn receipt_points(
    State(pipeline): State<SubmissionPipeline>,
    Path(id): Path<String>,
) -> Result<Json<PointsResponse>, ApiError> {
    let points = pipeline.retrieve(&id).await?;
    Ok(Json(PointsResponse { points }))
}

// =============================================================================
// Tests
// =============================================================================
