//! # Receipt Processor API
//!
//! HTTP front end for the receipt pipeline.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Receipt API Server                              │
//! │                                                                         │
//! │  Client ──► axum Router ──► SubmissionPipeline ──► WorkQueue           │
//! │                 │                  │                    │               │
//! │                 │                  ▼                    ▼ WorkerPool    │
//! │             TraceLayer        ReceiptStore ◄────────────┘               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `PORT` - HTTP port (default 8080)
//! - `BIND_ADDR` - listen address (default 0.0.0.0)
//! - `RECEIPT_ROLE` - `api`, `worker` or `all` (default)
//! - `RECEIPT_CONFIG` - path to the pipeline TOML file
//! - `RECEIPT_QUEUE`, `RECEIPT_DATABASE`, `RECEIPT_BACKEND`,
//!   `RECEIPT_WORKERS`, `REDIS_URL`, `REDIS_HOST` - pipeline overrides
//! - `RUST_LOG` - log filter (default `info`)

pub mod config;
pub mod error;
pub mod routes;

pub use config::{ApiConfig, ConfigError, Role};
pub use error::ApiError;
pub use routes::router;
