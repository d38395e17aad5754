//! # receipt-core: Pure Business Logic for the Receipt Processor
//!
//! This crate is the **heart** of the Receipt Processor. It contains the
//! receipt model and the scoring engine as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Receipt Processor Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP API (apps/api)                          │   │
//! │  │    POST /receipts/process        GET /receipts/{id}/points      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  receipt-pipeline                               │   │
//! │  │    submit ──► queue ──► worker ──► store ──► retrieve          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ receipt-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ validation│  │  scoring  │  │   │
//! │  │   │  Receipt  │  │   Money   │  │  payload  │  │   Rules   │  │   │
//! │  │   │ ReceiptId │  │  parsing  │  │  checks   │  │  Engine   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Receipt, Item, ReceiptId, QueueEntry)
//! - [`money`] - Money type parsed from decimal strings into integer cents
//! - [`error`] - Domain error types
//! - [`validation`] - Turning a raw payload into a validated Receipt
//! - [`scoring`] - Scoring rules and the engine that sums them
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every rule is deterministic - same receipt = same points
//! 2. **No I/O**: Broker, network and file system access is FORBIDDEN here
//! 3. **Integer Money**: Amounts are compared in cents, never as floats
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use receipt_core::scoring::ScoringEngine;
//! use receipt_core::types::ReceiptPayload;
//! use receipt_core::Receipt;
//!
//! let payload: ReceiptPayload = serde_json::from_str(r#"{
//!     "retailer": "Target",
//!     "purchaseDate": "2022-01-02",
//!     "purchaseTime": "13:13",
//!     "total": "1.25",
//!     "items": [{"shortDescription": "Pepsi - 12-oz", "price": "1.25"}]
//! }"#).unwrap();
//!
//! let receipt = Receipt::try_from(payload).unwrap();
//! let engine = ScoringEngine::standard();
//! assert_eq!(engine.total_points(&receipt), 31);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod scoring;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use receipt_core::Money` instead of
// `use receipt_core::money::Money`

pub use error::{CoreError, MoneyParseError, ValidationError};
pub use money::Money;
pub use scoring::{Rule, ScoringEngine};
pub use types::*;
