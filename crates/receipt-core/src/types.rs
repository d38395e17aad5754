//! # Domain Types
//!
//! Core domain types used throughout the Receipt Processor.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   validate   ┌─────────────────┐                  │
//! │  │ ReceiptPayload  │ ───────────► │     Receipt     │                  │
//! │  │  ─────────────  │              │  ─────────────  │                  │
//! │  │  raw strings    │              │  retailer       │                  │
//! │  │  all optional   │              │  purchase_date  │                  │
//! │  └─────────────────┘              │  purchase_time  │                  │
//! │                                   │  items: [Item]  │                  │
//! │                                   │  total          │                  │
//! │                                   └────────┬────────┘                  │
//! │                                            │                            │
//! │  ┌─────────────────┐              ┌────────▼────────┐                  │
//! │  │    ReceiptId    │ ───────────► │   QueueEntry    │                  │
//! │  │  UUID v4        │              │  (id, receipt)  │                  │
//! │  └─────────────────┘              └─────────────────┘                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Names
//! Receipts serialize with the camelCase names clients submit
//! (`purchaseDate`, `shortDescription`), and amounts stay as the submitted
//! strings, so a stored receipt round-trips byte-for-byte.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

// =============================================================================
// Receipt Identifier
// =============================================================================

/// Opaque identifier handed back at submission time.
///
/// ## Why UUID v4?
/// 128 random bits: unique across processes and API replicas without any
/// coordination, and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptId(Uuid);

impl ReceiptId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        ReceiptId(Uuid::new_v4())
    }
}

impl Default for ReceiptId {
    fn default() -> Self {
        ReceiptId::new()
    }
}

/// Canonical form: lowercase hyphenated, e.g. `7d4d837b-ef5e-47c0-89a9-889657b66eb9`.
impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ReceiptId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(ReceiptId)
            .map_err(|_| CoreError::InvalidReceiptId(s.to_string()))
    }
}

// =============================================================================
// Receipt
// =============================================================================

/// A single purchased line on a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Free-text description as printed on the receipt.
    pub short_description: String,

    /// Price as submitted, e.g. `"6.49"`.
    pub price: String,
}

/// A validated purchase receipt.
///
/// Immutable once accepted: nothing in the pipeline edits a receipt after
/// validation, it is only moved between the queue and the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Retailer or store name.
    pub retailer: String,

    /// Date of purchase (`YYYY-MM-DD` on the wire).
    pub purchase_date: NaiveDate,

    /// Time of purchase (`HH:MM`, 24-hour, on the wire).
    #[serde(with = "hhmm")]
    pub purchase_time: NaiveTime,

    /// Purchased items, in receipt order. Never empty after validation.
    pub items: Vec<Item>,

    /// Total amount paid as submitted, e.g. `"35.35"`.
    ///
    /// Never reconciled against the item prices.
    pub total: String,
}

// =============================================================================
// Raw Payload
// =============================================================================

/// A receipt exactly as it arrived, before validation.
///
/// Every field is optional so that a missing field becomes a
/// [`crate::ValidationError::Required`] naming it, rather than an opaque
/// deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptPayload {
    pub retailer: Option<String>,
    pub purchase_date: Option<String>,
    pub purchase_time: Option<String>,
    pub items: Option<Vec<ItemPayload>>,
    pub total: Option<String>,
}

/// An item as it arrived, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    pub short_description: Option<String>,
    pub price: Option<String>,
}

// =============================================================================
// Queue Entry
// =============================================================================

/// The `(id, receipt)` pair handed from intake to the workers.
///
/// Has no identity of its own beyond the pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: ReceiptId,
    pub receipt: Receipt,
}

impl QueueEntry {
    pub fn new(id: ReceiptId, receipt: Receipt) -> Self {
        QueueEntry { id, receipt }
    }
}

// =============================================================================
// Submission State
// =============================================================================

/// Lifecycle of one submission.
///
/// ## State Machine
/// ```text
/// Received ──enqueue ok──► Queued ──put ok──────────────► Stored
///                             │
///                             └──worker crash / put gives up──► Lost
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    /// Validated receipt handed to the pipeline.
    Received,
    /// Sitting in the work queue; the id has been returned to the caller.
    Queued,
    /// Written to the receipt store; retrievable from now on.
    Stored,
    /// Dequeued but never stored.
    Lost,
}

impl SubmissionState {
    /// True for `Stored` and `Lost`.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::Stored | SubmissionState::Lost)
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionState::Received => write!(f, "received"),
            SubmissionState::Queued => write!(f, "queued"),
            SubmissionState::Stored => write!(f, "stored"),
            SubmissionState::Lost => write!(f, "lost"),
        }
    }
}

// =============================================================================
// Serde Helpers
// =============================================================================

/// `HH:MM` (de)serialization for [`NaiveTime`].
///
/// chrono's default representation is `HH:MM:SS`, which would change the
/// stored bytes.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Receipt {
        Receipt {
            retailer: "Walgreens".to_string(),
            purchase_date: NaiveDate::from_ymd_opt(2022, 1, 2).unwrap(),
            purchase_time: NaiveTime::from_hms_opt(8, 13, 0).unwrap(),
            items: vec![
                Item {
                    short_description: "Pepsi - 12-oz".to_string(),
                    price: "1.25".to_string(),
                },
                Item {
                    short_description: "Dasani".to_string(),
                    price: "1.40".to_string(),
                },
            ],
            total: "2.65".to_string(),
        }
    }

    #[test]
    fn test_receipt_wire_format() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(
            json,
            r#"{"retailer":"Walgreens","purchaseDate":"2022-01-02","purchaseTime":"08:13","items":[{"shortDescription":"Pepsi - 12-oz","price":"1.25"},{"shortDescription":"Dasani","price":"1.40"}],"total":"2.65"}"#
        );

        let back: Receipt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_receipt_id_display_and_parse() {
        let id = ReceiptId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(text.parse::<ReceiptId>().unwrap(), id);

        assert!("not-a-uuid".parse::<ReceiptId>().is_err());
        assert!("".parse::<ReceiptId>().is_err());
    }

    #[test]
    fn test_receipt_ids_are_unique() {
        let a = ReceiptId::new();
        let b = ReceiptId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_queue_entry_json_shape() {
        let id: ReceiptId = "7d4d837b-ef5e-47c0-89a9-889657b66eb9".parse().unwrap();
        let entry = QueueEntry::new(id, sample());
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["id"], "7d4d837b-ef5e-47c0-89a9-889657b66eb9");
        assert_eq!(value["receipt"]["total"], "2.65");
    }

    #[test]
    fn test_submission_state_terminal() {
        assert!(!SubmissionState::Received.is_terminal());
        assert!(!SubmissionState::Queued.is_terminal());
        assert!(SubmissionState::Stored.is_terminal());
        assert!(SubmissionState::Lost.is_terminal());
        assert_eq!(SubmissionState::Queued.to_string(), "queued");
    }
}
