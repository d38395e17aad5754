//! # Error Types
//!
//! Domain-specific error types for receipt-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  receipt-core errors (this file)                                       │
//! │  ├── CoreError        - Identifier parsing                             │
//! │  ├── ValidationError  - Receipt payload fails structural checks        │
//! │  └── MoneyParseError  - Decimal string is not a valid amount           │
//! │                                                                         │
//! │  receipt-store errors (separate crate)                                 │
//! │  └── StoreError       - Queue / store operation failures               │
//! │                                                                         │
//! │  receipt-pipeline errors (separate crate)                              │
//! │  └── PipelineError    - What the HTTP layer maps to status codes       │
//! │                                                                         │
//! │  Flow: ValidationError → PipelineError → ApiError → HTTP response      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field path, offending value)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Identifier string is not a valid receipt ID.
    #[error("Invalid receipt id: {0}")]
    InvalidReceiptId(String),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Receipt validation errors.
///
/// Every variant names the offending field using the wire name, with a
/// dotted/indexed path for nested values (`items[2].price`).
///
/// ## When This Occurs
/// - A required field is missing from the submitted JSON
/// - A date, time or amount does not match its pattern
/// - The item list is empty
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// Invalid format (e.g., malformed date, price without cents).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A collection that must have entries is empty.
    #[error("{field} must contain at least one entry")]
    Empty { field: String },
}

impl ValidationError {
    /// Returns the field the error refers to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::Empty { field } => field,
        }
    }

    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Money Parse Error
// =============================================================================

/// Errors from parsing a decimal string into [`crate::Money`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyParseError {
    /// The string is empty.
    #[error("amount is empty")]
    Empty,

    /// The string has a leading minus sign.
    #[error("amount must not be negative: '{0}'")]
    Negative(String),

    /// More than two digits after the decimal point.
    #[error("amount has more than two fractional digits: '{0}'")]
    TooPrecise(String),

    /// Anything else that is not `digits[.digits]`.
    #[error("amount is not a decimal number: '{0}'")]
    Malformed(String),

    /// The value does not fit in i64 cents.
    #[error("amount is too large: '{0}'")]
    Overflow(String),
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "retailer".to_string(),
        };
        assert_eq!(err.to_string(), "retailer is required");

        let err = ValidationError::invalid("items[0].price", "must look like 1.25");
        assert_eq!(
            err.to_string(),
            "items[0].price has invalid format: must look like 1.25"
        );

        let err = ValidationError::Empty {
            field: "items".to_string(),
        };
        assert_eq!(err.to_string(), "items must contain at least one entry");
    }

    #[test]
    fn test_validation_error_field() {
        let err = ValidationError::invalid("purchaseTime", "bad");
        assert_eq!(err.field(), "purchaseTime");
    }

    #[test]
    fn test_invalid_receipt_id_message() {
        let err = "nope".parse::<crate::ReceiptId>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidReceiptId(ref s) if s == "nope"));
        assert_eq!(err.to_string(), "Invalid receipt id: nope");
    }
}
