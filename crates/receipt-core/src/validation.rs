//! # Validation Module
//!
//! Turns a raw [`ReceiptPayload`] into a [`Receipt`], or explains why not.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP body (apps/api)                                         │
//! │  └── JSON syntax (serde_json)                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required fields present                                           │
//! │  ├── Charsets, date, time, amount patterns                             │
//! │  └── At least one item                                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Scoring engine                                               │
//! │  └── Performs NO checks; trusts that a Receipt passed layer 2          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use receipt_core::validation::{validate_amount, validate_purchase_time};
//!
//! assert!(validate_amount("total", "35.35").is_ok());
//! assert!(validate_amount("total", "35.3").is_err());
//! assert!(validate_purchase_time("14:33").is_ok());
//! ```

use chrono::{NaiveDate, NaiveTime};

use crate::error::ValidationError;
use crate::types::{hhmm, Item, ItemPayload, Receipt, ReceiptPayload};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Receipt
// =============================================================================

impl TryFrom<ReceiptPayload> for Receipt {
    type Error = ValidationError;

    /// Validates every field, stopping at the first failure.
    ///
    /// Field order follows the wire document: retailer, purchaseDate,
    /// purchaseTime, items, total.
    fn try_from(payload: ReceiptPayload) -> ValidationResult<Self> {
        let retailer = required("retailer", payload.retailer)?;
        validate_retailer(&retailer)?;

        let purchase_date = validate_purchase_date(&required("purchaseDate", payload.purchase_date)?)?;
        let purchase_time = validate_purchase_time(&required("purchaseTime", payload.purchase_time)?)?;

        let items = payload.items.ok_or_else(|| ValidationError::Required {
            field: "items".to_string(),
        })?;
        if items.is_empty() {
            return Err(ValidationError::Empty {
                field: "items".to_string(),
            });
        }
        let items = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| validate_item(index, item))
            .collect::<ValidationResult<Vec<_>>>()?;

        let total = required("total", payload.total)?;
        validate_amount("total", &total)?;

        Ok(Receipt {
            retailer,
            purchase_date,
            purchase_time,
            items,
            total,
        })
    }
}

fn validate_item(index: usize, item: ItemPayload) -> ValidationResult<Item> {
    let field = |name: &str| format!("items[{index}].{name}");

    let short_description = required(&field("shortDescription"), item.short_description)?;
    validate_short_description(&field("shortDescription"), &short_description)?;

    let price = required(&field("price"), item.price)?;
    validate_amount(&field("price"), &price)?;

    Ok(Item {
        short_description,
        price,
    })
}

fn required(field: &str, value: Option<String>) -> ValidationResult<String> {
    value.ok_or_else(|| ValidationError::Required {
        field: field.to_string(),
    })
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a retailer name.
///
/// ## Rules
/// - Must not be blank
/// - Letters, digits, `_`, whitespace, `-` and `&` only
///
/// ## Example
/// ```rust
/// use receipt_core::validation::validate_retailer;
///
/// assert!(validate_retailer("M&M Corner Market").is_ok());
/// assert!(validate_retailer("Joe's").is_err());
/// assert!(validate_retailer("   ").is_err());
/// ```
pub fn validate_retailer(retailer: &str) -> ValidationResult<()> {
    if retailer.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "retailer".to_string(),
        });
    }

    if !retailer.chars().all(|c| is_word_char(c) || c == '&') {
        return Err(ValidationError::invalid(
            "retailer",
            "must contain only letters, numbers, spaces, hyphens, underscores and '&'",
        ));
    }

    Ok(())
}

/// Validates an item description.
///
/// ## Rules
/// - Must not be blank
/// - Letters, digits, `_`, whitespace and `-` only
pub fn validate_short_description(field: &str, description: &str) -> ValidationResult<()> {
    if description.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if !description.chars().all(is_word_char) {
        return Err(ValidationError::invalid(
            field,
            "must contain only letters, numbers, spaces, hyphens and underscores",
        ));
    }

    Ok(())
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c.is_whitespace()
}

// =============================================================================
// Amount Validators
// =============================================================================

/// Validates a price or total.
///
/// ## Rules
/// - One or more digits, a dot, exactly two digits (`^\d+\.\d{2}$`)
/// - Therefore never negative
///
/// ## Example
/// ```rust
/// use receipt_core::validation::validate_amount;
///
/// assert!(validate_amount("price", "6.49").is_ok());
/// assert!(validate_amount("price", "0.00").is_ok());
/// assert!(validate_amount("price", "6").is_err());
/// assert!(validate_amount("price", "-6.49").is_err());
/// ```
pub fn validate_amount(field: &str, amount: &str) -> ValidationResult<()> {
    let well_formed = match amount.split_once('.') {
        Some((whole, cents)) => {
            !whole.is_empty()
                && whole.bytes().all(|b| b.is_ascii_digit())
                && cents.len() == 2
                && cents.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    };

    if !well_formed {
        return Err(ValidationError::invalid(
            field,
            format!("'{amount}' must be a decimal amount with two digits after the point"),
        ));
    }

    Ok(())
}

// =============================================================================
// Date/Time Validators
// =============================================================================

/// Validates and parses `purchaseDate` (`YYYY-MM-DD`).
///
/// ## Example
/// ```rust
/// use receipt_core::validation::validate_purchase_date;
///
/// assert!(validate_purchase_date("2022-01-01").is_ok());
/// assert!(validate_purchase_date("2022-02-30").is_err());
/// assert!(validate_purchase_date("2022-1-1").is_err());
/// ```
pub fn validate_purchase_date(date: &str) -> ValidationResult<NaiveDate> {
    let shape_ok = date.len() == 10
        && date
            .bytes()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() });

    if !shape_ok {
        return Err(ValidationError::invalid(
            "purchaseDate",
            format!("'{date}' must be formatted YYYY-MM-DD"),
        ));
    }

    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
        ValidationError::invalid("purchaseDate", format!("'{date}' is not a calendar date"))
    })
}

/// Validates and parses `purchaseTime` (`HH:MM`, 24-hour).
///
/// ## Example
/// ```rust
/// use receipt_core::validation::validate_purchase_time;
///
/// assert!(validate_purchase_time("00:00").is_ok());
/// assert!(validate_purchase_time("23:59").is_ok());
/// assert!(validate_purchase_time("24:00").is_err());
/// assert!(validate_purchase_time("2:30").is_err());
/// assert!(validate_purchase_time("14:30:00").is_err());
/// ```
pub fn validate_purchase_time(time: &str) -> ValidationResult<NaiveTime> {
    let shape_ok = time.len() == 5
        && time
            .bytes()
            .enumerate()
            .all(|(i, b)| if i == 2 { b == b':' } else { b.is_ascii_digit() });

    if !shape_ok {
        return Err(ValidationError::invalid(
            "purchaseTime",
            format!("'{time}' must be formatted HH:MM"),
        ));
    }

    NaiveTime::parse_from_str(time, hhmm::FORMAT).map_err(|_| {
        ValidationError::invalid("purchaseTime", format!("'{time}' is not a time of day"))
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
