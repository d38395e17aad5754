//! # Scoring Module
//!
//! Derives a loyalty-points total from a [`Receipt`].
//!
//! ## Engine Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ScoringEngine                                   │
//! │                                                                         │
//! │   Receipt ──┬──► Rule "retailer_name"       ──► 6  ──┐                 │
//! │             ├──► Rule "round_dollar"        ──► 0  ──┤                 │
//! │             ├──► Rule "quarter_multiple"    ──► 0  ──┤                 │
//! │             ├──► Rule "item_pairs"          ──► 10 ──┼──► Σ = 28       │
//! │             ├──► Rule "description_length"  ──► 6  ──┤                 │
//! │             ├──► Rule "odd_day"             ──► 6  ──┤                 │
//! │             └──► Rule "afternoon"           ──► 0  ──┘                 │
//! │                                                                         │
//! │   • Rules are independent: order never changes the sum                 │
//! │   • Rules never fail: an unparseable amount scores 0 for that rule     │
//! │   • The rule list is passed in; there is no global registry            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use receipt_core::scoring::{rules, Rule, ScoringEngine};
//!
//! // The standard seven rules
//! let engine = ScoringEngine::standard();
//!
//! // Or any subset / custom rule, e.g. for experiments
//! let retailer_only = ScoringEngine::new(vec![
//!     Rule::new("retailer_name", rules::retailer_name),
//!     Rule::new("flat_bonus", |_| 3),
//! ]);
//! assert_eq!(retailer_only.rules().len(), 2);
//! ```

use std::fmt;

use chrono::{Datelike, NaiveTime};
use tracing::trace;

use crate::types::Receipt;

// =============================================================================
// Rule
// =============================================================================

/// A named, pure scoring function.
///
/// ## Contract
/// - Deterministic: same receipt, same points
/// - No side effects
/// - Never panics; malformed input scores 0
pub struct Rule {
    name: &'static str,
    score: Box<dyn Fn(&Receipt) -> u64 + Send + Sync>,
}

impl Rule {
    /// Wraps a function or closure as a rule.
    pub fn new<F>(name: &'static str, score: F) -> Self
    where
        F: Fn(&Receipt) -> u64 + Send + Sync + 'static,
    {
        Rule {
            name,
            score: Box::new(score),
        }
    }

    /// Name used in logs and breakdowns.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Points this rule awards the receipt.
    #[inline]
    pub fn score(&self, receipt: &Receipt) -> u64 {
        (self.score)(receipt)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// One line of a [`ScoringEngine::breakdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RulePoints {
    pub rule: &'static str,
    pub points: u64,
}

// =============================================================================
// Scoring Engine
// =============================================================================

/// Sums the contributions of an explicit list of rules.
#[derive(Debug)]
pub struct ScoringEngine {
    rules: Vec<Rule>,
}

impl ScoringEngine {
    /// Creates an engine over the given rules.
    pub fn new(rules: Vec<Rule>) -> Self {
        ScoringEngine { rules }
    }

    /// Creates an engine with the seven standard loyalty rules.
    pub fn standard() -> Self {
        ScoringEngine::new(vec![
            Rule::new("retailer_name", rules::retailer_name),
            Rule::new("round_dollar", rules::round_dollar),
            Rule::new("quarter_multiple", rules::quarter_multiple),
            Rule::new("item_pairs", rules::item_pairs),
            Rule::new("description_length", rules::description_length),
            Rule::new("odd_day", rules::odd_day),
            Rule::new("afternoon", rules::afternoon),
        ])
    }

    /// The rules, in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Total points for a receipt.
    ///
    /// ## Example
    /// ```rust
    /// use receipt_core::scoring::ScoringEngine;
    ///
    /// let engine = ScoringEngine::new(Vec::new());
    /// # let receipt: receipt_core::Receipt = serde_json::from_str(r#"{
    /// #   "retailer": "Target", "purchaseDate": "2022-01-01",
    /// #   "purchaseTime": "13:01", "items": [], "total": "1.00"}"#).unwrap();
    /// // No rules, no points
    /// assert_eq!(engine.total_points(&receipt), 0);
    /// ```
    pub fn total_points(&self, receipt: &Receipt) -> u64 {
        self.rules.iter().fold(0u64, |total, rule| {
            let points = rule.score(receipt);
            trace!(rule = rule.name(), points, "Rule scored");
            total.saturating_add(points)
        })
    }

    /// Per-rule contributions, in rule order.
    pub fn breakdown(&self, receipt: &Receipt) -> Vec<RulePoints> {
        self.rules
            .iter()
            .map(|rule| RulePoints {
                rule: rule.name(),
                points: rule.score(receipt),
            })
            .collect()
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        ScoringEngine::standard()
    }
}

// =============================================================================
// Standard Rules
// =============================================================================

/// The standard loyalty rules as plain functions.
pub mod rules {
    use super::*;
    use crate::money::Money;

    /// Points for a total with no cents.
    pub const ROUND_DOLLAR_POINTS: u64 = 50;

    /// Points for a total that is a multiple of $0.25.
    pub const QUARTER_MULTIPLE_POINTS: u64 = 25;

    /// Points per complete pair of items.
    pub const ITEM_PAIR_POINTS: u64 = 5;

    /// Description-length rule rate: 20% of the price, in basis points.
    pub const DESCRIPTION_PRICE_RATE_BPS: u32 = 2000;

    /// Points for an odd day of the month.
    pub const ODD_DAY_POINTS: u64 = 6;

    /// Points for a purchase strictly between 14:00 and 16:00.
    pub const AFTERNOON_POINTS: u64 = 10;

    /// 1 point per ASCII letter or digit in the retailer name.
    ///
    /// Spaces, punctuation and `&` score nothing: `"M&M Corner Market"` is 14.
    pub fn retailer_name(receipt: &Receipt) -> u64 {
        receipt
            .retailer
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .count() as u64
    }

    /// 50 points if the total is a round dollar amount.
    pub fn round_dollar(receipt: &Receipt) -> u64 {
        match Money::parse(&receipt.total) {
            Ok(total) if total.is_round_dollar() => ROUND_DOLLAR_POINTS,
            _ => 0,
        }
    }

    /// 25 points if the total is a multiple of 0.25.
    ///
    /// Independent of [`round_dollar`]: `"9.00"` earns both.
    pub fn quarter_multiple(receipt: &Receipt) -> u64 {
        match Money::parse(&receipt.total) {
            Ok(total) if total.is_multiple_of(25) => QUARTER_MULTIPLE_POINTS,
            _ => 0,
        }
    }

    /// 5 points for every two items.
    pub fn item_pairs(receipt: &Receipt) -> u64 {
        (receipt.items.len() / 2) as u64 * ITEM_PAIR_POINTS
    }

    /// For each item whose trimmed description length is a multiple of 3,
    /// `ceil(price × 0.2)` points.
    ///
    /// Always rounds up, per item, before summing. Items with an
    /// unparseable price contribute nothing; the other items still count.
    pub fn description_length(receipt: &Receipt) -> u64 {
        receipt
            .items
            .iter()
            .filter(|item| item.short_description.trim().chars().count() % 3 == 0)
            .filter_map(|item| Money::parse(&item.price).ok())
            .map(|price| price.ceil_dollars_at_rate(DESCRIPTION_PRICE_RATE_BPS).max(0) as u64)
            .sum()
    }

    /// 6 points if the day of the purchase date is odd.
    pub fn odd_day(receipt: &Receipt) -> u64 {
        if receipt.purchase_date.day() % 2 == 1 {
            ODD_DAY_POINTS
        } else {
            0
        }
    }

    /// 10 points if the purchase time is after 14:00 and before 16:00.
    ///
    /// Both boundaries are exclusive.
    pub fn afternoon(receipt: &Receipt) -> u64 {
        let start = NaiveTime::from_hms_opt(14, 0, 0);
        let end = NaiveTime::from_hms_opt(16, 0, 0);
        match (start, end) {
            (Some(start), Some(end))
                if receipt.purchase_time > start && receipt.purchase_time < end =>
            {
                AFTERNOON_POINTS
            }
            _ => 0,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
