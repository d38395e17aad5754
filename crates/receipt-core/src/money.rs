//! # Money Module
//!
//! Provides the `Money` type for handling receipt amounts safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Scoring asks "is the total a multiple of 0.25?"                        │
//! │                                                                         │
//! │  With floats:                                                           │
//! │    "0.29" → 0.29 × 100 = 28.999999999999996 → truncated to 28  ❌      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    "0.29" → 29 cents, parsed digit by digit                             │
//! │    29 % 25 != 0, exactly as written on the receipt                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use receipt_core::money::Money;
//!
//! let total = Money::parse("35.35").unwrap();
//! assert_eq!(total.cents(), 3535);
//! assert!(!total.is_round_dollar());
//!
//! let price = Money::parse("12.25").unwrap();
//! // 20% of $12.25 = $2.45, rounded up to whole dollars
//! assert_eq!(price.ceil_dollars_at_rate(2000), 3);
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::MoneyParseError;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a non-negative monetary value in cents.
///
/// ## Where Money is Used
/// ```text
/// Receipt.total ("35.35") ──► Money::parse ──► round-dollar / quarter rules
///
/// Item.price ("12.25")    ──► Money::parse ──► description-length rule
/// ```
///
/// Receipts keep their amounts as the submitted strings; a `Money` only
/// exists while a rule is looking at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Parses a decimal string such as `"35.35"`, `"9.00"` or `"12"`.
    ///
    /// ## Rules
    /// - At least one digit before the optional decimal point
    /// - At most two digits after it (`"1.5"` is 150 cents)
    /// - No sign, no exponent, no whitespace
    ///
    /// ## Example
    /// ```rust
    /// use receipt_core::money::Money;
    ///
    /// assert_eq!(Money::parse("2.65").unwrap().cents(), 265);
    /// assert_eq!(Money::parse("1.5").unwrap().cents(), 150);
    /// assert!(Money::parse("-1.00").is_err());
    /// assert!(Money::parse("1.234").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, MoneyParseError> {
        if input.is_empty() {
            return Err(MoneyParseError::Empty);
        }
        if input.starts_with('-') {
            return Err(MoneyParseError::Negative(input.to_string()));
        }

        let (whole, fraction) = match input.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (input, ""),
        };

        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(fraction) {
            return Err(MoneyParseError::Malformed(input.to_string()));
        }
        if input.ends_with('.') {
            return Err(MoneyParseError::Malformed(input.to_string()));
        }
        if fraction.len() > 2 {
            return Err(MoneyParseError::TooPrecise(input.to_string()));
        }

        let overflow = || MoneyParseError::Overflow(input.to_string());
        let dollars: i64 = whole.parse().map_err(|_| overflow())?;
        let cents: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| overflow())? * 10,
            _ => fraction.parse().map_err(|_| overflow())?,
        };

        dollars
            .checked_mul(100)
            .and_then(|d| d.checked_add(cents))
            .map(Money)
            .ok_or_else(overflow)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-dollar portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// True if the amount is an exact multiple of `step_cents`.
    ///
    /// A zero step never divides anything.
    #[inline]
    pub const fn is_multiple_of(&self, step_cents: i64) -> bool {
        step_cents != 0 && self.0 % step_cents == 0
    }

    /// True if the amount has no cents (`"9.00"`).
    #[inline]
    pub const fn is_round_dollar(&self) -> bool {
        self.is_multiple_of(100)
    }

    /// Applies a rate in basis points and rounds UP to whole dollars.
    ///
    /// ## Implementation
    /// `amount_cents × bps / 10000` is the share in cents; dividing by 100
    /// more gives dollars. Ceiling is `(n + d - 1) / d` on the combined
    /// divisor, done in i128 so large receipts cannot overflow.
    ///
    /// ## Example
    /// ```rust
    /// use receipt_core::money::Money;
    ///
    /// // $1.40 × 20% = $0.28 → 1
    /// assert_eq!(Money::from_cents(140).ceil_dollars_at_rate(2000), 1);
    /// // $12.00 × 20% = $2.40 → 3
    /// assert_eq!(Money::from_cents(1200).ceil_dollars_at_rate(2000), 3);
    /// // $0.00 stays 0
    /// assert_eq!(Money::from_cents(0).ceil_dollars_at_rate(2000), 0);
    /// ```
    pub fn ceil_dollars_at_rate(&self, bps: u32) -> i64 {
        const DIVISOR: i128 = 10_000 * 100;
        let scaled = self.0 as i128 * bps as i128;
        let dollars = (scaled + DIVISOR - 1).div_euclid(DIVISOR);
        dollars as i64
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}

/// Display matches the wire format: `35.35`, no currency sign.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.dollars(), self.cents_part())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_fraction_digits() {
        assert_eq!(Money::parse("35.35").unwrap().cents(), 3535);
        assert_eq!(Money::parse("9.00").unwrap().cents(), 900);
        assert_eq!(Money::parse("0.01").unwrap().cents(), 1);
    }

    #[test]
    fn test_parse_short_forms() {
        assert_eq!(Money::parse("12").unwrap().cents(), 1200);
        assert_eq!(Money::parse("1.5").unwrap().cents(), 150);
        assert_eq!(Money::parse("007.10").unwrap().cents(), 710);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(Money::parse(""), Err(MoneyParseError::Empty));
        assert!(matches!(
            Money::parse("-2.00"),
            Err(MoneyParseError::Negative(_))
        ));
        assert!(matches!(
            Money::parse("1.999"),
            Err(MoneyParseError::TooPrecise(_))
        ));
        for bad in ["abc", ".50", "1.", "1,00", " 1.00", "1.0a", "1e3", "+1.00"] {
            assert!(
                matches!(Money::parse(bad), Err(MoneyParseError::Malformed(_))),
                "{bad} should be malformed"
            );
        }
        assert!(matches!(
            Money::parse("99999999999999999999.00"),
            Err(MoneyParseError::Overflow(_))
        ));
    }

    #[test]
    fn test_multiples() {
        let nine = Money::parse("9.00").unwrap();
        assert!(nine.is_round_dollar());
        assert!(nine.is_multiple_of(25));

        let quarter = Money::parse("1.25").unwrap();
        assert!(!quarter.is_round_dollar());
        assert!(quarter.is_multiple_of(25));

        // 0.29 is where float × 100 truncation goes wrong
        let odd = Money::parse("0.29").unwrap();
        assert!(!odd.is_multiple_of(25));
        assert_eq!(odd.cents(), 29);

        assert!(!nine.is_multiple_of(0));
    }

    #[test]
    fn test_ceil_dollars_at_rate_rounds_up() {
        assert_eq!(Money::from_cents(1225).ceil_dollars_at_rate(2000), 3);
        assert_eq!(Money::from_cents(1200).ceil_dollars_at_rate(2000), 3);
        assert_eq!(Money::from_cents(500).ceil_dollars_at_rate(2000), 1);
        assert_eq!(Money::from_cents(501).ceil_dollars_at_rate(2000), 2);
        assert_eq!(Money::from_cents(1).ceil_dollars_at_rate(2000), 1);
        assert_eq!(Money::default().ceil_dollars_at_rate(2000), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(3535).to_string(), "35.35");
        assert_eq!(Money::from_cents(900).to_string(), "9.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
    }
}
