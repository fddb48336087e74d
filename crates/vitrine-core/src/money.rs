//! # Money Module
//!
//! Integer-cent amounts parsed from the free-text price field.
//!
//! ## Why Integer Cents?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Price Flow Through The Catalog                       │
//! │                                                                         │
//! │  Form input "10,50" ──► stored as-is ("10,50") in the document store   │
//! │                                                                         │
//! │  Snapshot ──► Money::parse("10,50") = 1050 cents ──► Stats average     │
//! │                                                                         │
//! │  Averages are summed and divided in cents, then rounded once at the    │
//! │  end, so no float error can creep into the displayed mean.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Prices are stored as strings (the store is schemaless and other clients
//! write whatever they like), so parsing is lenient about the decimal
//! separator and strict about everything else.
//!
//! ## Decimal Comma
//! `,` is read as a decimal separator, so `"10,50"` is 10.50, not the 10 a
//! prefix float parse would stop at. Catalog prices are typed the Brazilian
//! way.
//! Thousands separators are not supported (`"1.000,50"` is unparsable).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

// =============================================================================
// Money Type
// =============================================================================

/// An amount of money in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use vitrine_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // R$ 10,99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Checks if the amount is strictly positive.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Parses a decimal price string.
    ///
    /// ## Accepted Forms
    /// - `"10"`, `"10.5"`, `"10,50"`, `"+3"`, `"-2.00"`, `" 7 "` (trimmed)
    /// - A third fractional digit rounds half-up; further digits are ignored
    ///
    /// Everything else (`"abc"`, `"1e3"`, `"10.5.1"`, `""`) is `None`.
    ///
    /// ## Example
    /// ```rust
    /// use vitrine_core::money::Money;
    ///
    /// assert_eq!(Money::parse("10,50"), Some(Money::from_cents(1050)));
    /// assert_eq!(Money::parse("0.125"), Some(Money::from_cents(13)));
    /// assert_eq!(Money::parse("abc"), None);
    /// ```
    pub fn parse(input: &str) -> Option<Money> {
        let s = input.trim();
        let (negative, digits) = match s.as_bytes().first()? {
            b'-' => (true, &s[1..]),
            b'+' => (false, &s[1..]),
            _ => (false, s),
        };

        let (whole, frac) = match digits.find(['.', ',']) {
            Some(pos) => (&digits[..pos], &digits[pos + 1..]),
            None => (digits, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        let whole_cents = if whole.is_empty() {
            0
        } else {
            whole.parse::<i64>().ok()?.checked_mul(100)?
        };

        let frac_digits: Vec<i64> = frac.bytes().map(|b| i64::from(b - b'0')).collect();
        let tenths = frac_digits.first().copied().unwrap_or(0);
        let hundredths = frac_digits.get(1).copied().unwrap_or(0);
        let round_up = frac_digits.get(2).is_some_and(|d| *d >= 5);

        let cents = whole_cents
            .checked_add(tenths * 10 + hundredths + i64::from(round_up))?;

        Some(Money(if negative { -cents } else { cents }))
    }
}

impl FromStr for Money {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s).ok_or_else(|| CoreError::InvalidPrice {
            value: s.to_string(),
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}R$ {},{:02}", sign, abs / 100, abs % 100)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
