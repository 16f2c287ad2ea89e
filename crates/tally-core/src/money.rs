//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  19.99 × 2 in binary floating point = 39.980000000000004               │
//! │  Comparing paid (50.00) against a total like that breaks the           │
//! │  "paid == total" branch of settlement.                                 │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    1999 × 2 = 3998, compared exactly                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Operator input ("50.00") is parsed exactly with `rust_decimal` and
//! converted to minor units; floats never enter the engine.
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let price = Money::from_cents(1999); // 19.99
//! let line = price.multiply_quantity(2);
//! assert_eq!(line.cents(), 3998);
//!
//! let paid = Money::parse("50.00", 2).unwrap();
//! assert_eq!((paid - line).cents(), 1002);
//! ```

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{EngineError, EngineResult};
use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents for USD).
///
/// ## Where Money Flows
/// ```text
/// Product/Variant price ──► CartLine.unit_price (frozen) ──► line total
///                                                               │
///        Σ line totals = subtotal ──► tax ──► total ◄───────────┘
///                                               │
///                         tendered ─────────────┴──► change | discount
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Parses an operator-entered amount into minor units.
    ///
    /// `decimals` is the currency's number of minor-unit digits (2 for USD,
    /// 0 for JPY). Extra fractional digits are rounded half away from zero.
    ///
    /// ## Rules
    /// - Surrounding whitespace is ignored
    /// - Must be a plain decimal number (no exponent, no currency symbol)
    /// - Must not be negative
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::parse("45", 2).unwrap().cents(), 4500);
    /// assert_eq!(Money::parse(" 6.025 ", 2).unwrap().cents(), 603);
    /// assert_eq!(Money::parse("1200", 0).unwrap().cents(), 1200);
    /// assert!(Money::parse("-1", 2).is_err());
    /// assert!(Money::parse("abc", 2).is_err());
    /// ```
    pub fn parse(input: &str, decimals: u32) -> EngineResult<Money> {
        let trimmed = input.trim();
        let invalid = |reason: &str| EngineError::InvalidTender {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("amount is empty"));
        }

        let amount = Decimal::from_str(trimmed).map_err(|_| invalid("not a number"))?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(invalid("amount is negative"));
        }

        let scale = Decimal::from(10_i64.pow(decimals));
        let minor = amount
            .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(scale)
            .and_then(|d| d.trunc().to_i64())
            .ok_or_else(|| invalid("amount is too large"))?;

        Ok(Money(minor))
    }

    /// Calculates tax on this amount.
    ///
    /// ## Rounding
    /// Integer math: `(amount * bps + 5000) / 10000`. The +5000 rounds
    /// half up to the nearest minor unit for non-negative amounts.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    /// use tally_core::types::TaxRate;
    ///
    /// // 39.98 × 10% = 3.998 → 4.00
    /// let tax = Money::from_cents(3998).calculate_tax(TaxRate::from_bps(1000));
    /// assert_eq!(tax.cents(), 400);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 keeps large subtotals from overflowing
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies a unit price by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Renders the amount with `decimals` fractional digits, no symbol.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(602).to_decimal_string(2), "6.02");
    /// assert_eq!(Money::from_cents(1200).to_decimal_string(0), "1200");
    /// ```
    pub fn to_decimal_string(&self, decimals: u32) -> String {
        let divisor = 10_i64.pow(decimals);
        let sign = if self.0 < 0 { "-" } else { "" };
        let whole = (self.0 / divisor).abs();
        let frac = (self.0 % divisor).abs();

        if decimals == 0 {
            format!("{sign}{whole}")
        } else {
            format!("{sign}{whole}.{frac:0width$}", width = decimals as usize)
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly two-decimal rendering. Use `Currency::format` for
/// anything an operator or customer sees.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string(2))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(0).to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 10.00 at 8.25% = 0.825 → 0.83
        let tax = Money::from_cents(1000).calculate_tax(TaxRate::from_bps(825));
        assert_eq!(tax.cents(), 83);

        // 39.98 at 10% = 3.998 → 4.00
        let tax = Money::from_cents(3998).calculate_tax(TaxRate::from_bps(1000));
        assert_eq!(tax.cents(), 400);
    }

    #[test]
    fn test_parse_accepts_plain_decimals() {
        assert_eq!(Money::parse("50", 2).unwrap().cents(), 5000);
        assert_eq!(Money::parse("50.00", 2).unwrap().cents(), 5000);
        assert_eq!(Money::parse("0.5", 2).unwrap().cents(), 50);
        assert_eq!(Money::parse("0", 2).unwrap().cents(), 0);
        assert_eq!(Money::parse("  12.34\n", 2).unwrap().cents(), 1234);
    }

    #[test]
    fn test_parse_rounds_to_minor_unit() {
        assert_eq!(Money::parse("0.005", 2).unwrap().cents(), 1);
        assert_eq!(Money::parse("0.004", 2).unwrap().cents(), 0);
        assert_eq!(Money::parse("99.5", 0).unwrap().cents(), 100);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "   ", "abc", "12,50", "$5", "NaN", "inf", "-0.01", "-3"] {
            let err = Money::parse(bad, 2).unwrap_err();
            assert!(
                matches!(err, EngineError::InvalidTender { .. }),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_decimal_string_for_zero_decimal_currency() {
        assert_eq!(Money::from_cents(1500).to_decimal_string(0), "1500");
        assert_eq!(Money::from_cents(-7).to_decimal_string(2), "-0.07");
    }
}
