//! # Money
//!
//! Amounts are whole cents in an `i64`. Nothing in the order path touches
//! floating point, so an order total is always exactly the sum of its lines
//! and the amount sent to the gateway is exactly the stored total.
//!
//! ```text
//!   catalog "19.99" ──► Money::parse ──► Money(1999)
//!                          │
//!                          └─ rounded to 2 places, midpoint away from zero,
//!                             then scaled ×100 (exact after rounding)
//!
//!   Money(1999) × 2 ──► Money(3998) ──► Σ lines ──► Order.total_cents
//!                                                        │
//!                                                        ▼
//!                                          gateway amount (minor units)
//! ```
//!
//! ```rust
//! use storefront_core::money::Money;
//!
//! let line = Money::parse("19.99").unwrap().multiply_quantity(2).unwrap();
//! assert_eq!(line.cents(), 3998);
//! assert_eq!(line.to_string(), "$39.98");
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// An amount in cents. Serialized as the bare integer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Integer amount in the currency's minor unit, as the gateway expects.
    ///
    /// Equal to [`Money::cents`] for the two-decimal currencies this store
    /// sells in.
    #[inline]
    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Rounds `amount` to cents.
    ///
    /// ```rust
    /// use rust_decimal::Decimal;
    /// use storefront_core::money::Money;
    ///
    /// // 19.995 rounds up
    /// assert_eq!(Money::from_decimal(Decimal::new(19995, 3)).unwrap().cents(), 2000);
    /// ```
    pub fn from_decimal(amount: Decimal) -> Result<Self, ValidationError> {
        let cents = (amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            * Decimal::ONE_HUNDRED)
            .trunc();

        match cents.to_i64() {
            Some(c) => Ok(Money(c)),
            None => Err(ValidationError::InvalidFormat {
                field: "amount".to_string(),
                reason: format!("{} is out of range", amount),
            }),
        }
    }

    /// Parses a decimal string such as `"19.99"`. Surrounding whitespace is
    /// ignored.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        Decimal::from_str(input.trim())
            .map_err(|e| ValidationError::InvalidFormat {
                field: "amount".to_string(),
                reason: e.to_string(),
            })
            .and_then(Money::from_decimal)
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// `None` on overflow.
    #[inline]
    pub fn multiply_quantity(&self, qty: i64) -> Option<Self> {
        self.0.checked_mul(qty).map(Money)
    }

    /// `None` on overflow.
    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        if self.0 < 0 {
            f.write_str("-")?;
        }
        write!(f, "${}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "$10.99");
        assert_eq!(Money::from_cents(500).to_string(), "$5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
        assert_eq!(Money::from_cents(-5).to_string(), "-$0.05");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_parse() {
        assert_eq!(Money::parse("19.99").unwrap().cents(), 1999);
        assert_eq!(Money::parse("5").unwrap().cents(), 500);
        assert_eq!(" 12.5 ".parse::<Money>().unwrap().cents(), 1250);
        assert!(Money::parse("abc").is_err());
        assert!(Money::parse("").is_err());
    }

    #[test]
    fn test_parse_rounding() {
        assert_eq!(Money::parse("19.995").unwrap().cents(), 2000);
        assert_eq!(Money::parse("19.994").unwrap().cents(), 1999);
        assert_eq!(Money::parse("-0.005").unwrap().cents(), -1);
    }

    #[test]
    fn test_to_decimal_is_exact() {
        let m = Money::from_cents(3998);
        assert_eq!(m.to_decimal().to_string(), "39.98");
        assert_eq!(Money::from_decimal(m.to_decimal()).unwrap(), m);
        assert_eq!(m.minor_units(), 3998);
    }

    #[test]
    fn test_overflow_is_reported() {
        assert_eq!(
            Money::from_cents(1999).multiply_quantity(2),
            Some(Money::from_cents(3998))
        );
        assert!(Money::from_cents(i64::MAX).multiply_quantity(2).is_none());
        assert!(Money::from_cents(i64::MAX)
            .checked_add(Money::from_cents(1))
            .is_none());
    }

    #[test]
    fn test_sum() {
        let total: Money = std::iter::repeat(Money::from_cents(1999)).take(1000).sum();
        assert_eq!(total.cents(), 1_999_000);
        assert!(std::iter::empty::<Money>().sum::<Money>().is_zero());
    }
}
