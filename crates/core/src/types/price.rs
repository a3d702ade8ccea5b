//! Money amounts using decimal arithmetic.
//!
//! The backend exchanges prices as plain decimal numbers in a single store
//! currency. [`Price`] keeps them as [`Decimal`] so sums and percentages never
//! pick up floating point noise, and renders them with two decimals.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Symbol prefixed to every displayed amount.
pub const CURRENCY_SYMBOL: &str = "$";

/// A non-negative money amount in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price, clamping negative amounts to zero.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        Self(amount.max(Decimal::ZERO))
    }

    /// Create a price from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self::new(Decimal::new(cents, 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Unit price times a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Subtraction that stops at zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        Self::new(self.0 - other.0)
    }

    /// The amount rounded half-up to cents.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self(self.0.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CURRENCY_SYMBOL}{:.2}", self.rounded().0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn price(s: &str) -> Price {
        Price::new(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(price("12.5").to_string(), "$12.50");
        assert_eq!(price("0").to_string(), "$0.00");
        assert_eq!(price("3.005").to_string(), "$3.01");
    }

    #[test]
    fn test_negative_clamps_to_zero() {
        assert_eq!(price("-4"), Price::ZERO);
        assert_eq!(price("5").saturating_sub(price("7")), Price::ZERO);
    }

    #[test]
    fn test_times_and_sum() {
        let total: Price = [price("2.50").times(3), price("1.25")].into_iter().sum();
        assert_eq!(total, price("8.75"));
    }

    #[test]
    fn test_deserializes_from_json_number() {
        let parsed: Price = serde_json::from_str("19.99").unwrap();
        assert_eq!(parsed, Price::from_cents(1999));
    }
}
