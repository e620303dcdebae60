//! Monetary amounts in integer minor units.
//!
//! Prices arrive from the database and from rate APIs as decimals, but every
//! sum the storefront computes (subtotals, shipping, provider totals) is done
//! on whole cents. Formatting to two decimals happens only at the edges, so
//! the total shown to the shopper and the total sent to a payment provider
//! cannot drift apart.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of decimal places every supported currency uses.
const SCALE: u32 = 2;

/// Errors converting external amounts into [`Money`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// Negative amounts are never valid prices or shipping costs.
    #[error("amount cannot be negative: {0}")]
    Negative(Decimal),
    /// The amount does not fit in 64-bit minor units.
    #[error("amount out of range: {0}")]
    OutOfRange(Decimal),
    /// A textual amount could not be parsed.
    #[error("invalid amount: {0}")]
    Invalid(String),
}

/// A non-negative amount of money in minor currency units (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create an amount from minor units.
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Minor units (cents).
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Convert a decimal amount, rounding half away from zero to cents.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] for negative input and
    /// [`MoneyError::OutOfRange`] if it does not fit in `i64` cents.
    pub fn from_decimal(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }
        let cents = amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
            * Decimal::ONE_HUNDRED;
        cents
            .trunc()
            .to_i64()
            .map(Self)
            .ok_or(MoneyError::OutOfRange(amount))
    }

    /// Parse a textual amount such as `"25.99"`.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Invalid`] if the string is not a decimal number.
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        let amount: Decimal = s
            .trim()
            .parse()
            .map_err(|_| MoneyError::Invalid(s.to_string()))?;
        Self::from_decimal(amount)
    }

    /// The amount as a decimal with exactly two places.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, SCALE)
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Multiply a unit price by a quantity, saturating at `i64::MAX` cents.
    #[must_use]
    pub const fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as i64))
    }
}

impl fmt::Display for Money {
    /// Always renders two decimals, e.g. `25.99` or `10.00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::from_decimal(amount).map_err(serde::de::Error::custom)
    }
}

/// ISO 4217 currency codes accepted by the payment providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    BRL,
    USD,
    EUR,
}

impl CurrencyCode {
    /// Three-letter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::BRL => "BRL",
            Self::USD => "USD",
            Self::EUR => "EUR",
        }
    }

    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::BRL => "R$",
            Self::USD => "$",
            Self::EUR => "€",
        }
    }

    /// Parse a code case-insensitively.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "BRL" => Some(Self::BRL),
            "USD" => Some(Self::USD),
            "EUR" => Some(Self::EUR),
            _ => None,
        }
    }

    /// Format an amount for display, e.g. `R$ 25.99`.
    #[must_use]
    pub fn display(self, amount: Money) -> String {
        format!("{} {amount}", self.symbol())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_decimal_rounds_half_away_from_zero() {
        let d: Decimal = "10.005".parse().unwrap();
        assert_eq!(Money::from_decimal(d).unwrap().minor(), 1001);
        let d: Decimal = "5.99".parse().unwrap();
        assert_eq!(Money::from_decimal(d).unwrap().minor(), 599);
    }

    #[test]
    fn test_from_decimal_rejects_negative() {
        let d: Decimal = "-1.00".parse().unwrap();
        assert!(matches!(
            Money::from_decimal(d),
            Err(MoneyError::Negative(_))
        ));
    }

    #[test]
    fn test_display_always_two_decimals() {
        assert_eq!(Money::from_minor(1000).to_string(), "10.00");
        assert_eq!(Money::from_minor(2599).to_string(), "25.99");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_sum_has_no_float_drift() {
        // 0.1 + 0.2 in floating point is 0.30000000000000004
        let total: Money = [Money::parse("0.10").unwrap(), Money::parse("0.20").unwrap()]
            .into_iter()
            .sum();
        assert_eq!(total.to_string(), "0.30");
    }

    #[test]
    fn test_times() {
        assert_eq!(Money::from_minor(1000).times(2), Money::from_minor(2000));
    }

    #[test]
    fn test_arithmetic_saturates_instead_of_overflowing() {
        let max = Money::from_minor(i64::MAX);
        assert_eq!(max.times(u32::MAX), max);
        assert_eq!(max + Money::from_minor(1), max);

        let mut total = max;
        total += max;
        assert_eq!(total, max);

        let sum: Money = [max, max, max].into_iter().sum();
        assert_eq!(sum, max);
    }

    #[test]
    fn test_to_decimal_keeps_two_places() {
        assert_eq!(Money::from_minor(1000).to_decimal().to_string(), "10.00");
        assert_eq!(Money::from_minor(5).to_decimal().scale(), 2);
    }

    #[test]
    fn test_serde_as_decimal_string() {
        let json = serde_json::to_string(&Money::from_minor(2599)).unwrap();
        assert_eq!(json, "\"25.99\"");
        let from_number: Money = serde_json::from_str("25.99").unwrap();
        assert_eq!(from_number.minor(), 2599);
        let from_string: Money = serde_json::from_str("\"399.00\"").unwrap();
        assert_eq!(from_string.minor(), 39900);
    }

    #[test]
    fn test_currency_display() {
        assert_eq!(CurrencyCode::BRL.display(Money::from_minor(2599)), "R$ 25.99");
        assert_eq!(CurrencyCode::from_code("usd"), Some(CurrencyCode::USD));
        assert_eq!(CurrencyCode::from_code("XYZ"), None);
    }
}
