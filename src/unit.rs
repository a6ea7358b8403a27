//! Money and quantity units
//!
//! Amounts are carried as integers in their smallest unit. Anything that needs
//! fractional math goes through `rust_decimal` and is rounded exactly once,
//! half away from zero, when it is converted back into an integer unit.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PricingError;

/// Whole cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(pub i64);

impl Cents {
    pub fn to_decimal(self) -> Decimal {
        Decimal::from(self.0)
    }

    /// Converts an exact millicent amount to cents, rounding half-up.
    pub fn from_millicents(amount: Decimal) -> Result<Self, PricingError> {
        round_to_i64(amount / Decimal::from(1000)).map(Self)
    }

    pub fn to_dollar_string(self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dollar_string())
    }
}

/// Thousandths of a cent, used for applied rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Millicents(pub i64);

impl Millicents {
    pub fn to_decimal(self) -> Decimal {
        Decimal::from(self.0)
    }

    pub fn from_decimal(amount: Decimal) -> Result<Self, PricingError> {
        round_to_i64(amount).map(Self)
    }
}

impl fmt::Display for Millicents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}mc", self.0)
    }
}

/// Weight in pounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pound(pub i64);

impl Pound {
    /// Hundredweight, kept fractional
    pub fn to_cwt(self) -> Decimal {
        Decimal::new(self.0, 2)
    }
}

impl fmt::Display for Pound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lbs", self.0)
    }
}

/// Entered quantity in ten-thousandths of a unit, so "47.4" cu ft is 474000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseQuantity(pub i64);

impl BaseQuantity {
    pub const ZERO: BaseQuantity = BaseQuantity(0);

    pub fn from_units(units: i64) -> Self {
        Self(units * 10_000)
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 4)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// Thousandths of an inch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThousandthInches(pub i32);

/// A computed charge and the per-unit rate that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAndRate {
    pub fee: Cents,
    pub rate: Millicents,
}

/// Multiplier applied to an undiscounted charge. `1.0` leaves the charge
/// untouched, `0.45` keeps 45% of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct DiscountRate(Decimal);

impl DiscountRate {
    pub const NONE: DiscountRate = DiscountRate(Decimal::ONE);

    pub fn new(rate: Decimal) -> Result<Self, PricingError> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(PricingError::validation(
                "discount_rate",
                format!("{rate} is outside the range [0, 1]"),
            ));
        }
        Ok(Self(rate))
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    pub fn apply(self, amount: Decimal) -> Decimal {
        amount * self.0
    }
}

impl TryFrom<Decimal> for DiscountRate {
    type Error = PricingError;

    fn try_from(rate: Decimal) -> Result<Self, Self::Error> {
        Self::new(rate)
    }
}

impl From<DiscountRate> for Decimal {
    fn from(rate: DiscountRate) -> Self {
        rate.0
    }
}

impl fmt::Display for DiscountRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn round_to_i64(amount: Decimal) -> Result<i64, PricingError> {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| PricingError::Arithmetic(format!("{amount} does not fit in 64 bits")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_cents_round_half_up_from_millicents() {
        assert_eq!(Cents::from_millicents(dec!(1500)).unwrap(), Cents(2));
        assert_eq!(Cents::from_millicents(dec!(1499)).unwrap(), Cents(1));
        assert_eq!(Cents::from_millicents(dec!(2500)).unwrap(), Cents(3));
        assert_eq!(Cents::from_millicents(dec!(-1500)).unwrap(), Cents(-2));
    }

    #[test]
    fn test_dollar_string() {
        assert_eq!(Cents(129999).to_dollar_string(), "$1299.99");
        assert_eq!(Cents(5).to_dollar_string(), "$0.05");
        assert_eq!(Cents(-250).to_dollar_string(), "-$2.50");
    }

    #[test]
    fn test_base_quantity_units() {
        assert_eq!(BaseQuantity::from_units(3).0, 30_000);
        assert_eq!(BaseQuantity(474_000).to_decimal(), dec!(47.4));
    }

    #[test]
    fn test_pound_to_cwt() {
        assert_eq!(Pound(3000).to_cwt(), dec!(30));
        assert_eq!(Pound(1234).to_cwt(), dec!(12.34));
    }

    #[test]
    fn test_discount_rate_bounds() {
        assert!(DiscountRate::new(dec!(0)).is_ok());
        assert!(DiscountRate::new(dec!(1)).is_ok());
        assert!(DiscountRate::new(dec!(0.45)).is_ok());
        assert!(DiscountRate::new(dec!(1.01)).is_err());
        assert!(DiscountRate::new(dec!(-0.1)).is_err());
    }

    #[test]
    fn test_discount_rate_deserialize_rejects_out_of_range() {
        let ok: DiscountRate = serde_json::from_str("\"0.5\"").unwrap();
        assert_eq!(ok.value(), dec!(0.5));
        assert!(serde_json::from_str::<DiscountRate>("\"1.5\"").is_err());
    }
}
