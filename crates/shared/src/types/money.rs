//! Money type stored in integer minor units.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are summed as `i64` cents; `rust_decimal::Decimal` is only used
//! at the boundary (parsing, serialization, display).

use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of decimal places in the currency's minor unit.
pub const MINOR_UNIT_SCALE: u32 = 2;

/// Minor units per major unit (100 cents per dollar).
const MINOR_PER_MAJOR: i64 = 100;

/// Errors raised when converting a decimal into [`Money`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// The value carries more precision than the minor unit allows.
    #[error("Amount {0} has more than 2 decimal places")]
    TooPrecise(Decimal),

    /// The value does not fit in the minor-unit range.
    #[error("Amount {0} is out of range")]
    OutOfRange(Decimal),
}

/// A monetary amount in the group's single currency.
///
/// Stored as a signed count of minor units (cents) so that sums are exact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// One minor unit (one cent).
    pub const ONE_CENT: Self = Self(1);

    /// Creates an amount from a count of minor units.
    #[must_use]
    pub const fn from_minor(minor_units: i64) -> Self {
        Self(minor_units)
    }

    /// Returns the amount as a count of minor units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// Converts a decimal into money, rejecting sub-cent precision.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::TooPrecise`] if the value has more than two
    /// significant decimal places, or [`MoneyError::OutOfRange`] if it
    /// overflows the minor-unit range.
    pub fn from_decimal(value: Decimal) -> Result<Self, MoneyError> {
        if value.normalize().scale() > MINOR_UNIT_SCALE {
            return Err(MoneyError::TooPrecise(value));
        }

        value
            .checked_mul(Decimal::from(MINOR_PER_MAJOR))
            .and_then(|scaled| scaled.to_i64())
            .map(Self)
            .ok_or(MoneyError::OutOfRange(value))
    }

    /// Converts a decimal into money, rounding half-up to the minor unit.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::OutOfRange`] if the rounded value overflows.
    pub fn from_decimal_rounded(value: Decimal) -> Result<Self, MoneyError> {
        Self::from_decimal(
            value.round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Returns the amount as a decimal with exactly two decimal places.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, MINOR_UNIT_SCALE)
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the amount is strictly positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns true if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Adds two amounts, returning `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Adds two amounts.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::OutOfRange`] carrying the exact sum if it does
    /// not fit in the minor-unit range.
    pub fn try_add(self, rhs: Self) -> Result<Self, MoneyError> {
        self.checked_add(rhs)
            .ok_or_else(|| MoneyError::OutOfRange(self.to_decimal() + rhs.to_decimal()))
    }

    /// Sums amounts without overflowing.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::OutOfRange`] as soon as a partial sum overflows.
    pub fn try_sum<I: IntoIterator<Item = Self>>(amounts: I) -> Result<Self, MoneyError> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.try_add(amount))
    }
}

// The operators below follow `i64` semantics and are meant for amounts
// already known to be in range. Totals over external input go through
// `try_add` and `try_sum`.

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl std::str::FromStr for Money {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            Decimal::from_str_exact(s.trim()).map_err(|e| format!("Invalid amount {s}: {e}"))?;
        Self::from_decimal(value).map_err(|e| e.to_string())
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::from_decimal(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.to_decimal()
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::from_decimal(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "money_tests.rs"]
mod tests;
