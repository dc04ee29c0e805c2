use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Display currency. Every price in the shop is in Sri Lankan rupees.
pub const CURRENCY_LABEL: &str = "LKR";

/// An amount of money in cents.
///
/// The backend sends prices either as JSON numbers or as decimal strings
/// (`"1500.00"`); both decode into the same integer so arithmetic downstream
/// never deals with floats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: u64) -> Self {
        Money(cents)
    }

    /// Whole rupees. Saturates at the largest representable amount.
    pub const fn from_major(units: u64) -> Self {
        Money(units.saturating_mul(100))
    }

    /// Whole rupees, or `None` if the amount does not fit.
    pub const fn checked_from_major(units: u64) -> Option<Self> {
        match units.checked_mul(100) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    pub const fn cents(self) -> u64 {
        self.0
    }

    pub fn saturating_sub(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0))
    }

    pub fn times(self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(quantity as u64))
    }

    /// Parse a non-negative decimal amount, rounding to the nearest cent.
    pub fn parse_decimal(raw: &str) -> Option<Money> {
        let value: f64 = raw.trim().parse().ok()?;
        Money::from_f64(value)
    }

    fn from_f64(value: f64) -> Option<Money> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let cents = (value * 100.0).round();
        // u64::MAX as f64 rounds up to 2^64, which is already out of range.
        if cents >= u64::MAX as f64 {
            return None;
        }
        Some(Money(cents as u64))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CURRENCY_LABEL} {}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0 as f64 / 100.0)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl Visitor<'_> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative amount as a number or decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        Money::checked_from_major(v).ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        let units = u64::try_from(v).map_err(|_| E::custom(format!("negative amount: {v}")))?;
        self.visit_u64(units)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Money::from_f64(v).ok_or_else(|| E::custom(format!("invalid or out of range amount: {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        Money::parse_decimal(v)
            .ok_or_else(|| E::custom(format!("invalid or out of range amount: {v:?}")))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::ZERO)
    }
}
