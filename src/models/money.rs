//! Monetary amounts held as integer minor units.

use std::iter::Sum;
use std::ops::Add;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Largest accepted amount in minor units (9,999,999,999.99).
pub const MAX_CENTS: i64 = 999_999_999_999;

/// A monetary amount in cents.
///
/// Serialized as a decimal JSON number (`12.5`), stored as an integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_cents(cents: i64) -> Self {
        Amount(cents)
    }

    /// Convert a decimal value, rounding to the nearest cent.
    ///
    /// Returns `None` for non-finite values or magnitudes above [`MAX_CENTS`].
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let cents = (value * 100.0).round();
        if cents.abs() > MAX_CENTS as f64 {
            return None;
        }
        Some(Amount(cents as i64))
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Amount::from_decimal(value)
            .ok_or_else(|| de::Error::custom("amount must be a finite number within range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_conversion_rounds_to_cents() {
        assert_eq!(Amount::from_decimal(12.5), Some(Amount::from_cents(1250)));
        assert_eq!(Amount::from_decimal(0.1 + 0.2), Some(Amount::from_cents(30)));
        assert_eq!(Amount::from_decimal(f64::NAN), None);
        assert_eq!(Amount::from_decimal(1e13), None);
    }

    #[test]
    fn test_json_number_shape() {
        let amount: Amount = serde_json::from_str("40.25").unwrap();
        assert_eq!(amount.cents(), 4025);
        assert_eq!(serde_json::to_string(&amount).unwrap(), "40.25");
        assert_eq!(serde_json::to_string(&Amount::from_cents(4000)).unwrap(), "40.0");
    }

    #[test]
    fn test_sum_and_display() {
        let total: Amount = [4000, 4000, 4050].into_iter().map(Amount::from_cents).sum();
        assert_eq!(total.to_string(), "120.50");
    }
}
