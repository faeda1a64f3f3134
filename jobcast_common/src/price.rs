use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Sub},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

//--------------------------------------       Price       -----------------------------------------------------------
/// A monetary amount in integer cents. Prices on service requests are always strictly positive; the zero default
/// exists only so that sums and accumulators have a starting point.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Price(i64);

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<i64> for Price {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a price in cents: {0}")]
pub struct PriceConversionError(String);

impl From<i64> for Price {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Price {}

impl TryFrom<u64> for Price {
    type Error = PriceConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(PriceConversionError(format!("Value {} is too large to convert to Price", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let major = self.0 as f64 / 100.0;
        write!(f, "${major:0.2}")
    }
}

impl Price {
    /// The amount in cents.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Builds a price from whole currency units, e.g. `Price::from_major(150)` is $150.00.
    pub fn from_major(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic_and_ordering() {
        let a = Price::from_major(150);
        let b = Price::from(2_500);
        assert_eq!(a + b, Price::from(17_500));
        assert_eq!(a - b, Price::from(12_500));
        assert_eq!(a * 3, Price::from_major(450));
        assert!(b < a);
        assert_eq!(vec![a, b].into_iter().sum::<Price>(), Price::from(17_500));
    }

    #[test]
    fn formatting() {
        assert_eq!(Price::from(15_000).to_string(), "$150.00");
        assert_eq!(Price::from(99).to_string(), "$0.99");
    }

    #[test]
    fn positivity() {
        assert!(Price::from(1).is_positive());
        assert!(!Price::default().is_positive());
        assert!(!Price::from(-50).is_positive());
    }
}
