use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;

use crate::{op, CurrencyCode};

//--------------------------------------     MinorUnits       ---------------------------------------------------------
/// An integer amount in the smallest denomination of some currency (pence, cents, or yen for zero-decimal currencies).
///
/// The currency is carried alongside the amount by whoever owns the value; `MinorUnits` itself is just the count.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct MinorUnits(i64);

op!(binary MinorUnits, Add, add);
op!(inplace MinorUnits, AddAssign, add_assign);

impl Mul<i64> for MinorUnits {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for MinorUnits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl From<i64> for MinorUnits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for MinorUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl MinorUnits {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Renders the amount in major units for humans, e.g. `1250` GBP becomes `12.50 GBP` and `13` JPY becomes `13 JPY`.
    pub fn display_in(&self, currency: &CurrencyCode) -> String {
        if currency.is_zero_decimal() {
            format!("{} {currency}", self.0)
        } else {
            let sign = if self.0 < 0 { "-" } else { "" };
            let abs = self.0.unsigned_abs();
            format!("{sign}{}.{:02} {currency}", abs / 100, abs % 100)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_in_currency() {
        let gbp = CurrencyCode::base();
        let jpy: CurrencyCode = "jpy".parse().unwrap();
        assert_eq!(MinorUnits::from(1250).display_in(&gbp), "12.50 GBP");
        assert_eq!(MinorUnits::from(5).display_in(&gbp), "0.05 GBP");
        assert_eq!(MinorUnits::from(-105).display_in(&gbp), "-1.05 GBP");
        assert_eq!(MinorUnits::from(13).display_in(&jpy), "13 JPY");
    }

    #[test]
    fn arithmetic() {
        let total: MinorUnits = vec![MinorUnits::from(100), MinorUnits::from(250) * 2].into_iter().sum();
        assert_eq!(total, MinorUnits::from(600));
        let mut acc = MinorUnits::default();
        acc += MinorUnits::from(7);
        assert_eq!(acc.value(), 7);
        assert!(acc.is_positive());
    }
}
