use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::Type;
use thiserror::Error;

/// The currency in which catalog prices are authoritatively stored.
pub const BASE_CURRENCY: &str = "GBP";

/// Currencies whose minor unit is the major unit. This is a static table, never inferred.
pub const ZERO_DECIMAL_CURRENCIES: [&str; 16] = [
    "BIF", "CLP", "DJF", "GNF", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "UGX", "VND", "VUV", "XAF", "XOF", "XPF",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a valid 3-letter ISO currency code")]
pub struct CurrencyCodeError(pub String);

//--------------------------------------    CurrencyCode      ---------------------------------------------------------
/// An upper-case, three-letter ISO 4217 currency code.
///
/// The only way to build one is through [`FromStr`] (or serde, which goes through the same path), so holding a
/// `CurrencyCode` means the value has been normalised and validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn base() -> Self {
        Self(BASE_CURRENCY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_base(&self) -> bool {
        self.0 == BASE_CURRENCY
    }

    pub fn is_zero_decimal(&self) -> bool {
        ZERO_DECIMAL_CURRENCIES.contains(&self.0.as_str())
    }

    /// The number of minor units in one major unit: 1 for zero-decimal currencies, 100 for everything else.
    pub fn minor_unit_factor(&self) -> i64 {
        if self.is_zero_decimal() {
            1
        } else {
            100
        }
    }

    /// Lower-case form, as the payment processor expects it on the wire.
    pub fn to_lowercase(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(Self(code))
        } else {
            Err(CurrencyCodeError(s.to_string()))
        }
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl<'de> Deserialize<'de> for CurrencyCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalises_codes() {
        assert_eq!(" usd ".parse::<CurrencyCode>().unwrap().as_str(), "USD");
        assert_eq!("Eur".parse::<CurrencyCode>().unwrap().as_str(), "EUR");
        assert!("US".parse::<CurrencyCode>().is_err());
        assert!("USDT".parse::<CurrencyCode>().is_err());
        assert!("U$D".parse::<CurrencyCode>().is_err());
        assert!("".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn minor_unit_factors() {
        assert_eq!(CurrencyCode::base().minor_unit_factor(), 100);
        assert_eq!("jpy".parse::<CurrencyCode>().unwrap().minor_unit_factor(), 1);
        assert_eq!("KRW".parse::<CurrencyCode>().unwrap().minor_unit_factor(), 1);
        assert_eq!("VND".parse::<CurrencyCode>().unwrap().minor_unit_factor(), 1);
        assert_eq!("usd".parse::<CurrencyCode>().unwrap().minor_unit_factor(), 100);
    }

    #[test]
    fn base_currency() {
        assert!(CurrencyCode::base().is_base());
        assert!("gbp".parse::<CurrencyCode>().unwrap().is_base());
        assert!(!"EUR".parse::<CurrencyCode>().unwrap().is_base());
    }
}
