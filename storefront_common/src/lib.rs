mod currency;
mod minor_units;

pub mod helpers;
pub mod op;
mod secret;

pub use currency::{CurrencyCode, CurrencyCodeError, BASE_CURRENCY, ZERO_DECIMAL_CURRENCIES};
pub use minor_units::MinorUnits;
pub use secret::Secret;
