use storefront_common::CurrencyCode;
use thiserror::Error;

use crate::traits::RateTable;

#[derive(Debug, Clone, Error)]
pub enum RateSourceError {
    #[error("The rate source could not be reached. {0}")]
    Unreachable(String),
    #[error("The rate source reported an unsuccessful result: {0}")]
    Unsuccessful(String),
    #[error("The rate source returned data that could not be understood. {0}")]
    InvalidResponse(String),
}

#[allow(async_fn_in_trait)]
pub trait RateSource {
    /// Fetch the latest rates for converting one unit of `base` into every currency the source knows about.
    async fn fetch_rates(&self, base: &CurrencyCode) -> Result<RateTable, RateSourceError>;
}
