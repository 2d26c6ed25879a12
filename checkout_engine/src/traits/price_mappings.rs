use storefront_common::CurrencyCode;
use thiserror::Error;

use crate::db_types::{NewPriceMapping, PriceMapping};

#[derive(Debug, Clone, Error)]
pub enum PriceMappingError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for PriceMappingError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait PriceMappings {
    async fn fetch_mapping(
        &self,
        product_id: &str,
        currency: &CurrencyCode,
    ) -> Result<Option<PriceMapping>, PriceMappingError>;

    /// Store a new mapping, unless one already exists for the same `(product_id, currency)` pair, in which case the
    /// new one is discarded.
    ///
    /// Either way, the mapping that ends up in storage is returned, so callers must use *its* processor price id.
    async fn upsert_mapping(&self, mapping: NewPriceMapping) -> Result<PriceMapping, PriceMappingError>;
}
