use thiserror::Error;

use crate::db_types::Product;

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} has a corrupt catalog entry: {1}")]
    CorruptEntry(String, String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait Catalog {
    /// Look up a product by its reference, which may be either the internal product id or the product's slug.
    /// Returns `Ok(None)` if neither matches.
    async fn fetch_product(&self, product_ref: &str) -> Result<Option<Product>, CatalogError>;

    /// Look up a product by slug only.
    async fn fetch_product_by_slug(&self, slug: &str) -> Result<Option<Product>, CatalogError>;

    /// Reduce the stock count of the product by `quantity`, never going below zero.
    ///
    /// Products whose stock is not tracked are left alone. Returns the new stock level, or `None` if the product does
    /// not exist or does not track stock.
    async fn decrement_stock(&self, product_id: &str, quantity: i64) -> Result<Option<i64>, CatalogError>;
}
