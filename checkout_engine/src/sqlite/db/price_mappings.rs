use log::debug;
use sqlx::SqliteConnection;
use storefront_common::CurrencyCode;

use crate::db_types::{NewPriceMapping, PriceMapping};

pub async fn fetch_mapping(
    product_id: &str,
    currency: &CurrencyCode,
    conn: &mut SqliteConnection,
) -> Result<Option<PriceMapping>, sqlx::Error> {
    let mapping = sqlx::query_as("SELECT * FROM price_mappings WHERE product_id = $1 AND currency = $2")
        .bind(product_id)
        .bind(currency.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(mapping)
}

/// Inserts the mapping unless one already exists for the same product and currency, then returns whichever row is
/// stored. This is not atomic on its own; the unique index on `(product_id, currency)` guarantees a single winner.
pub async fn upsert_mapping(
    mapping: NewPriceMapping,
    conn: &mut SqliteConnection,
) -> Result<PriceMapping, sqlx::Error> {
    let result = sqlx::query(
        r#"
            INSERT INTO price_mappings (product_id, currency, processor_price_id, unit_amount)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (product_id, currency) DO NOTHING;
        "#,
    )
    .bind(&mapping.product_id)
    .bind(mapping.currency.as_str())
    .bind(&mapping.processor_price_id)
    .bind(mapping.unit_amount)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        debug!(
            "🗃️ A price mapping for {} in {} already exists. Discarding {}",
            mapping.product_id, mapping.currency, mapping.processor_price_id
        );
    }
    let stored = sqlx::query_as("SELECT * FROM price_mappings WHERE product_id = $1 AND currency = $2")
        .bind(&mapping.product_id)
        .bind(mapping.currency.as_str())
        .fetch_one(conn)
        .await?;
    Ok(stored)
}
