use std::str::FromStr;

use log::trace;
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use crate::db_types::{NewProduct, Product};

/// Prices are stored as decimal strings and images as a JSON array, so the row is decoded by hand.
impl<'r> FromRow<'r, SqliteRow> for Product {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let price = row
            .try_get::<Option<String>, _>("price")?
            .map(|p| Decimal::from_str(p.trim()))
            .transpose()
            .map_err(|e| sqlx::Error::ColumnDecode { index: "price".into(), source: Box::new(e) })?;
        let images = row.try_get::<Option<String>, _>("images")?.unwrap_or_default();
        let images = if images.trim().is_empty() {
            vec![]
        } else {
            serde_json::from_str::<Vec<String>>(&images)
                .map_err(|e| sqlx::Error::ColumnDecode { index: "images".into(), source: Box::new(e) })?
        };
        Ok(Self {
            id: row.try_get("id")?,
            slug: row.try_get("slug")?,
            name: row.try_get("name")?,
            price,
            is_available: row.try_get("is_available")?,
            stock_quantity: row.try_get("stock_quantity")?,
            images,
        })
    }
}

/// Fetches a product whose id or slug matches `product_ref`. An id match wins over a slug match.
pub async fn fetch_product(product_ref: &str, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as(
        "SELECT * FROM products WHERE id = $1 OR slug = $1 ORDER BY CASE WHEN id = $1 THEN 0 ELSE 1 END LIMIT 1",
    )
    .bind(product_ref)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}

pub async fn fetch_product_by_slug(slug: &str, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE slug = $1").bind(slug).fetch_optional(conn).await?;
    Ok(product)
}

/// Inserts a product into the catalog. Catalog management happens outside the checkout engine; this exists for seeding
/// and tests.
pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let images = serde_json::to_string(&product.images)
        .map_err(|e| sqlx::Error::Protocol(format!("Could not encode product images. {e}")))?;
    let inserted: Vec<Product> = sqlx::query_as(
        r#"
            INSERT INTO products (id, slug, name, price, is_available, stock_quantity, images)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(product.id)
    .bind(product.slug)
    .bind(product.name)
    .bind(product.price.map(|p| p.to_string()))
    .bind(product.is_available)
    .bind(product.stock_quantity)
    .bind(images)
    .fetch_all(conn)
    .await?;
    inserted.into_iter().next().ok_or(sqlx::Error::RowNotFound)
}

/// Subtracts `quantity` from the product's stock, flooring at zero. Products with no stock count are untouched.
///
/// Returns the new stock level, or `None` if no row was updated.
pub async fn decrement_stock(
    product_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, sqlx::Error> {
    let updated: Vec<i64> = sqlx::query_scalar(
        r#"
            UPDATE products
            SET stock_quantity = MAX(stock_quantity - $1, 0), updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND stock_quantity IS NOT NULL
            RETURNING stock_quantity;
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .fetch_all(conn)
    .await?;
    let stock = updated.into_iter().next();
    trace!("🗃️ Stock for product {product_id} is now {stock:?}");
    Ok(stock)
}
