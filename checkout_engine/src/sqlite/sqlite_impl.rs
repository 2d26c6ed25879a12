//! `SqliteDatabase` is the concrete storage backend of the checkout engine.
//!
//! Unsurprisingly, it uses SQLite and implements the storage traits defined in the [`crate::traits`] module.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;
use storefront_common::CurrencyCode;

use super::db::{db_url, new_pool, orders, price_mappings, products};
use crate::{
    db_types::{NewOrder, NewOrderItem, NewPriceMapping, NewProduct, Order, OrderItem, PriceMapping, Product},
    traits::{
        Catalog,
        CatalogError,
        InsertOrderResult,
        OrderStore,
        OrderStoreError,
        PriceMappingError,
        PriceMappings,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl Catalog for SqliteDatabase {
    async fn fetch_product(&self, product_ref: &str) -> Result<Option<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(product_ref, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_product_by_slug(&self, slug: &str) -> Result<Option<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product_by_slug(slug, &mut conn).await?;
        Ok(product)
    }

    async fn decrement_stock(&self, product_id: &str, quantity: i64) -> Result<Option<i64>, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let stock = products::decrement_stock(product_id, quantity, &mut tx).await?;
        tx.commit().await?;
        Ok(stock)
    }
}

impl PriceMappings for SqliteDatabase {
    async fn fetch_mapping(
        &self,
        product_id: &str,
        currency: &CurrencyCode,
    ) -> Result<Option<PriceMapping>, PriceMappingError> {
        let mut conn = self.pool.acquire().await?;
        let mapping = price_mappings::fetch_mapping(product_id, currency, &mut conn).await?;
        Ok(mapping)
    }

    async fn upsert_mapping(&self, mapping: NewPriceMapping) -> Result<PriceMapping, PriceMappingError> {
        let mut tx = self.pool.begin().await?;
        let mapping = price_mappings::upsert_mapping(mapping, &mut tx).await?;
        tx.commit().await?;
        Ok(mapping)
    }
}

impl OrderStore for SqliteDatabase {
    async fn fetch_order_by_session_id(&self, session_id: &str) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_session_id(session_id, &mut conn).await?;
        Ok(order)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::insert_order(order, &mut tx).await?;
        // Duplicates and drift leave nothing to keep, so the transaction is simply rolled back on drop
        if matches!(result, InsertOrderResult::Inserted(_)) {
            tx.commit().await?;
        }
        Ok(result)
    }

    async fn insert_order_items(
        &self,
        order_id: i64,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let items = orders::insert_order_items(order_id, items, &mut tx).await?;
        tx.commit().await?;
        Ok(items)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn attach_notification_receipt(&self, order_id: i64, receipt: &str) -> Result<Order, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::attach_notification_receipt(order_id, receipt, &mut tx)
            .await?
            .ok_or(OrderStoreError::OrderNotFound(order_id))?;
        tx.commit().await?;
        Ok(order)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        super::MIGRATOR.run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    /// Adds a product to the catalog.
    pub async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let mut tx = self.pool.begin().await?;
        let product = products::insert_product(product, &mut tx).await?;
        tx.commit().await?;
        Ok(product)
    }

    pub async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?;
        Ok(order)
    }
}
