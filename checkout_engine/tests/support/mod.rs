#![allow(dead_code)]

use checkout_engine::{
    db_types::{NewProduct, Product},
    test_utils::prepare_env::prepare_test_db,
    SqliteDatabase,
};
use rust_decimal::Decimal;

pub async fn new_db() -> SqliteDatabase {
    prepare_test_db().await
}

pub async fn seed(db: &SqliteDatabase, product: NewProduct) -> Product {
    db.insert_product(product).await.expect("Error seeding product")
}

pub async fn seed_simple(db: &SqliteDatabase, slug: &str, price: Decimal, stock: Option<i64>) -> Product {
    let mut product = NewProduct::new(slug, format!("Handmade {slug}"), price);
    product.stock_quantity = stock;
    seed(db, product).await
}

pub async fn count(db: &SqliteDatabase, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}")).fetch_one(db.pool()).await.unwrap()
}

pub async fn stock_of(db: &SqliteDatabase, product_id: &str) -> Option<i64> {
    sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(db.pool())
        .await
        .unwrap()
}
