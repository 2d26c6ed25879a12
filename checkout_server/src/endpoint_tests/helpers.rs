use actix_web::{http::StatusCode, test, web::ServiceConfig, App};
use checkout_engine::{db_types::NewProduct, SqliteDatabase};
use rust_decimal::Decimal;

use crate::routes::json_config;

/// Sends `req` to an app set up by `configure` and returns the status and body of the response.
pub async fn send_request<F>(req: test::TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().app_data(json_config()).configure(configure);
    let service = test::init_service(app).await;
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

/// Adds a product priced in the base currency, e.g. `seed_product(&db, "scarf-1", 1500, Some(10))` for 15.00.
pub async fn seed_product(db: &SqliteDatabase, slug: &str, price_minor: i64, stock: Option<i64>) -> String {
    let mut product = NewProduct::new(slug, format!("Handmade {slug}"), Decimal::new(price_minor, 2));
    if let Some(stock) = stock {
        product = product.with_stock(stock);
    }
    db.insert_product(product).await.expect("Could not seed product").id
}
