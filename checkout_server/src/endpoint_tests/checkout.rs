use std::sync::Arc;

use actix_web::{http::StatusCode, test::TestRequest, web};
use checkout_engine::{
    processor_types::{ProcessorPrice, ProcessorSession, SessionLine},
    test_utils::prepare_env::prepare_test_db,
    traits::{PriceMappings, ProcessorError, RateSourceError},
    CheckoutUrls,
    RateCache,
    RateResolver,
    RateTable,
    SessionBuilder,
    SqliteDatabase,
    SystemClock,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use storefront_common::{CurrencyCode, MinorUnits};

use super::{
    helpers::{seed_product, send_request},
    mocks::{MockProcessor, MockRateFeed},
};
use crate::routes::{CheckoutRoute, CurrenciesRoute};

type TestBuilder = SessionBuilder<SqliteDatabase, MockProcessor, MockRateFeed>;

fn resolver(feed: MockRateFeed) -> Arc<RateResolver<MockRateFeed>> {
    Arc::new(RateResolver::new(feed, RateCache::default(), Arc::new(SystemClock)))
}

fn builder(db: SqliteDatabase, processor: MockProcessor, feed: MockRateFeed) -> TestBuilder {
    SessionBuilder::new(db, processor, resolver(feed), CheckoutUrls::for_site("https://shop.test"))
}

async fn post_checkout(builder: TestBuilder, body: Value) -> (StatusCode, Value) {
    let req = TestRequest::post().uri("/api/checkout").set_json(body);
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(builder))
            .service(web::scope("/api").service(CheckoutRoute::<SqliteDatabase, MockProcessor, MockRateFeed>::new()));
    })
    .await;
    let body = serde_json::from_str(&body).unwrap_or(Value::String(body));
    (status, body)
}

#[actix_web::test]
async fn checkout_in_base_currency() {
    let _ = env_logger::try_init().ok();
    let db = prepare_test_db().await;
    let scarf_id = seed_product(&db, "scarf-1", 1500, Some(10)).await;
    let mut processor = MockProcessor::new();
    processor
        .expect_create_price()
        .withf(|p| {
            p.product_name == "Handmade scarf-1" && p.unit_amount == MinorUnits::from(1500) && p.currency.is_base()
        })
        .times(1)
        .returning(|_| Ok(ProcessorPrice { id: "price_1".into() }));
    processor
        .expect_create_checkout_session()
        .withf(|s| {
            s.lines == vec![SessionLine { processor_price_id: "price_1".into(), quantity: 2 }] &&
                s.metadata.get("item_count").map(String::as_str) == Some("2") &&
                s.success_url == "https://shop.test/checkout/success?session_id={CHECKOUT_SESSION_ID}"
        })
        .times(1)
        .returning(|_| Ok(ProcessorSession { id: "cs_1".into(), redirect_url: "https://checkout.test/cs_1".into() }));
    let mut feed = MockRateFeed::new();
    feed.expect_fetch_rates().never();
    let body = json!({ "items": [{ "productRef": "scarf-1", "quantity": 2 }] });
    let (status, body) = post_checkout(builder(db.clone(), processor, feed), body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "sessionId": "cs_1", "redirectUrl": "https://checkout.test/cs_1" }));
    let mapping = db.fetch_mapping(&scarf_id, &CurrencyCode::base()).await.unwrap().expect("Mapping was not saved");
    assert_eq!(mapping.processor_price_id, "price_1");
}

#[actix_web::test]
async fn unknown_product_is_not_found() {
    let _ = env_logger::try_init().ok();
    let db = prepare_test_db().await;
    let mut processor = MockProcessor::new();
    processor.expect_create_price().never();
    processor.expect_create_checkout_session().never();
    let body = json!({ "items": [{ "productRef": "teapot-9", "quantity": 1 }] });
    let (status, body) = post_checkout(builder(db, processor, MockRateFeed::new()), body).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "not_found", "message": "Product 'teapot-9' was not found." }));
}

#[actix_web::test]
async fn insufficient_stock_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let db = prepare_test_db().await;
    seed_product(&db, "scarf-1", 1500, Some(5)).await;
    let mut processor = MockProcessor::new();
    processor.expect_create_price().never();
    processor.expect_create_checkout_session().never();
    let body = json!({ "items": [{ "productRef": "scarf-1", "quantity": 10 }] });
    let (status, body) = post_checkout(builder(db, processor, MockRateFeed::new()), body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "unavailable");
    assert!(body["message"].as_str().unwrap().contains("scarf-1"));
}

#[actix_web::test]
async fn unsupported_currency_lists_alternatives() {
    let _ = env_logger::try_init().ok();
    let db = prepare_test_db().await;
    seed_product(&db, "scarf-1", 1500, None).await;
    let mut processor = MockProcessor::new();
    processor.expect_create_price().never();
    processor.expect_create_checkout_session().never();
    let mut feed = MockRateFeed::new();
    feed.expect_fetch_rates()
        .times(1)
        .returning(|base| Ok(RateTable::new(base).with_rate("JPY", Decimal::new(1915, 1))));
    let body = json!({ "items": [{ "productRef": "scarf-1", "quantity": 1 }], "currency": "zzz" });
    let (status, body) = post_checkout(builder(db, processor, feed), body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "unsupported_currency");
    assert_eq!(body["supportedCurrencies"], json!(["EUR", "GBP", "JPY", "USD"]));
}

#[actix_web::test]
async fn invalid_currency_is_a_validation_error() {
    let _ = env_logger::try_init().ok();
    let db = prepare_test_db().await;
    let body = json!({ "items": [{ "productRef": "scarf-1", "quantity": 1 }], "currency": "pounds" });
    let (status, body) = post_checkout(builder(db, MockProcessor::new(), MockRateFeed::new()), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(body.get("supportedCurrencies").is_none());
}

#[actix_web::test]
async fn processor_rejection_only_shows_public_message() {
    let _ = env_logger::try_init().ok();
    let db = prepare_test_db().await;
    seed_product(&db, "scarf-1", 1500, None).await;
    let mut processor = MockProcessor::new();
    processor.expect_create_price().returning(|_| Ok(ProcessorPrice { id: "price_1".into() }));
    processor.expect_create_checkout_session().returning(|_| {
        Err(ProcessorError::Rejected {
            message: "Your account cannot currently make live charges.".into(),
            diagnostics: "403 account_invalid req_123".into(),
        })
    });
    let body = json!({ "items": [{ "productRef": "scarf-1", "quantity": 1 }] });
    let (status, body) = post_checkout(builder(db, processor, MockRateFeed::new()), body).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "processor_error");
    assert_eq!(body["message"], "Your account cannot currently make live charges.");
    assert!(!body.to_string().contains("req_123"));
}

#[actix_web::test]
async fn malformed_body_is_rejected() {
    let _ = env_logger::try_init().ok();
    let db = prepare_test_db().await;
    let builder = builder(db, MockProcessor::new(), MockRateFeed::new());
    let req = TestRequest::post()
        .uri("/api/checkout")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{ \"items\": [");
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::new(builder))
            .service(web::scope("/api").service(CheckoutRoute::<SqliteDatabase, MockProcessor, MockRateFeed>::new()));
    })
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("validation_error"));
}

#[actix_web::test]
async fn currencies_include_live_and_fallback_rates() {
    let _ = env_logger::try_init().ok();
    let mut feed = MockRateFeed::new();
    feed.expect_fetch_rates().times(1).returning(|base| {
        Ok(RateTable::new(base).with_rate("CAD", Decimal::new(173, 2)).with_rate("XXX", Decimal::ZERO))
    });
    let rates = resolver(feed);
    let req = TestRequest::get().uri("/api/currencies");
    let (status, body) = send_request(req, move |cfg| {
        cfg.app_data(web::Data::from(rates))
            .service(web::scope("/api").service(CurrenciesRoute::<MockRateFeed>::new()));
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body, json!({ "base": "GBP", "currencies": ["CAD", "EUR", "GBP", "USD"] }));
}

#[actix_web::test]
async fn rate_feed_outage_still_allows_fallback_currencies() {
    let _ = env_logger::try_init().ok();
    let db = prepare_test_db().await;
    seed_product(&db, "scarf-1", 1000, None).await;
    let mut processor = MockProcessor::new();
    processor
        .expect_create_price()
        .withf(|p| p.unit_amount == MinorUnits::from(1270) && p.currency.as_str() == "USD")
        .times(1)
        .returning(|_| Ok(ProcessorPrice { id: "price_usd".into() }));
    processor
        .expect_create_checkout_session()
        .returning(|_| Ok(ProcessorSession { id: "cs_2".into(), redirect_url: "https://checkout.test/cs_2".into() }));
    let mut feed = MockRateFeed::new();
    feed.expect_fetch_rates().returning(|_| Err(RateSourceError::Unreachable("connection refused".into())));
    let body = json!({ "items": [{ "productRef": "scarf-1", "quantity": 1 }], "currency": "usd" });
    let (status, body) = post_checkout(builder(db, processor, feed), body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionId"], "cs_2");
}
