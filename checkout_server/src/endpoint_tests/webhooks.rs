use std::sync::Arc;

use actix_web::{http::StatusCode, test::TestRequest, web};
use checkout_engine::{
    checkout_api::{
        line_items::{MetadataSnapshot, SnapshotEntry},
        session_builder::ITEMS_METADATA_KEY,
    },
    helpers::sign_event_payload,
    test_utils::{fakes::FakeNotifier, prepare_env::prepare_test_db},
    traits::{Catalog, OrderStore, ProcessorError},
    OrderReconciler,
    SqliteDatabase,
    SystemClock,
};
use chrono::Utc;
use serde_json::{json, Value};
use storefront_common::Secret;

use super::{
    helpers::{seed_product, send_request},
    mocks::MockProcessor,
};
use crate::{
    config::ServerOptions,
    data_objects::JsonResponse,
    routes::{StripeWebhookRoute, SIGNATURE_HEADER},
};

const WEBHOOK_SECRET: &str = "whsec_test_secret";

type TestReconciler = OrderReconciler<SqliteDatabase, MockProcessor, FakeNotifier>;

fn reconciler(db: SqliteDatabase, processor: MockProcessor, notifier: FakeNotifier) -> web::Data<TestReconciler> {
    web::Data::new(OrderReconciler::new(
        db,
        processor,
        Some(notifier),
        Secret::new(WEBHOOK_SECRET.to_string()),
        Arc::new(SystemClock),
    ))
}

fn completed_event(session_id: &str, metadata: Value) -> Vec<u8> {
    json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": session_id,
            "amount_total": 3000,
            "currency": "gbp",
            "customer_details": { "email": "ada@example.com" },
            "payment_status": "paid",
            "metadata": metadata
        }}
    })
    .to_string()
    .into_bytes()
}

fn scarf_snapshot() -> Value {
    let entries = vec![SnapshotEntry { product_ref: "scarf-1".into(), quantity: 2, unit_amount: 1500, name: None }];
    let mut metadata = serde_json::Map::new();
    metadata.insert(ITEMS_METADATA_KEY.to_string(), Value::String(MetadataSnapshot::encode(&entries).unwrap()));
    Value::Object(metadata)
}

fn signed(payload: &[u8], secret: &str) -> String {
    sign_event_payload(payload, secret, Utc::now().timestamp()).unwrap()
}

async fn deliver(
    api: web::Data<TestReconciler>,
    payload: Vec<u8>,
    signature: Option<String>,
) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri("/webhook/stripe").set_payload(payload);
    if let Some(signature) = signature {
        req = req.insert_header((SIGNATURE_HEADER, signature));
    }
    send_request(req, move |cfg| {
        cfg.app_data(api).app_data(web::Data::new(ServerOptions::default())).service(
            web::scope("/webhook").service(StripeWebhookRoute::<SqliteDatabase, MockProcessor, FakeNotifier>::new()),
        );
    })
    .await
}

fn response(body: &str) -> JsonResponse {
    serde_json::from_str(body).expect("Not a JsonResponse")
}

#[actix_web::test]
async fn completed_event_records_order() {
    let _ = env_logger::try_init().ok();
    let db = prepare_test_db().await;
    let scarf_id = seed_product(&db, "scarf-1", 1500, Some(10)).await;
    let mut processor = MockProcessor::new();
    processor.expect_list_session_line_items().never();
    let notifier = FakeNotifier::default();
    let api = reconciler(db.clone(), processor, notifier.clone());
    let payload = completed_event("sess_abc", scarf_snapshot());
    let signature = signed(&payload, WEBHOOK_SECRET);
    let (status, body) = deliver(api, payload, Some(signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response(&body).success);
    let order = db.fetch_order_by_session_id("sess_abc").await.unwrap().expect("Order was not recorded");
    assert_eq!(order.amount_total.value(), 3000);
    assert_eq!(order.customer_email.as_deref(), Some("ada@example.com"));
    let items = db.fetch_order_items(order.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_id, scarf_id);
    assert_eq!(items[0].quantity, 2);
    let scarf = db.fetch_product("scarf-1").await.unwrap().unwrap();
    assert_eq!(scarf.stock_quantity, Some(8));
    assert_eq!(notifier.sent().len(), 1);
}

#[actix_web::test]
async fn redelivery_is_acknowledged_once() {
    let _ = env_logger::try_init().ok();
    let db = prepare_test_db().await;
    seed_product(&db, "scarf-1", 1500, Some(10)).await;
    let notifier = FakeNotifier::default();
    let api = reconciler(db.clone(), MockProcessor::new(), notifier.clone());
    let payload = completed_event("sess_abc", scarf_snapshot());
    let (status, _) = deliver(api.clone(), payload.clone(), Some(signed(&payload, WEBHOOK_SECRET))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = deliver(api, payload.clone(), Some(signed(&payload, WEBHOOK_SECRET))).await;
    assert_eq!(status, StatusCode::OK);
    let body = response(&body);
    assert!(body.success);
    assert_eq!(body.message, "Order for sess_abc already recorded.");
    let order = db.fetch_order_by_session_id("sess_abc").await.unwrap().unwrap();
    assert_eq!(db.fetch_order_items(order.id).await.unwrap().len(), 1);
    let scarf = db.fetch_product("scarf-1").await.unwrap().unwrap();
    assert_eq!(scarf.stock_quantity, Some(8));
    assert_eq!(notifier.sent().len(), 1);
}

#[actix_web::test]
async fn bad_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let db = prepare_test_db().await;
    let api = reconciler(db.clone(), MockProcessor::new(), FakeNotifier::default());
    let payload = completed_event("sess_abc", scarf_snapshot());
    let signature = signed(&payload, "whsec_someone_else");
    let (status, body) = deliver(api, payload, Some(signature)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!response(&body).success);
    assert!(db.fetch_order_by_session_id("sess_abc").await.unwrap().is_none());
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let db = prepare_test_db().await;
    let api = reconciler(db, MockProcessor::new(), FakeNotifier::default());
    let (status, _) = deliver(api, completed_event("sess_abc", scarf_snapshot()), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn line_item_outage_asks_for_redelivery() {
    let _ = env_logger::try_init().ok();
    let db = prepare_test_db().await;
    let mut processor = MockProcessor::new();
    processor
        .expect_list_session_line_items()
        .times(1)
        .returning(|_| Err(ProcessorError::Unreachable("timed out".into())));
    let api = reconciler(db.clone(), processor, FakeNotifier::default());
    let payload = completed_event("sess_abc", json!({}));
    let signature = signed(&payload, WEBHOOK_SECRET);
    let (status, body) = deliver(api, payload, Some(signature)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!response(&body).success);
    assert!(db.fetch_order_by_session_id("sess_abc").await.unwrap().is_none());
}

#[actix_web::test]
async fn malformed_event_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let db = prepare_test_db().await;
    let api = reconciler(db.clone(), MockProcessor::new(), FakeNotifier::default());
    let payload = json!({
        "id": "evt_2",
        "type": "checkout.session.completed",
        "data": { "object": { "id": "sess_xyz", "payment_status": "paid" } }
    })
    .to_string()
    .into_bytes();
    let signature = signed(&payload, WEBHOOK_SECRET);
    let (status, body) = deliver(api, payload, Some(signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!response(&body).success);
    assert!(db.fetch_order_by_session_id("sess_xyz").await.unwrap().is_none());
}

#[actix_web::test]
async fn other_event_types_are_ignored() {
    let _ = env_logger::try_init().ok();
    let db = prepare_test_db().await;
    let api = reconciler(db, MockProcessor::new(), FakeNotifier::default());
    let payload = json!({
        "id": "evt_3",
        "type": "payment_intent.created",
        "data": { "object": { "id": "pi_1" } }
    })
    .to_string()
    .into_bytes();
    let signature = signed(&payload, WEBHOOK_SECRET);
    let (status, body) = deliver(api, payload, Some(signature)).await;
    assert_eq!(status, StatusCode::OK);
    let body = response(&body);
    assert!(body.success);
    assert_eq!(body.message, "Ignored payment_intent.created event.");
}
