use log::{debug, trace, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, NewOrderItem, OptionalOrderField, Order, OrderItem},
    traits::{InsertOrderResult, OrderStoreError},
};

/// Inserts a new order, reporting duplicates and schema drift as outcomes rather than errors.
///
/// Optional columns are only named in the statement when they carry a value, so stripping a field from the `NewOrder`
/// also removes its column from the insert.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<InsertOrderResult, OrderStoreError> {
    let session_id = order.external_session_id.clone();
    let metadata = order.metadata.as_ref().map(|m| m.to_string());
    let mut builder = QueryBuilder::new("INSERT INTO orders (external_session_id, amount_total, currency");
    if order.customer_email.is_some() {
        builder.push(", customer_email");
    }
    if order.payment_status.is_some() {
        builder.push(", payment_status");
    }
    if metadata.is_some() {
        builder.push(", metadata");
    }
    builder.push(") VALUES (");
    let mut values = builder.separated(", ");
    values.push_bind(order.external_session_id);
    values.push_bind(order.amount_total);
    values.push_bind(order.currency.to_string());
    if let Some(email) = order.customer_email {
        values.push_bind(email);
    }
    if let Some(status) = order.payment_status {
        values.push_bind(status);
    }
    if let Some(metadata) = metadata {
        values.push_bind(metadata);
    }
    builder.push(") RETURNING *;");
    // `fetch_all` steps the statement to completion, so the row is written before we return
    let inserted = builder.build_query_as::<Order>().fetch_all(conn).await.and_then(|rows| {
        rows.into_iter().next().ok_or(sqlx::Error::RowNotFound)
    });
    match inserted {
        Ok(order) => {
            debug!("🗃️ Order [{}] inserted with id {}", order.external_session_id, order.id);
            Ok(InsertOrderResult::Inserted(order))
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            debug!("🗃️ Order for session {session_id} already exists. {e}");
            Ok(InsertOrderResult::AlreadyExists(session_id))
        },
        Err(e) => match detect_schema_drift(&e.to_string()) {
            Some(column) => match OptionalOrderField::from_column(&column) {
                Some(field) => {
                    warn!("🗃️ The orders table has no '{column}' column. The insert for {session_id} was rejected.");
                    Ok(InsertOrderResult::SchemaDriftDetected(field))
                },
                None => {
                    Err(OrderStoreError::DatabaseError(format!("Required order column '{column}' is missing. {e}")))
                },
            },
            None => Err(e.into()),
        },
    }
}

/// Extracts the name of the missing column from a database error message, if the message describes a write that
/// referenced a column the table does not have.
///
/// Recognises SQLite (`table orders has no column named metadata`) and PostgreSQL
/// (`column "metadata" of relation "orders" does not exist`) phrasing. This is the only place that inspects error text.
pub fn detect_schema_drift(message: &str) -> Option<String> {
    DRIFT_PATTERNS
        .iter()
        .find_map(|re| re.captures(message).and_then(|c| c.get(1)).map(|m| m.as_str().to_string()))
}

static DRIFT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r#"no column named "?(\w+)"?"#, r#"column "(\w+)" of relation "\w+" does not exist"#]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

pub async fn fetch_order_by_session_id(
    session_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE external_session_id = $1")
        .bind(session_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

/// Inserts all the items for an order in a single statement.
pub async fn insert_order_items(
    order_id: i64,
    items: &[NewOrderItem],
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    if items.is_empty() {
        return Ok(vec![]);
    }
    let mut builder = QueryBuilder::new(
        "INSERT INTO order_items (order_id, product_id, product_name, unit_amount, quantity, currency) ",
    );
    builder.push_values(items, |mut row, item| {
        row.push_bind(order_id)
            .push_bind(item.product_id.clone())
            .push_bind(item.product_name.clone())
            .push_bind(item.unit_amount)
            .push_bind(item.quantity)
            .push_bind(item.currency.to_string());
    });
    builder.push(" RETURNING *;");
    let inserted = builder.build_query_as::<OrderItem>().fetch_all(conn).await?;
    trace!("🗃️ Inserted {} items for order #{order_id}", inserted.len());
    Ok(inserted)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn attach_notification_receipt(
    order_id: i64,
    receipt: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let updated: Vec<Order> =
        sqlx::query_as("UPDATE orders SET notification_receipt = $1 WHERE id = $2 RETURNING *")
            .bind(receipt)
            .bind(order_id)
            .fetch_all(conn)
            .await?;
    Ok(updated.into_iter().next())
}
