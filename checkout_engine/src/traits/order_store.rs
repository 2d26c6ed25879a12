use thiserror::Error;

use crate::{
    db_types::{NewOrder, NewOrderItem, Order, OrderItem},
    traits::InsertOrderResult,
};

#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait OrderStore {
    async fn fetch_order_by_session_id(&self, session_id: &str) -> Result<Option<Order>, OrderStoreError>;

    /// Insert a new order.
    ///
    /// A unique-constraint violation on the external session id is not an error: it yields
    /// [`InsertOrderResult::AlreadyExists`]. A write rejected because one of the optional columns does not exist in
    /// the deployed schema yields [`InsertOrderResult::SchemaDriftDetected`] naming that column. Any other failure is an
    /// error.
    async fn insert_order(&self, order: NewOrder) -> Result<InsertOrderResult, OrderStoreError>;

    /// Insert all the items of an order in a single statement.
    async fn insert_order_items(
        &self,
        order_id: i64,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, OrderStoreError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderStoreError>;

    /// Record the receipt id returned by the notification provider. This is the only mutation an order ever sees.
    async fn attach_notification_receipt(&self, order_id: i64, receipt: &str) -> Result<Order, OrderStoreError>;
}
