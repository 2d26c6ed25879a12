use std::{collections::HashMap, fmt::Display};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use storefront_common::CurrencyCode;

use crate::db_types::{OptionalOrderField, Order, OrderItem};

/// The outcome of an order insert, as reported by the storage adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOrderResult {
    Inserted(Order),
    /// Another writer already persisted an order for this external session id.
    AlreadyExists(String),
    /// The deployed schema does not have a column for this optional field.
    SchemaDriftDetected(OptionalOrderField),
}

impl Display for InsertOrderResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inserted(order) => write!(f, "Inserted {order}"),
            Self::AlreadyExists(session_id) => write!(f, "Order for session {session_id} already exists"),
            Self::SchemaDriftDetected(field) => write!(f, "Schema drift detected on column {field}"),
        }
    }
}

/// Exchange rates for one unit of `base`, keyed by upper-case ISO 4217 code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    pub base: String,
    pub rates: HashMap<String, Decimal>,
}

impl RateTable {
    pub fn new(base: &CurrencyCode) -> Self {
        Self { base: base.to_string(), rates: HashMap::new() }
    }

    pub fn with_rate<S: Into<String>>(mut self, currency: S, rate: Decimal) -> Self {
        self.rates.insert(currency.into().to_uppercase(), rate);
        self
    }

    pub fn rate_for(&self, currency: &CurrencyCode) -> Option<Decimal> {
        self.rates.get(currency.as_str()).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationReceipt(pub String);

impl Display for NotificationReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything a notifier needs to render an order confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderConfirmation {
    pub recipient: String,
    pub order: Order,
    pub items: Vec<OrderItem>,
}
