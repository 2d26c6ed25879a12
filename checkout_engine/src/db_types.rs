use std::fmt::Display;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storefront_common::{CurrencyCode, MinorUnits};

//--------------------------------------      Product        ---------------------------------------------------------
/// The catalog's view of a product, as far as checkout is concerned.
///
/// `price` is in the base currency and in major units (e.g. `12.50` GBP). A product without a price, or with a
/// non-positive one, cannot be sold. `stock_quantity` is `None` for products whose stock is not tracked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub price: Option<Decimal>,
    pub is_available: bool,
    pub stock_quantity: Option<i64>,
    pub images: Vec<String>,
}

impl Product {
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// The catalog price if it is usable for a sale, i.e. present and strictly positive.
    pub fn sale_price(&self) -> Option<Decimal> {
        self.price.filter(|p| p.is_sign_positive() && !p.is_zero())
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub price: Option<Decimal>,
    pub is_available: bool,
    pub stock_quantity: Option<i64>,
    pub images: Vec<String>,
}

impl NewProduct {
    pub fn new<S: Into<String>, N: Into<String>>(slug: S, name: N, price: Decimal) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            slug: slug.into(),
            name: name.into(),
            price: Some(price),
            is_available: true,
            stock_quantity: None,
            images: vec![],
        }
    }

    pub fn with_stock(mut self, stock: i64) -> Self {
        self.stock_quantity = Some(stock);
        self
    }

    pub fn with_image<S: Into<String>>(mut self, image: S) -> Self {
        self.images.push(image.into());
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.is_available = false;
        self
    }
}

//--------------------------------------    PriceMapping     ---------------------------------------------------------
/// A durable link between a catalog product, a settlement currency and the processor-side price object that was
/// minted for it. Mappings are never updated. `unit_amount` records the amount the price was minted at.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PriceMapping {
    pub id: i64,
    pub product_id: String,
    pub currency: CurrencyCode,
    pub processor_price_id: String,
    pub unit_amount: MinorUnits,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPriceMapping {
    pub product_id: String,
    pub currency: CurrencyCode,
    pub processor_price_id: String,
    pub unit_amount: MinorUnits,
}

//--------------------------------------        Order        ---------------------------------------------------------
/// A persisted order. Columns that may be missing from older database schemas are marked `#[sqlx(default)]` so that
/// reading an order never fails because of them.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub external_session_id: String,
    pub amount_total: MinorUnits,
    pub currency: CurrencyCode,
    #[sqlx(default)]
    pub customer_email: Option<String>,
    #[sqlx(default)]
    pub payment_status: Option<String>,
    #[sqlx(default)]
    pub metadata: Option<String>,
    #[sqlx(default)]
    pub notification_receipt: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Order #{} [{}] {}", self.id, self.external_session_id, self.amount_total.display_in(&self.currency))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub external_session_id: String,
    pub amount_total: MinorUnits,
    pub currency: CurrencyCode,
    pub customer_email: Option<String>,
    pub payment_status: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl NewOrder {
    pub fn new<S: Into<String>>(external_session_id: S, amount_total: MinorUnits, currency: CurrencyCode) -> Self {
        Self {
            external_session_id: external_session_id.into(),
            amount_total,
            currency,
            customer_email: None,
            payment_status: None,
            metadata: None,
        }
    }

    /// Drop the value of an optional column so that the next insert leaves the column out entirely.
    pub fn strip(&mut self, field: OptionalOrderField) {
        match field {
            OptionalOrderField::CustomerEmail => self.customer_email = None,
            OptionalOrderField::PaymentStatus => self.payment_status = None,
            OptionalOrderField::Metadata => self.metadata = None,
        }
    }
}

/// The order columns that may be absent from a deployed schema. An insert that trips over one of these can be
/// retried without it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalOrderField {
    CustomerEmail,
    PaymentStatus,
    Metadata,
}

impl OptionalOrderField {
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::CustomerEmail => "customer_email",
            Self::PaymentStatus => "payment_status",
            Self::Metadata => "metadata",
        }
    }

    pub fn from_column(column: &str) -> Option<Self> {
        match column {
            "customer_email" => Some(Self::CustomerEmail),
            "payment_status" => Some(Self::PaymentStatus),
            "metadata" => Some(Self::Metadata),
            _ => None,
        }
    }
}

impl Display for OptionalOrderField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column_name())
    }
}

//--------------------------------------      OrderItem      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: String,
    pub product_name: String,
    pub unit_amount: MinorUnits,
    pub quantity: i64,
    pub currency: CurrencyCode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub product_id: String,
    pub product_name: String,
    pub unit_amount: MinorUnits,
    pub quantity: i64,
    pub currency: CurrencyCode,
}

impl NewOrderItem {
    pub fn line_total(&self) -> MinorUnits {
        self.unit_amount * self.quantity
    }
}
