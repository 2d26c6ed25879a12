use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use storefront_common::{CurrencyCode, MinorUnits};

/// One line of a shopper's cart. `product_ref` is either an internal product id or a slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_ref: String,
    pub quantity: i64,
}

impl CartLine {
    pub fn new<S: Into<String>>(product_ref: S, quantity: i64) -> Self {
        Self { product_ref: product_ref.into(), quantity }
    }
}

/// A request to turn a cart into a payment session.
///
/// The currency is taken as given and validated by the builder; `None` means the base currency. Missing URLs are
/// replaced by the builder's defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutRequest {
    pub lines: Vec<CartLine>,
    pub currency: Option<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl CheckoutRequest {
    pub fn new(lines: Vec<CartLine>) -> Self {
        Self { lines, ..Default::default() }
    }

    pub fn in_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A priced cart line, ready to be submitted to the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLineItem {
    pub product_id: String,
    pub unit_amount: MinorUnits,
    pub quantity: u32,
    pub currency: CurrencyCode,
    pub processor_price_id: String,
}

/// The processor's session, handed back to the shopper unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub session_id: String,
    pub redirect_url: String,
}
