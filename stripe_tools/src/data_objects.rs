use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::FormParams;

/// Stripe's standard envelope for list endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

impl<T> Default for StripeList<T> {
    fn default() -> Self {
        Self { data: Vec::new(), has_more: false }
    }
}

//--------------------------------------       Products        -------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub name: String,
    pub images: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl NewProduct {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn with_image<S: Into<String>>(mut self, url: S) -> Self {
        self.images.push(url.into());
        self
    }

    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn to_form(&self) -> FormParams {
        let mut form = FormParams::default();
        form.push("name", &self.name);
        for (i, image) in self.images.iter().enumerate() {
            form.push(format!("images[{i}]"), image);
        }
        form.push_metadata("metadata", &self.metadata);
        form
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct StripeProduct {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// A price's `product` field is an id unless the request asked for it to be expanded.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ProductRef {
    Id(String),
    Expanded(StripeProduct),
}

impl ProductRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Expanded(p) => &p.id,
        }
    }

    pub fn metadata(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Id(_) => None,
            Self::Expanded(p) => Some(&p.metadata),
        }
    }
}

//--------------------------------------        Prices         -------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct NewPrice {
    pub product: String,
    pub unit_amount: i64,
    /// Lower-case ISO code
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
}

impl NewPrice {
    pub fn to_form(&self) -> FormParams {
        let mut form = FormParams::default();
        form.push("product", &self.product);
        form.push("unit_amount", self.unit_amount.to_string());
        form.push("currency", &self.currency);
        form.push_metadata("metadata", &self.metadata);
        form
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StripePrice {
    pub id: String,
    #[serde(default)]
    pub unit_amount: Option<i64>,
    pub currency: String,
    #[serde(default)]
    pub product: Option<ProductRef>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl StripePrice {
    /// Looks for `key` in the price's own metadata first, then in the expanded product's metadata.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .or_else(|| self.product.as_ref().and_then(|p| p.metadata()).and_then(|m| m.get(key)))
            .map(String::as_str)
    }
}

//--------------------------------------   Checkout sessions   -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
    pub price: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default)]
pub struct NewCheckoutSession {
    pub success_url: String,
    pub cancel_url: String,
    pub line_items: Vec<SessionLineItem>,
    pub metadata: BTreeMap<String, String>,
}

impl NewCheckoutSession {
    pub fn to_form(&self) -> FormParams {
        let mut form = FormParams::default();
        form.push("mode", "payment");
        form.push("success_url", &self.success_url);
        form.push("cancel_url", &self.cancel_url);
        for (i, item) in self.line_items.iter().enumerate() {
            form.push(format!("line_items[{i}][price]"), &item.price);
            form.push(format!("line_items[{i}][quantity]"), item.quantity.to_string());
        }
        form.push_metadata("metadata", &self.metadata);
        form
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct CheckoutSession {
    pub id: String,
    /// The hosted payment page. Stripe omits it once the session is complete or expired.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LineItem {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub amount_total: i64,
    pub currency: String,
    #[serde(default)]
    pub price: Option<StripePrice>,
}

//--------------------------------------        Errors         -------------------------------------------------------
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}
