//! Processor-neutral shapes for the data exchanged with the payment processor.
//!
//! The engine never sees a processor's wire format. The [`crate::traits::PaymentProcessor`] implementation in the
//! server converts to and from these types; the only processor payload the engine parses itself is the signed
//! webhook event ([`PaymentEvent`]), because its signature must be checked against the exact bytes received.
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use storefront_common::{CurrencyCode, MinorUnits};

/// The metadata key every processor-side price and product is tagged with, pointing back at the catalog product.
pub const PRODUCT_ID_METADATA_KEY: &str = "product_id";

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const CHECKOUT_SESSION_ASYNC_PAYMENT_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";
pub const PAYMENT_STATUS_UNPAID: &str = "unpaid";

#[derive(Debug, Clone, PartialEq)]
pub struct NewProcessorPrice {
    pub product_id: String,
    pub product_name: String,
    pub image_url: Option<String>,
    pub unit_amount: MinorUnits,
    pub currency: CurrencyCode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorPrice {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLine {
    pub processor_price_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProcessorSession {
    pub lines: Vec<SessionLine>,
    pub currency: CurrencyCode,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorSession {
    pub id: String,
    pub redirect_url: String,
}

/// A purchased line as the processor recorded it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorLineItem {
    /// The catalog reference the processor-side price or product was tagged with, if any.
    pub product_ref: Option<String>,
    /// The processor's own product id, used when the line carries no catalog tag.
    pub processor_product_id: Option<String>,
    pub description: Option<String>,
    pub unit_amount: Option<MinorUnits>,
    pub amount_total: MinorUnits,
    pub quantity: i64,
}

impl ProcessorLineItem {
    /// The per-unit amount, falling back to the line total divided by the quantity.
    pub fn effective_unit_amount(&self) -> MinorUnits {
        match self.unit_amount {
            Some(amount) => amount,
            None if self.quantity > 0 => MinorUnits::from(self.amount_total.value() / self.quantity),
            None => self.amount_total,
        }
    }
}

//--------------------------------------     Webhook events     ------------------------------------------------------

/// A webhook event envelope. Only the parts the reconciler needs are modelled; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: PaymentEventData,
}

impl PaymentEvent {
    pub fn is_session_completion(&self) -> bool {
        matches!(self.event_type.as_str(), CHECKOUT_SESSION_COMPLETED | CHECKOUT_SESSION_ASYNC_PAYMENT_SUCCEEDED)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEventData {
    pub object: CompletedSession,
}

/// The checkout session carried by a completion event. Every field is optional so that events for other object
/// types still deserialize and can be acknowledged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletedSession {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// The processor sends `"metadata": null` for sessions created without any.
fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where D: Deserializer<'de> {
    Ok(Option::<BTreeMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl CompletedSession {
    /// The payer's e-mail, preferring the address they typed at checkout.
    pub fn payer_email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.customer_email.as_deref())
            .filter(|e| !e.trim().is_empty())
    }

    pub fn is_unpaid(&self) -> bool {
        self.payment_status.as_deref() == Some(PAYMENT_STATUS_UNPAID)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_completion_event() {
        let json = r#"{
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "sess_abc",
                "object": "checkout.session",
                "amount_total": 3000,
                "currency": "gbp",
                "customer_details": { "email": "ada@example.com", "name": "Ada" },
                "payment_status": "paid",
                "metadata": { "session_ref": "abc123" }
            }}
        }"#;
        let event: PaymentEvent = serde_json::from_str(json).unwrap();
        assert!(event.is_session_completion());
        let session = event.data.object;
        assert_eq!(session.id.as_deref(), Some("sess_abc"));
        assert_eq!(session.amount_total, Some(3000));
        assert_eq!(session.payer_email(), Some("ada@example.com"));
        assert!(!session.is_unpaid());
        assert_eq!(session.metadata.get("session_ref").map(String::as_str), Some("abc123"));
    }

    #[test]
    fn null_metadata_is_empty() {
        let json = r#"{"id":"evt_3","type":"checkout.session.completed",
            "data":{"object":{"id":"sess_x","currency":"gbp","amount_total":900,"metadata":null}}}"#;
        let event: PaymentEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.data.object.id.as_deref(), Some("sess_x"));
        assert!(event.data.object.metadata.is_empty());
    }

    #[test]
    fn other_objects_still_parse() {
        let json = r#"{"id":"evt_2","type":"charge.refunded","data":{"object":{"id":"ch_1","amount":500}}}"#;
        let event: PaymentEvent = serde_json::from_str(json).unwrap();
        assert!(!event.is_session_completion());
    }

    #[test]
    fn unit_amount_falls_back_to_total() {
        let item = ProcessorLineItem {
            product_ref: None,
            processor_product_id: None,
            description: Some("Scarf".into()),
            unit_amount: None,
            amount_total: MinorUnits::from(3000),
            quantity: 2,
        };
        assert_eq!(item.effective_unit_amount(), MinorUnits::from(1500));
    }
}
