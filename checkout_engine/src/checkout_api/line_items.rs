//! Reconstructing what was bought in a completed session.
//!
//! There are two sources of truth:
//!
//! * [`MetadataSnapshot`]: the session metadata carries an `items` entry holding a compact JSON array of
//!   `{"ref", "qty", "amt", "name"}` objects (`amt` is the unit amount in the session currency's minor units, `name`
//!   is optional). This is cheap, but is only present on sessions created with a snapshot.
//! * [`ProcessorLineItems`]: ask the processor for the session's line items. This always works, at the cost of
//!   (possibly paginated) API calls that may fail, in which case the event must be retried.
//!
//! A snapshot is used when present and well-formed; otherwise the processor is asked.
use std::collections::BTreeMap;

use log::*;
use serde::{Deserialize, Serialize};
use storefront_common::MinorUnits;

use crate::{
    checkout_api::{errors::ReconcileError, session_builder::ITEMS_METADATA_KEY},
    traits::PaymentProcessor,
};

/// One purchased line, as reconstructed from a completed session. Amounts are in the session currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchasedItem {
    /// The catalog reference: an internal product id, a slug, or an external reference that matches neither.
    pub product_ref: String,
    pub product_name: Option<String>,
    pub unit_amount: MinorUnits,
    pub quantity: i64,
}

#[allow(async_fn_in_trait)]
pub trait LineItemSource {
    async fn line_items(&self, session_id: &str) -> Result<Vec<PurchasedItem>, ReconcileError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    #[serde(rename = "ref")]
    pub product_ref: String,
    #[serde(rename = "qty")]
    pub quantity: i64,
    #[serde(rename = "amt")]
    pub unit_amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Line items carried in the session's own metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSnapshot {
    entries: Vec<SnapshotEntry>,
}

impl MetadataSnapshot {
    /// Reads the snapshot from session metadata. Returns `None` if there is no snapshot, or if it cannot be used.
    pub fn from_metadata(metadata: &BTreeMap<String, String>) -> Option<Self> {
        let raw = metadata.get(ITEMS_METADATA_KEY)?;
        match serde_json::from_str::<Vec<SnapshotEntry>>(raw) {
            Ok(entries) if !entries.is_empty() => Some(Self { entries }),
            Ok(_) => {
                debug!("🧾️ The line-item snapshot is empty. Ignoring it.");
                None
            },
            Err(e) => {
                warn!("🧾️ The line-item snapshot in the session metadata could not be read. Ignoring it. {e}");
                None
            },
        }
    }

    pub fn encode(entries: &[SnapshotEntry]) -> Result<String, serde_json::Error> {
        serde_json::to_string(entries)
    }
}

impl LineItemSource for MetadataSnapshot {
    async fn line_items(&self, _session_id: &str) -> Result<Vec<PurchasedItem>, ReconcileError> {
        let items = self
            .entries
            .iter()
            .map(|e| PurchasedItem {
                product_ref: e.product_ref.clone(),
                product_name: e.name.clone(),
                unit_amount: MinorUnits::from(e.unit_amount),
                quantity: e.quantity,
            })
            .collect();
        Ok(items)
    }
}

/// Line items listed by the payment processor.
pub struct ProcessorLineItems<'a, P> {
    processor: &'a P,
}

impl<'a, P> ProcessorLineItems<'a, P> {
    pub fn new(processor: &'a P) -> Self {
        Self { processor }
    }
}

impl<P: PaymentProcessor> LineItemSource for ProcessorLineItems<'_, P> {
    async fn line_items(&self, session_id: &str) -> Result<Vec<PurchasedItem>, ReconcileError> {
        let items = self.processor.list_session_line_items(session_id).await.map_err(|e| {
            ReconcileError::LineItemsUnavailable { session_id: session_id.to_string(), reason: e.diagnostics().into() }
        })?;
        let items = items
            .into_iter()
            .map(|item| {
                let unit_amount = item.effective_unit_amount();
                let product_ref = item
                    .product_ref
                    .or(item.processor_product_id)
                    .or_else(|| item.description.clone())
                    .unwrap_or_else(|| "unknown".to_string());
                PurchasedItem { product_ref, product_name: item.description, unit_amount, quantity: item.quantity }
            })
            .collect();
        Ok(items)
    }
}
