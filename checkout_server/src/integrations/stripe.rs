//! [`PaymentProcessor`] backed by the Stripe REST API.
//!
//! Every processor-side product and price is tagged with the catalog product id under
//! [`PRODUCT_ID_METADATA_KEY`], which is how line items are traced back to the catalog when a completed session is
//! reconstructed from Stripe's own record.
use std::collections::BTreeMap;

use checkout_engine::{
    processor_types::{
        NewProcessorPrice,
        NewProcessorSession,
        ProcessorLineItem,
        ProcessorPrice,
        ProcessorSession,
        PRODUCT_ID_METADATA_KEY,
    },
    traits::{PaymentProcessor, ProcessorError},
};
use log::*;
use storefront_common::MinorUnits;
use stripe_tools::{LineItem, NewCheckoutSession, NewPrice, NewProduct, SessionLineItem, StripeApi, StripeApiError};

#[derive(Clone)]
pub struct StripeProcessor {
    api: StripeApi,
}

impl StripeProcessor {
    pub fn new(api: StripeApi) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &StripeApi {
        &self.api
    }
}

impl PaymentProcessor for StripeProcessor {
    async fn create_price(&self, price: &NewProcessorPrice) -> Result<ProcessorPrice, ProcessorError> {
        let mut product =
            NewProduct::new(&price.product_name).with_metadata(PRODUCT_ID_METADATA_KEY, &price.product_id);
        if let Some(url) = &price.image_url {
            product = product.with_image(url);
        }
        let product = self.api.create_product(&product).await.map_err(to_processor_error)?;
        let new_price = NewPrice {
            product: product.id,
            unit_amount: price.unit_amount.value(),
            currency: price.currency.to_lowercase(),
            metadata: BTreeMap::from([(PRODUCT_ID_METADATA_KEY.to_string(), price.product_id.clone())]),
        };
        let created = self.api.create_price(&new_price).await.map_err(to_processor_error)?;
        Ok(ProcessorPrice { id: created.id })
    }

    async fn create_checkout_session(&self, session: &NewProcessorSession) -> Result<ProcessorSession, ProcessorError> {
        let request = NewCheckoutSession {
            success_url: session.success_url.clone(),
            cancel_url: session.cancel_url.clone(),
            line_items: session
                .lines
                .iter()
                .map(|l| SessionLineItem { price: l.processor_price_id.clone(), quantity: l.quantity })
                .collect(),
            metadata: session.metadata.clone(),
        };
        let created = self.api.create_checkout_session(&request).await.map_err(to_processor_error)?;
        match created.url {
            Some(redirect_url) => Ok(ProcessorSession { id: created.id, redirect_url }),
            None => Err(ProcessorError::Rejected {
                message: "The payment page could not be opened. Please try again.".to_string(),
                diagnostics: format!("Checkout session {} was created without a url", created.id),
            }),
        }
    }

    async fn list_session_line_items(&self, session_id: &str) -> Result<Vec<ProcessorLineItem>, ProcessorError> {
        let items = self.api.list_session_line_items(session_id).await.map_err(to_processor_error)?;
        trace!("💳️ Session {session_id} has {} line items", items.len());
        Ok(items.into_iter().map(processor_line_item).collect())
    }
}

fn to_processor_error(e: StripeApiError) -> ProcessorError {
    match e {
        StripeApiError::Rejected { status, message, code, body } => {
            let code = code.unwrap_or_else(|| "no_code".to_string());
            ProcessorError::Rejected { message, diagnostics: format!("{status} {code} {body}") }
        },
        other => ProcessorError::Unreachable(other.to_string()),
    }
}

/// Converts a Stripe line item (with its price's product expanded) into the processor-neutral shape.
pub fn processor_line_item(item: LineItem) -> ProcessorLineItem {
    let LineItem { description, quantity, amount_total, price, .. } = item;
    let product_ref = price.as_ref().and_then(|p| p.metadata_value(PRODUCT_ID_METADATA_KEY)).map(String::from);
    let processor_product_id = price.as_ref().and_then(|p| p.product.as_ref()).map(|p| p.id().to_string());
    let unit_amount = price.as_ref().and_then(|p| p.unit_amount).map(MinorUnits::from);
    ProcessorLineItem {
        product_ref,
        processor_product_id,
        description,
        unit_amount,
        amount_total: MinorUnits::from(amount_total),
        quantity: quantity.unwrap_or(1),
    }
}
