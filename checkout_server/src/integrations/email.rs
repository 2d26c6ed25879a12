//! [`Notifier`] that sends order confirmations through a Resend-style transactional e-mail API.
use std::{fmt::Write, time::Duration};

use checkout_engine::traits::{NotificationError, NotificationReceipt, Notifier, OrderConfirmation};
use log::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{config::EmailConfig, errors::ServerError};

#[derive(Debug, Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

#[derive(Clone)]
pub struct EmailNotifier {
    client: Client,
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Result<Self, ServerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ServerError::InitializeError(format!("Could not create the e-mail client. {e}")))?;
        Ok(Self { client, config })
    }
}

impl Notifier for EmailNotifier {
    async fn send_confirmation(
        &self,
        confirmation: &OrderConfirmation,
    ) -> Result<NotificationReceipt, NotificationError> {
        let (subject, text) = render_confirmation(confirmation);
        let email = OutgoingEmail { from: &self.config.from, to: vec![confirmation.recipient.as_str()], subject, text };
        trace!("📧️ Sending confirmation for order {} to {}", confirmation.order.id, confirmation.recipient);
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(self.config.api_key.reveal())
            .json(&email)
            .send()
            .await
            .map_err(|e| NotificationError::DeliveryFailed(e.to_string()))?;
        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected(format!("{status}: {body}")));
        }
        if !status.is_success() {
            return Err(NotificationError::DeliveryFailed(format!("The e-mail provider answered {status}")));
        }
        let sent =
            response.json::<SendResponse>().await.map_err(|e| NotificationError::DeliveryFailed(e.to_string()))?;
        Ok(NotificationReceipt(sent.id))
    }
}

/// Renders the subject line and plain-text body of an order confirmation.
pub fn render_confirmation(confirmation: &OrderConfirmation) -> (String, String) {
    let order = &confirmation.order;
    let subject = format!("Your order #{} is confirmed", order.id);
    let mut text = String::from("Thank you for your order!\n\n");
    let _ = writeln!(text, "Order reference: {}\n", order.external_session_id);
    for item in &confirmation.items {
        let line_total = item.unit_amount * item.quantity;
        let _ = writeln!(
            text,
            "  {} x {} @ {} = {}",
            item.quantity,
            item.product_name,
            item.unit_amount.display_in(&item.currency),
            line_total.display_in(&item.currency)
        );
    }
    let _ = writeln!(text, "\nTotal: {}", order.amount_total.display_in(&order.currency));
    (subject, text)
}
