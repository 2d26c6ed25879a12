use std::sync::Arc;

use log::*;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;

use crate::{
    config::StripeConfig,
    data_objects::{
        CheckoutSession,
        ErrorEnvelope,
        LineItem,
        NewCheckoutSession,
        NewPrice,
        NewProduct,
        StripeList,
        StripePrice,
        StripeProduct,
    },
    FormParams,
    StripeApiError,
};

const LINE_ITEM_PAGE_SIZE: &str = "100";

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_base)
    }

    pub async fn form_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        form: Option<FormParams>,
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("💳️ Sending {method} {url}");
        let mut req = self.client.request(method, url).bearer_auth(self.config.secret_key.reveal());
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(form) = form {
            req = req.form(&form.into_pairs());
        }
        let response = req.send().await.map_err(|e| StripeApiError::RequestError(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            trace!("💳️ Request successful. {status}");
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let body = response.text().await.map_err(|e| StripeApiError::RequestError(e.to_string()))?;
            Err(rejection(status.as_u16(), body))
        }
    }

    pub async fn create_product(&self, product: &NewProduct) -> Result<StripeProduct, StripeApiError> {
        debug!("💳️ Creating product '{}'", product.name);
        let result = self.form_request(Method::POST, "/products", &[], Some(product.to_form())).await?;
        Ok(result)
    }

    pub async fn create_price(&self, price: &NewPrice) -> Result<StripePrice, StripeApiError> {
        debug!("💳️ Creating price of {} {} for {}", price.unit_amount, price.currency, price.product);
        let result: StripePrice = self.form_request(Method::POST, "/prices", &[], Some(price.to_form())).await?;
        info!("💳️ Created price {} for {}", result.id, price.product);
        Ok(result)
    }

    pub async fn create_checkout_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<CheckoutSession, StripeApiError> {
        debug!("💳️ Creating checkout session with {} line items", session.line_items.len());
        let result: CheckoutSession =
            self.form_request(Method::POST, "/checkout/sessions", &[], Some(session.to_form())).await?;
        info!("💳️ Created checkout session {}", result.id);
        Ok(result)
    }

    /// Fetches every line item recorded for the session, following pagination, with each price's product expanded
    /// so that product metadata is available.
    pub async fn list_session_line_items(&self, session_id: &str) -> Result<Vec<LineItem>, StripeApiError> {
        let path = format!("/checkout/sessions/{session_id}/line_items");
        let mut items = Vec::new();
        let mut starting_after: Option<String> = None;
        loop {
            let mut params = vec![("limit", LINE_ITEM_PAGE_SIZE), ("expand[]", "data.price.product")];
            if let Some(after) = starting_after.as_deref() {
                params.push(("starting_after", after));
            }
            let page: StripeList<LineItem> = self.form_request(Method::GET, &path, &params, None).await?;
            let has_more = page.has_more;
            let last_id = page.data.last().map(|li| li.id.clone());
            items.extend(page.data);
            match (has_more, last_id) {
                (true, Some(id)) => starting_after = Some(id),
                _ => break,
            }
        }
        debug!("💳️ Fetched {} line items for session {session_id}", items.len());
        Ok(items)
    }
}

/// Builds a [`StripeApiError::Rejected`] from a failed response, pulling Stripe's own message out of the error
/// envelope when there is one.
fn rejection(status: u16, body: String) -> StripeApiError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(&body).unwrap_or_default();
    let message = envelope.error.message.unwrap_or_else(|| format!("The payment processor returned status {status}."));
    StripeApiError::Rejected { status, message, code: envelope.error.code, body }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejection_extracts_message() {
        let body = r#"{"error":{"code":"resource_missing","message":"No such price: 'price_x'","type":"invalid_request_error"}}"#;
        match rejection(400, body.to_string()) {
            StripeApiError::Rejected { status, message, code, body: raw } => {
                assert_eq!(status, 400);
                assert_eq!(message, "No such price: 'price_x'");
                assert_eq!(code.as_deref(), Some("resource_missing"));
                assert!(raw.contains("invalid_request_error"));
            },
            e => panic!("Unexpected error {e:?}"),
        }
    }

    #[test]
    fn rejection_without_envelope() {
        let err = rejection(502, "<html>Bad gateway</html>".to_string());
        assert_eq!(err.public_message(), "The payment processor returned status 502.");
    }

    #[test]
    fn urls() {
        let config = StripeConfig { api_base: "http://localhost:12111".into(), ..Default::default() };
        let api = StripeApi::new(config).unwrap();
        assert_eq!(api.url("/prices"), "http://localhost:12111/v1/prices");
    }
}
