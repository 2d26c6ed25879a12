//! [`RateSource`] for the open.er-api.com exchange-rate feed.
//!
//! `GET {url}/{BASE}` answers with `{"result": "success", "base_code": "GBP", "rates": {"USD": 1.27, ...}}`. Rates are
//! read from their JSON text so that `1.27` becomes exactly `1.27` rather than the nearest binary float.
use std::{collections::HashMap, str::FromStr, time::Duration};

use checkout_engine::{
    traits::{RateSource, RateSourceError},
    RateTable,
};
use log::*;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use storefront_common::CurrencyCode;

use crate::errors::ServerError;

#[derive(Debug, Deserialize)]
struct RatesResponse {
    result: String,
    #[serde(default, rename = "error-type")]
    error_type: Option<String>,
    #[serde(default)]
    rates: HashMap<String, serde_json::Number>,
}

#[derive(Clone)]
pub struct ErApiRates {
    client: Client,
    url: String,
}

impl ErApiRates {
    pub fn new(url: &str) -> Result<Self, ServerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ServerError::InitializeError(format!("Could not create the rate client. {e}")))?;
        Ok(Self { client, url: url.trim_end_matches('/').to_string() })
    }
}

impl RateSource for ErApiRates {
    async fn fetch_rates(&self, base: &CurrencyCode) -> Result<RateTable, RateSourceError> {
        let url = format!("{}/{base}", self.url);
        trace!("💱️ Fetching rates from {url}");
        let response = self.client.get(&url).send().await.map_err(|e| RateSourceError::Unreachable(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| RateSourceError::Unreachable(e.to_string()))?;
        if !status.is_success() {
            return Err(RateSourceError::Unsuccessful(format!("{status}: {body}")));
        }
        let table = parse_rates(base, &body)?;
        debug!("💱️ Fetched {} rates against {base}", table.rates.len());
        Ok(table)
    }
}

pub fn parse_rates(base: &CurrencyCode, body: &str) -> Result<RateTable, RateSourceError> {
    let response =
        serde_json::from_str::<RatesResponse>(body).map_err(|e| RateSourceError::InvalidResponse(e.to_string()))?;
    if response.result != "success" {
        let reason = response.error_type.unwrap_or(response.result);
        return Err(RateSourceError::Unsuccessful(reason));
    }
    let table = response.rates.into_iter().fold(RateTable::new(base), |table, (code, value)| {
        let text = value.to_string();
        match Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)) {
            Ok(rate) => table.with_rate(code, rate),
            Err(e) => {
                warn!("💱️ Ignoring unreadable rate for {code} ({text}). {e}");
                table
            },
        }
    });
    Ok(table)
}
