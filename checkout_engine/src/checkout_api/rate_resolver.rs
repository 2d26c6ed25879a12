//! Settlement-currency conversion.
//!
//! Catalog prices live in the base currency ([`storefront_common::BASE_CURRENCY`]). The [`RateResolver`] answers the
//! question "how many units of X does one base unit buy?", caching the rate table it gets from its [`RateSource`] for
//! a configurable time-to-live. A failed fetch is never cached, so the next request tries again.
//!
//! When the source has nothing to say about a currency, a small hard-coded table of major currencies is used instead,
//! so that the storefront can keep selling in USD and EUR while the rate feed is down.
use std::{collections::BTreeSet, fmt::Debug, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use log::*;
use rust_decimal::Decimal;
use storefront_common::CurrencyCode;
use tokio::sync::RwLock;

use crate::{
    checkout_api::errors::RateError,
    helpers::Clock,
    traits::{RateSource, RateTable},
};

pub const DEFAULT_RATE_TTL_SECS: i64 = 3600;

const FALLBACK_CURRENCIES: [&str; 2] = ["USD", "EUR"];

/// Approximate rates used when the rate source has no entry for a currency.
fn fallback_rate(currency: &CurrencyCode) -> Option<Decimal> {
    match currency.as_str() {
        "USD" => Some(Decimal::new(127, 2)),
        "EUR" => Some(Decimal::new(117, 2)),
        _ => None,
    }
}

/// The cached rate table and when it was fetched.
#[derive(Debug, Clone, Default)]
pub struct RateCache {
    pub value: Option<Arc<RateTable>>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl RateCache {
    /// A cache pre-loaded with `table`, as if it had been fetched at `fetched_at`.
    pub fn primed(table: RateTable, fetched_at: DateTime<Utc>) -> Self {
        Self { value: Some(Arc::new(table)), fetched_at: Some(fetched_at) }
    }

    fn fresh(&self, now: DateTime<Utc>, ttl: Duration) -> Option<Arc<RateTable>> {
        match (&self.value, self.fetched_at) {
            (Some(table), Some(at)) if now - at < ttl => Some(Arc::clone(table)),
            _ => None,
        }
    }

    fn store(&mut self, table: Arc<RateTable>, now: DateTime<Utc>) {
        self.value = Some(table);
        self.fetched_at = Some(now);
    }
}

pub struct RateResolver<R> {
    source: R,
    cache: RwLock<RateCache>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl<R> Debug for RateResolver<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RateResolver(ttl: {}s)", self.ttl.num_seconds())
    }
}

impl<R> RateResolver<R>
where R: RateSource
{
    pub fn new(source: R, cache: RateCache, clock: Arc<dyn Clock>) -> Self {
        Self { source, cache: RwLock::new(cache), clock, ttl: Duration::seconds(DEFAULT_RATE_TTL_SECS) }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    /// Normalises `code` and resolves its multiplier. See [`Self::get_multiplier`].
    pub async fn get_multiplier_for_code(&self, code: &str) -> Result<Decimal, RateError> {
        let currency = code.parse::<CurrencyCode>()?;
        self.get_multiplier(&currency).await
    }

    /// The number of units of `target` that one unit of the base currency buys.
    ///
    /// The base currency always resolves to exactly one, without touching the cache or the source.
    pub async fn get_multiplier(&self, target: &CurrencyCode) -> Result<Decimal, RateError> {
        if target.is_base() {
            return Ok(Decimal::ONE);
        }
        let table = self.current_rates().await;
        let rate = match table.rate_for(target) {
            Some(rate) => Some(rate),
            None => {
                let fallback = fallback_rate(target);
                if fallback.is_some() {
                    debug!("💱️ No live rate for {target}. Using the fallback table.");
                }
                fallback
            },
        };
        match rate {
            Some(r) if r > Decimal::ZERO => Ok(r),
            _ => {
                debug!("💱️ No usable exchange rate for {target}");
                Err(RateError::NotAvailable(target.clone()))
            },
        }
    }

    /// Every currency a checkout can currently settle in, sorted: the base currency, whatever the live table holds,
    /// and the fallback currencies.
    pub async fn supported_currencies(&self) -> Vec<String> {
        let table = self.current_rates().await;
        let mut result = BTreeSet::new();
        result.insert(CurrencyCode::base().to_string());
        result.extend(table.rates.iter().filter(|(_, r)| **r > Decimal::ZERO).map(|(c, _)| c.clone()));
        result.extend(FALLBACK_CURRENCIES.iter().map(|c| c.to_string()));
        result.into_iter().collect()
    }

    /// Returns the cached table if it is fresh, or fetches a new one. Fetch failures yield an empty table and leave
    /// the cache as it was.
    async fn current_rates(&self) -> Arc<RateTable> {
        let now = self.clock.now();
        if let Some(table) = self.cache.read().await.fresh(now, self.ttl) {
            trace!("💱️ Using cached rates");
            return table;
        }
        let base = CurrencyCode::base();
        match self.source.fetch_rates(&base).await {
            Ok(table) => {
                info!("💱️ Fetched {} exchange rates against {base}", table.rates.len());
                let table = Arc::new(table);
                self.cache.write().await.store(Arc::clone(&table), now);
                table
            },
            Err(e) => {
                warn!("💱️ Could not fetch exchange rates. Only fallback rates are available. {e}");
                Arc::new(RateTable::new(&base))
            },
        }
    }
}
