//! Cart → payment session.
//!
//! [`SessionBuilder::build_session`] works in three passes so that a bad cart never leaves anything behind:
//!
//! 1. **Validate** every line against the catalog (existence, availability, quantity, advisory stock, price) and look
//!    up any existing price mappings. Nothing is written.
//! 2. **Price** every line. Lines with a mapping reuse its processor price; the rest get a new processor price at
//!    `round_half_away_from_zero(base_price × multiplier × minor_unit_factor)`.
//! 3. **Persist** the newly minted mappings, then submit one session to the processor.
//!
//! A failure in pass 1 or 2 aborts before any mapping is stored. Processor prices minted in pass 2 before a later line
//! fails are orphaned on the processor side; they are harmless and never referenced.
//!
//! Stock checks are advisory. Two shoppers can both pass validation for the last item; the reconciler floors the
//! stock count at zero.
use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    sync::Arc,
};

use log::*;
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use storefront_common::{helpers::absolute_url, CurrencyCode, MinorUnits};

use crate::{
    checkout_api::{
        checkout_objects::{CartLine, CheckoutRequest, CheckoutSession, ResolvedLineItem},
        errors::CheckoutError,
        rate_resolver::RateResolver,
    },
    db_types::{NewPriceMapping, PriceMapping, Product},
    processor_types::{NewProcessorPrice, NewProcessorSession, SessionLine},
    traits::{CheckoutBackend, PaymentProcessor, RateSource},
};

pub const SESSION_REF_METADATA_KEY: &str = "session_ref";
pub const ITEM_COUNT_METADATA_KEY: &str = "item_count";
/// Session metadata key that the reconciler trusts as a line-item snapshot. Shoppers may never set it.
pub const ITEMS_METADATA_KEY: &str = "items";

const RESERVED_METADATA_KEYS: [&str; 3] = [SESSION_REF_METADATA_KEY, ITEM_COUNT_METADATA_KEY, ITEMS_METADATA_KEY];

/// The processor's limits on session metadata.
pub const MAX_METADATA_KEYS: usize = 50;
pub const MAX_METADATA_KEY_LEN: usize = 40;
pub const MAX_METADATA_VALUE_LEN: usize = 500;

const SESSION_REF_LEN: usize = 16;

/// Where the processor sends the shopper after checkout, and the site root used to absolutise image paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutUrls {
    pub site_url: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutUrls {
    /// The default redirect targets for a storefront hosted at `site_url`. `{CHECKOUT_SESSION_ID}` is substituted by
    /// the processor.
    pub fn for_site(site_url: &str) -> Self {
        let site_url = site_url.trim_end_matches('/').to_string();
        Self {
            success_url: format!("{site_url}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{site_url}/cart"),
            site_url,
        }
    }
}

/// Converts a base-currency price in major units into settlement-currency minor units.
///
/// The whole product is computed exactly and rounded once, half away from zero. Returns `None` on overflow.
pub fn to_minor_units(base_price: Decimal, multiplier: Decimal, currency: &CurrencyCode) -> Option<MinorUnits> {
    let factor = Decimal::from(currency.minor_unit_factor());
    let amount = base_price.checked_mul(multiplier)?.checked_mul(factor)?;
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero).to_i64().map(MinorUnits::from)
}

/// Drops metadata entries the processor would reject, and any attempt to set a reserved key, logging each one.
/// Entries are considered in key order, and room is always left for the reserved keys.
pub fn clamp_metadata(metadata: BTreeMap<String, String>) -> BTreeMap<String, String> {
    let budget = MAX_METADATA_KEYS - RESERVED_METADATA_KEYS.len();
    let mut result = BTreeMap::new();
    for (k, v) in metadata {
        if RESERVED_METADATA_KEYS.contains(&k.as_str()) {
            warn!("🛒️ Metadata key '{k}' is reserved. Dropping the caller's value.");
            continue;
        }
        if result.len() >= budget {
            warn!("🛒️ Metadata key limit reached. Dropping '{k}'");
            continue;
        }
        if k.is_empty() || k.chars().count() > MAX_METADATA_KEY_LEN {
            warn!("🛒️ Metadata key '{k}' is empty or longer than {MAX_METADATA_KEY_LEN} characters. Dropping it.");
            continue;
        }
        if v.chars().count() > MAX_METADATA_VALUE_LEN {
            warn!("🛒️ Metadata value for '{k}' is longer than {MAX_METADATA_VALUE_LEN} characters. Dropping it.");
            continue;
        }
        result.insert(k, v);
    }
    result
}

fn new_session_ref() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(SESSION_REF_LEN).map(char::from).collect()
}

/// A cart line that passed validation.
struct ValidatedLine {
    product: Product,
    quantity: u32,
    price: Decimal,
    mapping: Option<PriceMapping>,
}

pub struct SessionBuilder<B, P, R> {
    db: B,
    processor: P,
    rates: Arc<RateResolver<R>>,
    urls: CheckoutUrls,
}

impl<B, P, R> Debug for SessionBuilder<B, P, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionBuilder({})", self.urls.site_url)
    }
}

impl<B, P, R> SessionBuilder<B, P, R>
where
    B: CheckoutBackend,
    P: PaymentProcessor,
    R: RateSource,
{
    pub fn new(db: B, processor: P, rates: Arc<RateResolver<R>>, urls: CheckoutUrls) -> Self {
        Self { db, processor, rates, urls }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn rates(&self) -> &RateResolver<R> {
        &self.rates
    }

    pub async fn build_session(&self, request: CheckoutRequest) -> Result<CheckoutSession, CheckoutError> {
        let currency = match request.currency.as_deref() {
            None => CurrencyCode::base(),
            Some(code) => code.parse::<CurrencyCode>().map_err(|e| CheckoutError::InvalidCurrency(e.0))?,
        };
        if request.lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let multiplier = self.rates.get_multiplier(&currency).await?;
        debug!("🛒️ Building a {currency} session for {} lines at multiplier {multiplier}", request.lines.len());
        let validated = self.validate_lines(&request.lines, &currency).await?;
        let resolved = self.price_lines(validated, &currency, multiplier).await?;
        let session = self.submit(&resolved, &currency, request).await?;
        info!("🛒️ Checkout session {} created for {} lines in {currency}", session.session_id, resolved.len());
        Ok(session)
    }

    /// Checks every line without writing anything. Fails on the first bad line, in submission order.
    async fn validate_lines(
        &self,
        lines: &[CartLine],
        currency: &CurrencyCode,
    ) -> Result<Vec<ValidatedLine>, CheckoutError> {
        let mut requested = HashMap::<String, i64>::new();
        let mut result = Vec::with_capacity(lines.len());
        for line in lines {
            let product_ref = line.product_ref.trim();
            let product = self
                .db
                .fetch_product(product_ref)
                .await?
                .ok_or_else(|| CheckoutError::ProductNotFound(line.product_ref.clone()))?;
            let quantity = u32::try_from(line.quantity).ok().filter(|q| *q > 0).ok_or_else(|| {
                CheckoutError::InvalidQuantity { product: product.slug.clone(), quantity: line.quantity }
            })?;
            if !product.is_available {
                return Err(CheckoutError::Unavailable {
                    product: product.slug.clone(),
                    reason: "It is not currently for sale.".into(),
                });
            }
            let total = requested.entry(product.id.clone()).or_default();
            *total += i64::from(quantity);
            if let Some(stock) = product.stock_quantity {
                if *total > stock {
                    return Err(CheckoutError::Unavailable {
                        product: product.slug.clone(),
                        reason: format!("Only {} left in stock, but {} were requested.", stock.max(0), *total),
                    });
                }
            }
            let price = product.sale_price().ok_or_else(|| CheckoutError::InvalidPrice(product.slug.clone()))?;
            let mapping = self.db.fetch_mapping(&product.id, currency).await?;
            trace!("🛒️ '{}' x{quantity} is valid. Existing mapping: {}", product.slug, mapping.is_some());
            result.push(ValidatedLine { product, quantity, price, mapping });
        }
        Ok(result)
    }

    /// Assigns a processor price to every line, minting new ones where needed, and persists the new mappings only
    /// once every line has been priced.
    async fn price_lines(
        &self,
        lines: Vec<ValidatedLine>,
        currency: &CurrencyCode,
        multiplier: Decimal,
    ) -> Result<Vec<ResolvedLineItem>, CheckoutError> {
        let mut minted = HashMap::<String, NewPriceMapping>::new();
        let mut resolved = Vec::with_capacity(lines.len());
        for line in lines {
            let existing = line
                .mapping
                .as_ref()
                .map(|m| (m.processor_price_id.clone(), m.unit_amount))
                .or_else(|| minted.get(&line.product.id).map(|m| (m.processor_price_id.clone(), m.unit_amount)));
            let (processor_price_id, unit_amount) = match existing {
                Some(price) => price,
                None => {
                    let mapping = self.mint_price(&line, currency, multiplier).await?;
                    let price = (mapping.processor_price_id.clone(), mapping.unit_amount);
                    minted.insert(line.product.id.clone(), mapping);
                    price
                },
            };
            resolved.push(ResolvedLineItem {
                product_id: line.product.id,
                unit_amount,
                quantity: line.quantity,
                currency: currency.clone(),
                processor_price_id,
            });
        }
        for (product_id, mapping) in minted {
            let minted_id = mapping.processor_price_id.clone();
            let stored = self.db.upsert_mapping(mapping).await?;
            if stored.processor_price_id != minted_id {
                debug!(
                    "🛒️ A concurrent checkout already mapped {product_id} in {currency} to {}. Using it instead of \
                     {minted_id}",
                    stored.processor_price_id
                );
                for item in resolved.iter_mut().filter(|i| i.product_id == product_id) {
                    item.processor_price_id = stored.processor_price_id.clone();
                    item.unit_amount = stored.unit_amount;
                }
            }
        }
        Ok(resolved)
    }

    async fn mint_price(
        &self,
        line: &ValidatedLine,
        currency: &CurrencyCode,
        multiplier: Decimal,
    ) -> Result<NewPriceMapping, CheckoutError> {
        let product = &line.product;
        let unit_amount = to_minor_units(line.price, multiplier, currency)
            .filter(MinorUnits::is_positive)
            .ok_or_else(|| CheckoutError::InvalidPrice(product.slug.clone()))?;
        let new_price = NewProcessorPrice {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            image_url: product.primary_image().and_then(|img| absolute_url(&self.urls.site_url, img)),
            unit_amount,
            currency: currency.clone(),
        };
        let price = self.processor.create_price(&new_price).await.map_err(|e| {
            warn!("🛒️ Could not create a {currency} price for '{}'. {}", product.slug, e.diagnostics());
            CheckoutError::PriceCreationFailed { product: product.slug.clone(), message: e.public_message() }
        })?;
        debug!("🛒️ Minted price {} for '{}' at {}", price.id, product.slug, unit_amount.display_in(currency));
        Ok(NewPriceMapping {
            product_id: product.id.clone(),
            currency: currency.clone(),
            processor_price_id: price.id,
            unit_amount,
        })
    }

    async fn submit(
        &self,
        resolved: &[ResolvedLineItem],
        currency: &CurrencyCode,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, CheckoutError> {
        let item_count: u64 = resolved.iter().map(|l| u64::from(l.quantity)).sum();
        let mut metadata = clamp_metadata(request.metadata);
        metadata.insert(SESSION_REF_METADATA_KEY.to_string(), new_session_ref());
        metadata.insert(ITEM_COUNT_METADATA_KEY.to_string(), item_count.to_string());
        let session = NewProcessorSession {
            lines: resolved
                .iter()
                .map(|l| SessionLine { processor_price_id: l.processor_price_id.clone(), quantity: l.quantity })
                .collect(),
            currency: currency.clone(),
            success_url: request.success_url.unwrap_or_else(|| self.urls.success_url.clone()),
            cancel_url: request.cancel_url.unwrap_or_else(|| self.urls.cancel_url.clone()),
            metadata,
        };
        let session = self.processor.create_checkout_session(&session).await.map_err(|e| {
            error!("🛒️ The processor rejected the checkout session. {}", e.diagnostics());
            CheckoutError::ProcessorError(e.public_message())
        })?;
        Ok(CheckoutSession { session_id: session.id, redirect_url: session.redirect_url })
    }
}
