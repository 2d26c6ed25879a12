use log::*;
use storefront_common::Secret;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    /// Base URL of the API, without a trailing slash. Overridable so tests can point at a local stub.
    pub api_base: String,
    pub secret_key: Secret<String>,
    /// Shared secret used to sign webhook events.
    pub webhook_secret: Secret<String>,
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_base = std::env::var("SHOP_STRIPE_API_BASE")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                debug!("SHOP_STRIPE_API_BASE not set, using {DEFAULT_STRIPE_API_BASE}");
                DEFAULT_STRIPE_API_BASE.to_string()
            });
        let secret_key = Secret::new(std::env::var("SHOP_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("SHOP_STRIPE_SECRET_KEY not set. Checkout sessions cannot be created until it is.");
            String::default()
        }));
        let webhook_secret = Secret::new(std::env::var("SHOP_STRIPE_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("SHOP_STRIPE_WEBHOOK_SECRET not set. Every payment event will fail signature verification.");
            String::default()
        }));
        Self { api_base, secret_key, webhook_secret }
    }
}
