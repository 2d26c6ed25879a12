use std::env;

use checkout_engine::checkout_api::rate_resolver::DEFAULT_RATE_TTL_SECS;
use chrono::Duration;
use log::*;
use storefront_common::{helpers::parse_boolean_flag, Secret};
use stripe_tools::StripeConfig;

const DEFAULT_SHOP_HOST: &str = "127.0.0.1";
const DEFAULT_SHOP_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/storefront.db";
const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const DEFAULT_RATES_URL: &str = "https://open.er-api.com/v6/latest";
const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com/emails";
const DEFAULT_EMAIL_FROM: &str = "orders@localhost";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The public storefront. Redirect URLs and relative product image paths are resolved against it.
    pub site_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    pub stripe: StripeConfig,
    pub rates: RatesConfig,
    /// Order confirmations are only sent when this is present.
    pub email: Option<EmailConfig>,
}

#[derive(Clone, Debug)]
pub struct RatesConfig {
    pub url: String,
    pub ttl: Duration,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self { url: DEFAULT_RATES_URL.to_string(), ttl: Duration::seconds(DEFAULT_RATE_TTL_SECS) }
    }
}

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
    pub from: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SHOP_HOST.to_string(),
            port: DEFAULT_SHOP_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            use_x_forwarded_for: false,
            stripe: StripeConfig::default(),
            rates: RatesConfig::default(),
            email: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SHOP_HOST").ok().unwrap_or_else(|| DEFAULT_SHOP_HOST.into());
        let port = env::var("SHOP_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for SHOP_PORT. {e} Using the default, {DEFAULT_SHOP_PORT}.");
                    DEFAULT_SHOP_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SHOP_PORT);
        let database_url = env::var("SHOP_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SHOP_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let site_url = env::var("SHOP_SITE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .ok()
            .unwrap_or_else(|| {
                warn!("🪛️ SHOP_SITE_URL is not set. Shoppers will be redirected to {DEFAULT_SITE_URL}.");
                DEFAULT_SITE_URL.to_string()
            });
        let use_x_forwarded_for = parse_boolean_flag(env::var("SHOP_USE_X_FORWARDED_FOR").ok(), false);
        let stripe = StripeConfig::new_from_env_or_default();
        let rates = RatesConfig::from_env_or_default();
        let email = EmailConfig::from_env();
        Self { host, port, database_url, site_url, use_x_forwarded_for, stripe, rates, email }
    }
}

impl RatesConfig {
    pub fn from_env_or_default() -> Self {
        let url = env::var("SHOP_RATES_URL").ok().unwrap_or_else(|| {
            info!("🪛️ SHOP_RATES_URL is not set. Using {DEFAULT_RATES_URL}.");
            DEFAULT_RATES_URL.to_string()
        });
        let ttl = env::var("SHOP_RATES_TTL_SECS")
            .map_err(|_| {
                info!("🪛️ SHOP_RATES_TTL_SECS is not set. Using the default value of {DEFAULT_RATE_TTL_SECS}s.")
            })
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for SHOP_RATES_TTL_SECS. {e}"))
                    .and_then(|secs| {
                        if secs > 0 {
                            Ok(Duration::seconds(secs))
                        } else {
                            warn!("🪛️ SHOP_RATES_TTL_SECS must be positive. Ignoring {secs}.");
                            Err(())
                        }
                    })
            })
            .ok()
            .unwrap_or_else(|| Duration::seconds(DEFAULT_RATE_TTL_SECS));
        Self { url, ttl }
    }
}

impl EmailConfig {
    /// Returns `None`, disabling confirmations, unless `SHOP_EMAIL_API_KEY` holds a value.
    pub fn from_env() -> Option<Self> {
        let api_key = Secret::new(env::var("SHOP_EMAIL_API_KEY").unwrap_or_default());
        if !api_key.is_set() {
            info!("🪛️ SHOP_EMAIL_API_KEY is not set. Order confirmation e-mails are disabled.");
            return None;
        }
        let api_url = env::var("SHOP_EMAIL_API_URL").ok().unwrap_or_else(|| DEFAULT_EMAIL_API_URL.to_string());
        let from = env::var("SHOP_EMAIL_FROM").ok().unwrap_or_else(|| {
            warn!("🪛️ SHOP_EMAIL_FROM is not set. Confirmations will be sent from {DEFAULT_EMAIL_FROM}.");
            DEFAULT_EMAIL_FROM.to_string()
        });
        Some(Self { api_url, api_key, from })
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that request handlers need. Secrets are excluded so that they are
/// not passed around the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for }
    }
}
