use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use checkout_engine::{
    CheckoutUrls,
    Clock,
    OrderReconciler,
    RateCache,
    RateResolver,
    SessionBuilder,
    SqliteDatabase,
    SystemClock,
};
use log::*;
use stripe_tools::StripeApi;

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::{EmailNotifier, ErApiRates, StripeProcessor},
    routes::{health, json_config, CheckoutRoute, CurrenciesRoute, StripeWebhookRoute},
};

pub type StoreSessionBuilder = SessionBuilder<SqliteDatabase, StripeProcessor, ErApiRates>;
pub type StoreReconciler = OrderReconciler<SqliteDatabase, StripeProcessor, EmailNotifier>;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(format!("Migrations failed. {e}")))?;
    info!("🗃️ Database at {} is ready", db.url());
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let stripe = StripeApi::new(config.stripe.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let processor = StripeProcessor::new(stripe);
    let rate_source = ErApiRates::new(&config.rates.url)?;
    // One rate cache for every worker
    let rates =
        Arc::new(RateResolver::new(rate_source, RateCache::default(), Arc::clone(&clock)).with_ttl(config.rates.ttl));
    let notifier = config.email.clone().map(EmailNotifier::new).transpose()?;
    let urls = CheckoutUrls::for_site(&config.site_url);
    let sessions: web::Data<StoreSessionBuilder> =
        web::Data::new(SessionBuilder::new(db.clone(), processor.clone(), Arc::clone(&rates), urls));
    let reconciler: web::Data<StoreReconciler> = web::Data::new(OrderReconciler::new(
        db,
        processor,
        notifier,
        config.stripe.webhook_secret.clone(),
        clock,
    ));
    let rates = web::Data::from(rates);
    let options = web::Data::new(ServerOptions::from_config(&config));
    let srv = HttpServer::new(move || {
        let api_scope = web::scope("/api")
            .service(CheckoutRoute::<SqliteDatabase, StripeProcessor, ErApiRates>::new())
            .service(CurrenciesRoute::<ErApiRates>::new());
        let webhook_scope = web::scope("/webhook")
            .service(StripeWebhookRoute::<SqliteDatabase, StripeProcessor, EmailNotifier>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("storefront::access_log"))
            .app_data(json_config())
            .app_data(sessions.clone())
            .app_data(reconciler.clone())
            .app_data(rates.clone())
            .app_data(options.clone())
            .service(health)
            .service(api_scope)
            .service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
