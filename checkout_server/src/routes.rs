//! Request handler definitions
//!
//! Define each route and its handler here. Anything more involved than unpacking a request and calling into the
//! engine belongs in `checkout_engine`. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here awaits the database, the payment processor or
//! the rate feed, so they are all async and must stay that way.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use checkout_engine::{
    checkout_objects::CheckoutRequest,
    traits::{CheckoutBackend, Notifier, PaymentProcessor, RateSource, ReconcileBackend},
    CheckoutError,
    OrderReconciler,
    RateResolver,
    ReconcileError,
    ReconcileOutcome,
    SessionBuilder,
};
use log::*;
use storefront_common::BASE_CURRENCY;

use crate::{
    config::ServerOptions,
    data_objects::{CheckoutRequestBody, JsonResponse, SupportedCurrencies},
    errors::ServerError,
    helpers::get_remote_ip,
};

/// The header carrying the processor's event signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------  Checkout  ---------------------------------------------------
route!(checkout => Post "/checkout" impl CheckoutBackend, PaymentProcessor, RateSource);
/// Route handler for `POST /api/checkout`.
///
/// Turns the shopper's cart into a hosted payment session and returns `{ sessionId, redirectUrl }`. When the
/// requested currency cannot be settled in, the error body lists the currencies that can.
pub async fn checkout<B, P, R>(
    body: web::Json<CheckoutRequestBody>,
    api: web::Data<SessionBuilder<B, P, R>>,
) -> Result<HttpResponse, ServerError>
where
    B: CheckoutBackend,
    P: PaymentProcessor,
    R: RateSource,
{
    let request = CheckoutRequest::from(body.into_inner());
    debug!(
        "💻️ POST checkout for {} cart lines in {}",
        request.lines.len(),
        request.currency.as_deref().unwrap_or(BASE_CURRENCY)
    );
    match api.build_session(request).await {
        Ok(session) => Ok(HttpResponse::Ok().json(session)),
        Err(error @ CheckoutError::UnsupportedCurrency(_)) => {
            let supported = api.rates().supported_currencies().await;
            Err(ServerError::CheckoutFailed { error, supported_currencies: Some(supported) })
        },
        Err(e) => Err(e.into()),
    }
}

route!(currencies => Get "/currencies" impl RateSource);
/// Route handler for `GET /api/currencies`. Lists the currencies a checkout can currently settle in.
pub async fn currencies<R: RateSource>(rates: web::Data<RateResolver<R>>) -> HttpResponse {
    trace!("💻️ GET currencies");
    let currencies = rates.supported_currencies().await;
    HttpResponse::Ok().json(SupportedCurrencies { base: BASE_CURRENCY.to_string(), currencies })
}

// ----------------------------------------------  Webhooks  ---------------------------------------------------
route!(stripe_webhook => Post "/stripe" impl ReconcileBackend, PaymentProcessor, Notifier);
/// Route handler for `POST /webhook/stripe`.
///
/// The raw body is passed through untouched, since the signature covers the exact bytes. The response status tells
/// the processor whether to redeliver: anything but a 2xx is retried, so only transient failures answer 500.
pub async fn stripe_webhook<B, P, N>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<OrderReconciler<B, P, N>>,
    options: web::Data<ServerOptions>,
) -> HttpResponse
where
    B: ReconcileBackend,
    P: PaymentProcessor,
    N: Notifier,
{
    let peer = get_remote_ip(&req, options.use_x_forwarded_for).map(|ip| ip.to_string());
    trace!("💻️ Received payment event from {}", peer.as_deref().unwrap_or("unknown peer"));
    let signature = req.headers().get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()).unwrap_or_default();
    match api.reconcile(&body, signature).await {
        Ok(ReconcileOutcome::Persisted { order, items }) => {
            info!("💻️ {order} recorded with {} items", items.len());
            HttpResponse::Ok().json(JsonResponse::success(format!("Order {} recorded.", order.id)))
        },
        Ok(ReconcileOutcome::Duplicate(session_id)) => {
            HttpResponse::Ok().json(JsonResponse::success(format!("Order for {session_id} already recorded.")))
        },
        Ok(ReconcileOutcome::AwaitingPayment(session_id)) => {
            HttpResponse::Ok().json(JsonResponse::success(format!("Session {session_id} is awaiting payment.")))
        },
        Ok(ReconcileOutcome::Ignored(event_type)) => {
            HttpResponse::Ok().json(JsonResponse::success(format!("Ignored {event_type} event.")))
        },
        Err(ReconcileError::InvalidSignature(e)) => {
            warn!("💻️ Rejected payment event from {}. {e}", peer.as_deref().unwrap_or("unknown peer"));
            HttpResponse::BadRequest().json(JsonResponse::failure("Invalid signature."))
        },
        Err(e) if e.is_retryable() => {
            error!("💻️ Could not reconcile payment event. It will be redelivered. {e}");
            HttpResponse::InternalServerError().json(JsonResponse::failure("The order could not be recorded yet."))
        },
        Err(e) => {
            // Redelivering an event that can never be processed only fills the logs
            error!("💻️ Discarding payment event. {e}");
            HttpResponse::Ok().json(JsonResponse::failure("The event could not be processed."))
        },
    }
}

/// Maps JSON body errors onto the standard error body, so malformed checkout requests answer a 400 in the same shape
/// as every other checkout failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into())
}
