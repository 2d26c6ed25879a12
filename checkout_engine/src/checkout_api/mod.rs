//! # Checkout engine public API
//!
//! * [`rate_resolver`] converts the base-currency catalog into the shopper's settlement currency.
//! * [`session_builder`] turns a cart into a priced payment session with the processor.
//! * [`order_reconciler`] turns a signed payment-completed event into a persisted order.
//! * [`line_items`] reconstructs what was bought in a completed session.
//!
//! # API usage
//!
//! As with the storage backends, an API instance is created by handing it the collaborators it needs:
//!
//! ```rust,ignore
//! use checkout_engine::{CheckoutUrls, RateCache, RateResolver, SessionBuilder, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let rates = Arc::new(RateResolver::new(rate_source, RateCache::default(), Arc::new(SystemClock)));
//! let builder = SessionBuilder::new(db, processor, rates, urls);
//! let session = builder.build_session(request).await?;
//! ```
pub mod checkout_objects;
pub mod errors;
pub mod line_items;
pub mod order_reconciler;
pub mod rate_resolver;
pub mod session_builder;
