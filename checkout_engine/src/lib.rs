//! Storefront Checkout Engine
//!
//! This library holds the two pieces of the storefront that have real invariants to protect:
//!
//! 1. **Checkout session building** ([`SessionBuilder`]). A cart is validated line by line against the catalog, each
//!    line is priced in the shopper's settlement currency (converting from the base currency via the
//!    [`RateResolver`] and reusing processor-side price objects through the price mapping store), and a single
//!    payment session is created with the processor. The whole cart succeeds or nothing is created.
//! 2. **Order reconciliation** ([`OrderReconciler`]). Payment-completed events from the processor are verified,
//!    de-duplicated against the session id, and turned into an order with its line items. Stock is adjusted and a
//!    confirmation is sent on a best-effort basis.
//!
//! Storage, the payment processor, the rate source and the notification channel are all reached through the traits
//! in [`mod@traits`]. A SQLite backend ([`SqliteDatabase`]) implements the storage traits; the server crate supplies
//! HTTP implementations of the rest.
pub mod checkout_api;
pub mod db_types;
pub mod helpers;
pub mod processor_types;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use checkout_api::{
    checkout_objects,
    errors::{CheckoutError, CheckoutErrorKind, RateError, ReconcileError},
    order_reconciler::{OrderReconciler, ReconcileOutcome},
    rate_resolver::{RateCache, RateResolver},
    session_builder::{CheckoutUrls, SessionBuilder},
};
pub use helpers::{Clock, SystemClock};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{InsertOrderResult, RateTable};
