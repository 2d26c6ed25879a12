//! # Collaborator contracts
//!
//! The checkout engine talks to storage, the payment processor, the exchange-rate feed and the e-mail provider
//! exclusively through the traits in this module.
//!
//! ## Storage
//! * [`Catalog`] is the read side of the product catalog, plus the single catalog write the engine performs: the stock
//!   decrement after a sale.
//! * [`PriceMappings`] remembers which processor-side price object was minted for a `(product, currency)` pair.
//! * [`OrderStore`] persists orders and their line items. The unique external session id on an order is the
//!   idempotency key for payment events.
//!
//! [`crate::SqliteDatabase`] implements all three.
//!
//! ## External services
//! * [`PaymentProcessor`] creates prices and checkout sessions, and lists what a completed session contained.
//! * [`RateSource`] supplies a table of exchange rates against the base currency.
//! * [`Notifier`] sends the order confirmation.
mod catalog;
mod data_objects;
mod notifier;
mod order_store;
mod payment_processor;
mod price_mappings;
mod rate_source;

pub use catalog::{Catalog, CatalogError};
pub use data_objects::{InsertOrderResult, NotificationReceipt, OrderConfirmation, RateTable};
pub use notifier::{NotificationError, Notifier};
pub use order_store::{OrderStore, OrderStoreError};
pub use payment_processor::{PaymentProcessor, ProcessorError};
pub use price_mappings::{PriceMappingError, PriceMappings};
pub use rate_source::{RateSource, RateSourceError};

/// Everything the session builder needs from storage.
pub trait CheckoutBackend: Catalog + PriceMappings {}

impl<T: Catalog + PriceMappings> CheckoutBackend for T {}

/// Everything the order reconciler needs from storage.
pub trait ReconcileBackend: Catalog + OrderStore {}

impl<T: Catalog + OrderStore> ReconcileBackend for T {}
