//! Payment-completed event → persisted order.
//!
//! Every session moves through `Unseen → Reconciling → Persisted`. The processor may deliver the same event any number
//! of times, possibly concurrently, so:
//!
//! * the order's unique external session id is the idempotency key. An existing order short-circuits the whole flow,
//!   and a unique-constraint violation on insert means another delivery won the race. Neither is an error.
//! * the event is acknowledged as soon as the order row exists. Line items, the stock decrement and the confirmation
//!   e-mail are best-effort from that point on; failures are logged and never cause a redelivery, which would be
//!   short-circuited anyway.
//!
//! Failures before the order row exists are either fatal (bad signature, malformed event), or retryable (line items
//! could not be listed, storage failed).
use std::{fmt::Debug, sync::Arc};

use log::*;
use storefront_common::{CurrencyCode, MinorUnits, Secret};
use uuid::Uuid;

use crate::{
    checkout_api::{
        errors::ReconcileError,
        line_items::{LineItemSource, MetadataSnapshot, ProcessorLineItems, PurchasedItem},
    },
    db_types::{NewOrder, NewOrderItem, Order, OrderItem},
    helpers::{verify_event_signature, Clock, SIGNATURE_TOLERANCE_SECS},
    processor_types::{CompletedSession, PaymentEvent},
    traits::{InsertOrderResult, Notifier, OrderConfirmation, PaymentProcessor, ReconcileBackend},
};

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// A new order was written.
    Persisted { order: Order, items: Vec<OrderItem> },
    /// An order for this session already exists. Nothing was written.
    Duplicate(String),
    /// The session completed but is still waiting for a delayed payment method. A later event will persist it.
    AwaitingPayment(String),
    /// The event is not one the reconciler handles.
    Ignored(String),
}

/// A line item whose product reference has been matched against the catalog, where possible.
struct ResolvedItem {
    item: NewOrderItem,
    in_catalog: bool,
}

pub struct OrderReconciler<B, P, N> {
    db: B,
    processor: P,
    notifier: Option<N>,
    webhook_secret: Secret<String>,
    clock: Arc<dyn Clock>,
    tolerance_secs: i64,
}

impl<B, P, N> Debug for OrderReconciler<B, P, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderReconciler(notifications: {})", self.notifier.is_some())
    }
}

impl<B, P, N> OrderReconciler<B, P, N>
where
    B: ReconcileBackend,
    P: PaymentProcessor,
    N: Notifier,
{
    pub fn new(
        db: B,
        processor: P,
        notifier: Option<N>,
        webhook_secret: Secret<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { db, processor, notifier, webhook_secret, clock, tolerance_secs: SIGNATURE_TOLERANCE_SECS }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Verifies and reconciles a raw webhook delivery.
    pub async fn reconcile(&self, payload: &[u8], signature_header: &str) -> Result<ReconcileOutcome, ReconcileError> {
        verify_event_signature(
            payload,
            signature_header,
            self.webhook_secret.reveal(),
            self.clock.now(),
            self.tolerance_secs,
        )
        .map_err(|e| {
            warn!("🧾️ Rejecting webhook delivery. {e}");
            ReconcileError::from(e)
        })?;
        let event = serde_json::from_slice::<PaymentEvent>(payload).map_err(|e| {
            error!("🧾️ A correctly signed event could not be parsed. {e}");
            ReconcileError::MalformedEvent(e.to_string())
        })?;
        self.reconcile_event(event).await
    }

    /// Reconciles an event whose signature has already been checked.
    pub async fn reconcile_event(&self, event: PaymentEvent) -> Result<ReconcileOutcome, ReconcileError> {
        trace!("🧾️ Received event {} ({})", event.id, event.event_type);
        if !event.is_session_completion() {
            debug!("🧾️ Ignoring event {} of type {}", event.id, event.event_type);
            return Ok(ReconcileOutcome::Ignored(event.event_type));
        }
        let session = event.data.object;
        let session_id = session.id.clone().filter(|id| !id.trim().is_empty()).ok_or_else(|| {
            error!("🧾️ Event {} has no session id", event.id);
            ReconcileError::MalformedEvent(format!("Event {} has no session id", event.id))
        })?;
        if session.is_unpaid() {
            info!("🧾️ Session {session_id} completed but payment is still pending. Waiting for the payment event.");
            return Ok(ReconcileOutcome::AwaitingPayment(session_id));
        }
        if let Some(order) = self.db.fetch_order_by_session_id(&session_id).await? {
            info!("🧾️ Session {session_id} was already reconciled as order #{}. Nothing to do.", order.id);
            return Ok(ReconcileOutcome::Duplicate(session_id));
        }
        let new_order = new_order_from_session(&session_id, &session)?;
        let currency = new_order.currency.clone();
        let purchased = match MetadataSnapshot::from_metadata(&session.metadata) {
            Some(snapshot) => snapshot.line_items(&session_id).await?,
            None => ProcessorLineItems::new(&self.processor).line_items(&session_id).await?,
        };
        let Some(order) = self.insert_order(new_order).await? else {
            info!("🧾️ Another delivery persisted session {session_id} first. Nothing to do.");
            return Ok(ReconcileOutcome::Duplicate(session_id));
        };
        info!("🧾️ Persisted {order} for session {session_id}");

        let resolved = self.resolve_items(purchased, &currency).await;
        let new_items = resolved.iter().map(|r| r.item.clone()).collect::<Vec<_>>();
        let items = match self.db.insert_order_items(order.id, &new_items).await {
            Ok(items) => items,
            Err(e) => {
                error!("🧾️ Could not store the {} items of order #{}. {e}", new_items.len(), order.id);
                vec![]
            },
        };
        self.decrement_stock(&resolved).await;
        let order = self.send_confirmation(order, &items, session.payer_email()).await;
        Ok(ReconcileOutcome::Persisted { order, items })
    }

    /// Inserts the order, retrying once without the offending column if the schema turns out to be missing one.
    /// Returns `None` if another writer got there first.
    async fn insert_order(&self, mut order: NewOrder) -> Result<Option<Order>, ReconcileError> {
        let field = match self.try_insert_order(&order).await? {
            InsertOrderResult::Inserted(order) => return Ok(Some(order)),
            InsertOrderResult::AlreadyExists(_) => return Ok(None),
            InsertOrderResult::SchemaDriftDetected(field) => field,
        };
        warn!("🧾️ The orders table has no '{field}' column. Retrying the insert without it.");
        order.strip(field);
        match self.try_insert_order(&order).await? {
            InsertOrderResult::Inserted(order) => Ok(Some(order)),
            InsertOrderResult::AlreadyExists(_) => Ok(None),
            InsertOrderResult::SchemaDriftDetected(again) => {
                error!(
                    "🧾️ The order for session {} still failed after dropping '{field}'. Now '{again}' is missing too.",
                    order.external_session_id
                );
                let message = format!("Schema drift on '{again}' persisted after dropping '{field}'");
                Err(ReconcileError::Persistence(message))
            },
        }
    }

    async fn try_insert_order(&self, order: &NewOrder) -> Result<InsertOrderResult, ReconcileError> {
        self.db.insert_order(order.clone()).await.map_err(|e| {
            error!("🧾️ Could not insert the order for session {}. {e}", order.external_session_id);
            ReconcileError::from(e)
        })
    }

    /// Matches every purchased item to a catalog product. Internal ids are taken at face value, anything else is tried
    /// as a slug, and references that match nothing are kept verbatim.
    async fn resolve_items(&self, purchased: Vec<PurchasedItem>, currency: &CurrencyCode) -> Vec<ResolvedItem> {
        let mut result = Vec::with_capacity(purchased.len());
        for p in purchased {
            let product_ref = p.product_ref.trim().to_string();
            let (product_id, catalog_name, in_catalog) = if Uuid::parse_str(&product_ref).is_ok() {
                let name = match p.product_name {
                    Some(_) => None,
                    None => self.db.fetch_product(&product_ref).await.ok().flatten().map(|prod| prod.name),
                };
                (product_ref.clone(), name, true)
            } else {
                match self.db.fetch_product_by_slug(&product_ref).await {
                    Ok(Some(product)) => (product.id, Some(product.name), true),
                    Ok(None) => {
                        debug!("🧾️ '{product_ref}' is not in the catalog. Storing the raw reference.");
                        (product_ref.clone(), None, false)
                    },
                    Err(e) => {
                        warn!("🧾️ Could not look up '{product_ref}'. Storing the raw reference. {e}");
                        (product_ref.clone(), None, false)
                    },
                }
            };
            let product_name = p.product_name.or(catalog_name).unwrap_or_else(|| product_ref.clone());
            let item = NewOrderItem {
                product_id,
                product_name,
                unit_amount: p.unit_amount,
                quantity: p.quantity,
                currency: currency.clone(),
            };
            result.push(ResolvedItem { item, in_catalog });
        }
        result
    }

    async fn decrement_stock(&self, items: &[ResolvedItem]) {
        for r in items.iter().filter(|r| r.in_catalog && r.item.quantity > 0) {
            match self.db.decrement_stock(&r.item.product_id, r.item.quantity).await {
                Ok(Some(stock)) => debug!("🧾️ Stock for {} is now {stock}", r.item.product_id),
                Ok(None) => trace!("🧾️ {} does not track stock", r.item.product_id),
                Err(e) => warn!("🧾️ Could not decrement the stock of {}. {e}", r.item.product_id),
            }
        }
    }

    /// Sends the confirmation, if there is someone to send it to and a way to send it, and records the receipt.
    /// Returns the order as it stands afterwards.
    async fn send_confirmation(&self, order: Order, items: &[OrderItem], email: Option<&str>) -> Order {
        let (Some(notifier), Some(recipient)) = (self.notifier.as_ref(), email) else {
            debug!("🧾️ No confirmation sent for order #{}. Notifier or payer e-mail missing.", order.id);
            return order;
        };
        let confirmation = OrderConfirmation { recipient: recipient.to_string(), order, items: items.to_vec() };
        let order = confirmation.order.clone();
        match notifier.send_confirmation(&confirmation).await {
            Ok(receipt) => match self.db.attach_notification_receipt(order.id, &receipt.0).await {
                Ok(updated) => {
                    debug!("🧾️ Confirmation for order #{} sent. Receipt {receipt}", order.id);
                    updated
                },
                Err(e) => {
                    warn!("🧾️ Confirmation {receipt} was sent, but could not be recorded on order #{}. {e}", order.id);
                    order
                },
            },
            Err(e) => {
                warn!("🧾️ Could not send the confirmation for order #{}. {e}", order.id);
                order
            },
        }
    }
}

fn new_order_from_session(session_id: &str, session: &CompletedSession) -> Result<NewOrder, ReconcileError> {
    let currency = session
        .currency
        .as_deref()
        .ok_or_else(|| ReconcileError::MalformedEvent(format!("Session {session_id} has no currency")))?
        .parse::<CurrencyCode>()
        .map_err(|e| ReconcileError::MalformedEvent(e.to_string()))?;
    let amount_total = session
        .amount_total
        .ok_or_else(|| ReconcileError::MalformedEvent(format!("Session {session_id} has no amount total")))?;
    let metadata = if session.metadata.is_empty() {
        None
    } else {
        serde_json::to_value(&session.metadata).ok()
    };
    Ok(NewOrder {
        external_session_id: session_id.to_string(),
        amount_total: MinorUnits::from(amount_total),
        currency,
        customer_email: session.payer_email().map(String::from),
        payment_status: session.payment_status.clone(),
        metadata,
    })
}
