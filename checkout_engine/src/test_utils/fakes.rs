//! Hand-written stand-ins for the external collaborators. Each one records how it was called so that tests can assert
//! on side effects, and can be told to fail.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::{
    helpers::Clock,
    processor_types::{NewProcessorPrice, NewProcessorSession, ProcessorLineItem, ProcessorPrice, ProcessorSession},
    traits::{
        NotificationError,
        NotificationReceipt,
        Notifier,
        OrderConfirmation,
        PaymentProcessor,
        ProcessorError,
        RateSource,
        RateSourceError,
        RateTable,
    },
};

//--------------------------------------      ManualClock     ---------------------------------------------------------
/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at(Utc.timestamp_opt(1_718_000_000, 0).unwrap())
    }
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Arc::new(Mutex::new(now)) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

//--------------------------------------    FakeRateSource    ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct FakeRateSource {
    table: Option<RateTable>,
    calls: Arc<AtomicUsize>,
}

impl FakeRateSource {
    pub fn with_table(table: RateTable) -> Self {
        Self { table: Some(table), calls: Arc::new(AtomicUsize::new(0)) }
    }

    /// A source that is always unreachable.
    pub fn failing() -> Self {
        Self { table: None, calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RateSource for FakeRateSource {
    async fn fetch_rates(&self, base: &storefront_common::CurrencyCode) -> Result<RateTable, RateSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.table {
            Some(table) => Ok(RateTable { base: base.to_string(), rates: table.rates.clone() }),
            None => Err(RateSourceError::Unreachable("connection refused".into())),
        }
    }
}

//--------------------------------------     FakeProcessor    ---------------------------------------------------------
#[derive(Debug, Default)]
struct ProcessorState {
    prices: Vec<NewProcessorPrice>,
    sessions: Vec<NewProcessorSession>,
    line_items: HashMap<String, Vec<ProcessorLineItem>>,
    line_item_calls: usize,
    fail_prices_for: Option<String>,
    fail_sessions: bool,
    fail_line_items: bool,
}

/// A payment processor that mints sequential ids (`price_1`, `cs_1`, ...) and remembers every request.
#[derive(Debug, Clone, Default)]
pub struct FakeProcessor {
    state: Arc<Mutex<ProcessorState>>,
}

impl FakeProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Price creation fails for this product id.
    pub fn fail_prices_for<S: Into<String>>(self, product_id: S) -> Self {
        self.state.lock().unwrap().fail_prices_for = Some(product_id.into());
        self
    }

    pub fn fail_sessions(self) -> Self {
        self.state.lock().unwrap().fail_sessions = true;
        self
    }

    pub fn fail_line_items(&self, fail: bool) {
        self.state.lock().unwrap().fail_line_items = fail;
    }

    pub fn with_line_items<S: Into<String>>(self, session_id: S, items: Vec<ProcessorLineItem>) -> Self {
        self.state.lock().unwrap().line_items.insert(session_id.into(), items);
        self
    }

    pub fn price_calls(&self) -> usize {
        self.state.lock().unwrap().prices.len()
    }

    pub fn prices(&self) -> Vec<NewProcessorPrice> {
        self.state.lock().unwrap().prices.clone()
    }

    pub fn session_calls(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    pub fn last_session(&self) -> Option<NewProcessorSession> {
        self.state.lock().unwrap().sessions.last().cloned()
    }

    pub fn line_item_calls(&self) -> usize {
        self.state.lock().unwrap().line_item_calls
    }
}

impl PaymentProcessor for FakeProcessor {
    async fn create_price(&self, price: &NewProcessorPrice) -> Result<ProcessorPrice, ProcessorError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_prices_for.as_deref() == Some(price.product_id.as_str()) {
            return Err(ProcessorError::Rejected {
                message: "Invalid unit_amount".into(),
                diagnostics: format!("400 price rejected for {}", price.product_id),
            });
        }
        state.prices.push(price.clone());
        Ok(ProcessorPrice { id: format!("price_{}", state.prices.len()) })
    }

    async fn create_checkout_session(&self, session: &NewProcessorSession) -> Result<ProcessorSession, ProcessorError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_sessions {
            return Err(ProcessorError::Rejected {
                message: "Your account cannot currently make live charges.".into(),
                diagnostics: "403 account_invalid req_123".into(),
            });
        }
        state.sessions.push(session.clone());
        let id = format!("cs_{}", state.sessions.len());
        Ok(ProcessorSession { redirect_url: format!("https://checkout.test/pay/{id}"), id })
    }

    async fn list_session_line_items(&self, session_id: &str) -> Result<Vec<ProcessorLineItem>, ProcessorError> {
        let mut state = self.state.lock().unwrap();
        state.line_item_calls += 1;
        if state.fail_line_items {
            return Err(ProcessorError::Unreachable("timed out".into()));
        }
        Ok(state.line_items.get(session_id).cloned().unwrap_or_default())
    }
}

//--------------------------------------     FakeNotifier     ---------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct FakeNotifier {
    sent: Arc<Mutex<Vec<OrderConfirmation>>>,
    fail: bool,
}

impl FakeNotifier {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn sent(&self) -> Vec<OrderConfirmation> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for FakeNotifier {
    async fn send_confirmation(
        &self,
        confirmation: &OrderConfirmation,
    ) -> Result<NotificationReceipt, NotificationError> {
        if self.fail {
            return Err(NotificationError::DeliveryFailed("mailbox unavailable".into()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(confirmation.clone());
        Ok(NotificationReceipt(format!("msg_{}", sent.len())))
    }
}
