use storefront_common::{CurrencyCode, CurrencyCodeError};
use thiserror::Error;

use crate::{
    helpers::EventSignatureError,
    traits::{CatalogError, OrderStoreError, PriceMappingError},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    #[error("'{0}' is not a valid currency code")]
    InvalidCurrency(String),
    #[error("No exchange rate is available for {0}")]
    NotAvailable(CurrencyCode),
}

impl From<CurrencyCodeError> for RateError {
    fn from(e: CurrencyCodeError) -> Self {
        Self::InvalidCurrency(e.0)
    }
}

/// Broad categories of checkout failure, used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutErrorKind {
    Validation,
    NotFound,
    Unavailable,
    UnsupportedCurrency,
    Processor,
    Internal,
}

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("The cart is empty.")]
    EmptyCart,
    #[error("'{0}' is not a valid currency code.")]
    InvalidCurrency(String),
    #[error("Quantity {quantity} for '{product}' is not a positive whole number.")]
    InvalidQuantity { product: String, quantity: i64 },
    #[error("{0} is not a supported currency.")]
    UnsupportedCurrency(CurrencyCode),
    #[error("Product '{0}' was not found.")]
    ProductNotFound(String),
    #[error("'{product}' is unavailable. {reason}")]
    Unavailable { product: String, reason: String },
    #[error("'{0}' does not have a valid price.")]
    InvalidPrice(String),
    #[error("A price for '{product}' could not be created. {message}")]
    PriceCreationFailed { product: String, message: String },
    #[error("{0}")]
    ProcessorError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl CheckoutError {
    pub fn kind(&self) -> CheckoutErrorKind {
        match self {
            Self::EmptyCart | Self::InvalidCurrency(_) | Self::InvalidQuantity { .. } | Self::InvalidPrice(_) => {
                CheckoutErrorKind::Validation
            },
            Self::ProductNotFound(_) => CheckoutErrorKind::NotFound,
            Self::Unavailable { .. } => CheckoutErrorKind::Unavailable,
            Self::UnsupportedCurrency(_) => CheckoutErrorKind::UnsupportedCurrency,
            Self::PriceCreationFailed { .. } | Self::ProcessorError(_) => CheckoutErrorKind::Processor,
            Self::DatabaseError(_) => CheckoutErrorKind::Internal,
        }
    }
}

impl From<CatalogError> for CheckoutError {
    fn from(e: CatalogError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

impl From<PriceMappingError> for CheckoutError {
    fn from(e: PriceMappingError) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

impl From<RateError> for CheckoutError {
    fn from(e: RateError) -> Self {
        match e {
            RateError::InvalidCurrency(s) => Self::InvalidCurrency(s),
            RateError::NotAvailable(c) => Self::UnsupportedCurrency(c),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    #[error("Invalid event signature. {0}")]
    InvalidSignature(#[from] EventSignatureError),
    #[error("Malformed event. {0}")]
    MalformedEvent(String),
    #[error("Could not determine the line items for session {session_id}. {reason}")]
    LineItemsUnavailable { session_id: String, reason: String },
    #[error("Could not persist the order. {0}")]
    Persistence(String),
}

impl ReconcileError {
    /// Whether the processor should deliver the event again. Signature and parse failures will never succeed on a
    /// retry; everything else might.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LineItemsUnavailable { .. } | Self::Persistence(_))
    }
}

impl From<OrderStoreError> for ReconcileError {
    fn from(e: OrderStoreError) -> Self {
        Self::Persistence(e.to_string())
    }
}
