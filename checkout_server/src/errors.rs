use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use checkout_engine::{CheckoutError, CheckoutErrorKind};
use log::error;
use thiserror::Error;

use crate::data_objects::ErrorBody;

const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong on our side. Please try again.";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    /// A checkout could not be created. `supported_currencies` is filled in when the shopper asked for a currency
    /// the store cannot settle in, so the storefront can offer alternatives.
    #[error("{error}")]
    CheckoutFailed { error: CheckoutError, supported_currencies: Option<Vec<String>> },
}

impl From<CheckoutError> for ServerError {
    fn from(error: CheckoutError) -> Self {
        Self::CheckoutFailed { error, supported_currencies: None }
    }
}

impl ServerError {
    /// The short, machine-readable error code placed in the `error` field of the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequestBody(_) => "validation_error",
            Self::CheckoutFailed { error, .. } => match error.kind() {
                CheckoutErrorKind::Validation => "validation_error",
                CheckoutErrorKind::NotFound => "not_found",
                CheckoutErrorKind::Unavailable => "unavailable",
                CheckoutErrorKind::UnsupportedCurrency => "unsupported_currency",
                CheckoutErrorKind::Processor => "processor_error",
                CheckoutErrorKind::Internal => "internal_error",
            },
            _ => "internal_error",
        }
    }

    /// The message shown to the caller. Internal failures never leak their details.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidRequestBody(_) => self.to_string(),
            Self::CheckoutFailed { error, .. } if error.kind() != CheckoutErrorKind::Internal => error.to_string(),
            _ => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::CheckoutFailed { error, .. } => match error.kind() {
                CheckoutErrorKind::Validation => StatusCode::BAD_REQUEST,
                CheckoutErrorKind::NotFound => StatusCode::NOT_FOUND,
                CheckoutErrorKind::Unavailable => StatusCode::CONFLICT,
                CheckoutErrorKind::UnsupportedCurrency => StatusCode::UNPROCESSABLE_ENTITY,
                CheckoutErrorKind::Processor => StatusCode::BAD_GATEWAY,
                CheckoutErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("💻️ Request failed with {status}. {self}");
        }
        let supported_currencies = match self {
            Self::CheckoutFailed { supported_currencies, .. } => supported_currencies.clone(),
            _ => None,
        };
        let body =
            ErrorBody { error: self.code().to_string(), message: Some(self.public_message()), supported_currencies };
        HttpResponse::build(status).json(body)
    }
}
