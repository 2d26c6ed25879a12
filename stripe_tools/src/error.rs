use thiserror::Error;

#[derive(Debug, Error)]
pub enum StripeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Request could not be completed: {0}")]
    RequestError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    /// The API answered with a non-success status. `message` is Stripe's own human-readable explanation and is safe
    /// to show to shoppers; `body` is the raw response and is for logs only.
    #[error("Stripe rejected the request. Error {status}. {message}")]
    Rejected { status: u16, message: String, code: Option<String>, body: String },
}

impl StripeApiError {
    /// The message that may be passed on to untrusted callers.
    pub fn public_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::Initialization(_) | Self::RequestError(_) | Self::JsonError(_) => {
                "The payment processor could not be reached. Please try again.".to_string()
            },
        }
    }
}
