use thiserror::Error;

use crate::processor_types::{
    NewProcessorPrice,
    NewProcessorSession,
    ProcessorLineItem,
    ProcessorPrice,
    ProcessorSession,
};

#[derive(Debug, Clone, Error)]
pub enum ProcessorError {
    /// The processor answered and said no. `message` is the processor's own explanation and is safe to show to a
    /// shopper; `diagnostics` is for the logs only.
    #[error("{message}")]
    Rejected { message: String, diagnostics: String },
    #[error("The payment processor could not be reached. {0}")]
    Unreachable(String),
}

impl ProcessorError {
    pub fn public_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::Unreachable(_) => "The payment processor could not be reached. Please try again.".to_string(),
        }
    }

    pub fn diagnostics(&self) -> &str {
        match self {
            Self::Rejected { diagnostics, .. } => diagnostics,
            Self::Unreachable(details) => details,
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait PaymentProcessor {
    /// Mint a processor-side price object for one unit of the given product in the given currency.
    async fn create_price(&self, price: &NewProcessorPrice) -> Result<ProcessorPrice, ProcessorError>;

    async fn create_checkout_session(&self, session: &NewProcessorSession) -> Result<ProcessorSession, ProcessorError>;

    /// List every line item of a completed session, following pagination to the end.
    async fn list_session_line_items(&self, session_id: &str) -> Result<Vec<ProcessorLineItem>, ProcessorError>;
}
