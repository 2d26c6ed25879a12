use thiserror::Error;

use crate::traits::{NotificationReceipt, OrderConfirmation};

#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("The notification could not be delivered. {0}")]
    DeliveryFailed(String),
    #[error("The notification provider rejected the message. {0}")]
    Rejected(String),
}

#[allow(async_fn_in_trait)]
pub trait Notifier {
    /// Send an order confirmation to `confirmation.recipient`, returning the provider's receipt id.
    async fn send_confirmation(
        &self,
        confirmation: &OrderConfirmation,
    ) -> Result<NotificationReceipt, NotificationError>;
}
