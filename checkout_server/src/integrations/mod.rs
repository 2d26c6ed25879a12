//! HTTP implementations of the engine's external collaborators.
pub mod email;
pub mod rates;
pub mod stripe;

pub use email::EmailNotifier;
pub use rates::ErApiRates;
pub use stripe::StripeProcessor;
