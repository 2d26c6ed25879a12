//! # Stripe tools
//!
//! A small, typed client for the handful of Stripe REST endpoints the storefront checkout relies on:
//!
//! * Creating products and prices (`/v1/products`, `/v1/prices`), so that each `(product, currency)` pair gets a
//!   reusable processor-side price object.
//! * Creating hosted checkout sessions (`/v1/checkout/sessions`).
//! * Listing the line items the processor recorded for a session, which is how a completed order is reconstructed
//!   when the session metadata doesn't carry the cart.
//!
//! Stripe expects `application/x-www-form-urlencoded` bodies with bracketed keys (`line_items[0][price]`); see
//! [`FormParams`] for the encoder.
mod api;
mod config;
mod error;

pub mod data_objects;
pub mod helpers;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{
    CheckoutSession,
    LineItem,
    NewCheckoutSession,
    NewPrice,
    NewProduct,
    SessionLineItem,
    StripeList,
    StripePrice,
    StripeProduct,
};
pub use error::StripeApiError;
pub use helpers::FormParams;
