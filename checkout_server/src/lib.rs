//! # Storefront checkout server
//! This crate hosts the HTTP front end of the storefront checkout. It is responsible for:
//! * Turning shoppers' carts into hosted payment sessions.
//! * Receiving signed payment events from the processor and recording the resulting orders.
//! * Telling the storefront which currencies it can currently settle in.
//!
//! The business rules live in `checkout_engine`; this crate wires the engine to SQLite, Stripe, the exchange-rate feed
//! and the e-mail provider (see [integrations](integrations/index.html)).
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /api/checkout`: Creates a checkout session for a cart.
//! * `GET /api/currencies`: Lists the supported settlement currencies.
//! * `POST /webhook/stripe`: Receives payment events from Stripe.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
