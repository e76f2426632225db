//! Bindery - book-request fulfillment and payment-gated downloads
//!
//! This library provides the core functionality for the Bindery service:
//! the entitlement ledger, fulfillment registry, download authorizer, and
//! the PayPal payment verifier, plus the database layer and API handlers.

pub mod authorizer;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod fulfillment;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod payments;
pub mod util;
