//! Tagged identifiers for the two kinds of "book reference" in the system.
//!
//! A `FulfillmentId` is the database-generated identifier of a
//! `FulfilledRequest` - the canonical bookId that `Payment` records key
//! against. A `ProviderOrderId` is PayPal's order identifier and is only
//! meaningful for the order read-back; the verifier must resolve it to a
//! `FulfillmentId` before the ledger ever sees it. Keeping them as distinct
//! types makes mixing the two a compile error instead of a silent
//! entitlement mismatch.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical bookId: identifier of a `FulfilledRequest` record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FulfillmentId(String);

impl FulfillmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FulfillmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for FulfillmentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// PayPal's order identifier, as delivered in webhook supplementary data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderOrderId(String);

impl ProviderOrderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ProviderOrderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
