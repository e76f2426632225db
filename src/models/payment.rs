use serde::{Deserialize, Serialize};

use crate::models::FulfillmentId;

/// Payment status. "paid" is the only value ever written; rows imported
/// from before the status column existed have no status at all and are
/// treated as implicitly paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}

/// A receipt of funds for one `FulfilledRequest`. Written exclusively by
/// the payment verifier after a confirmed capture; never updated or
/// deleted. At most one per (email, bookId) - webhook delivery is
/// at-least-once and the insert is idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    /// Payer email, stored lowercase
    pub email: String,
    /// Soft reference to a FulfilledRequest id - not validated at write time
    pub book_id: FulfillmentId,
    pub paid_at: i64,
    /// None on legacy rows, which count as paid
    pub status: Option<PaymentStatus>,
}

impl Payment {
    /// Legacy rows without a status are implicitly paid.
    pub fn is_paid(&self) -> bool {
        matches!(self.status, Some(PaymentStatus::Paid) | None)
    }
}
