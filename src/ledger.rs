//! Entitlement ledger - the record of truth for "has this email paid for
//! this book".
//!
//! Emails are normalized to lowercase at this boundary, never by callers.
//! Inserts are idempotent because PayPal delivers webhooks at-least-once;
//! a duplicate delivery is the expected steady state, not an error. The
//! check-then-insert race can at worst leave a harmless extra row - any
//! matching row is sufficient for entitlement, so correctness holds.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::Result;
use crate::models::{FulfillmentId, Payment};
use crate::util::normalize_email;

/// Outcome of `record_payment`, distinguishing a fresh insert from an
/// absorbed duplicate (both are success).
#[derive(Debug)]
pub enum RecordOutcome {
    Recorded(Payment),
    AlreadyRecorded(Payment),
}

impl RecordOutcome {
    pub fn payment(&self) -> &Payment {
        match self {
            RecordOutcome::Recorded(p) | RecordOutcome::AlreadyRecorded(p) => p,
        }
    }
}

/// Record a confirmed payment for (email, bookId). Idempotent: if a
/// payment already exists for the normalized pair, returns it unchanged.
///
/// The bookId is stored as an opaque string and is deliberately not
/// validated against the fulfillment registry at write time.
pub fn record_payment(
    conn: &Connection,
    email: &str,
    book_id: &FulfillmentId,
) -> Result<RecordOutcome> {
    let email = normalize_email(email);

    if let Some(existing) = queries::find_payment(conn, &email, book_id)? {
        tracing::info!("Payment already exists: {} {}", email, book_id);
        return Ok(RecordOutcome::AlreadyRecorded(existing));
    }

    let payment = queries::create_payment(conn, &email, book_id)?;
    tracing::info!("Payment saved: {} {}", email, book_id);
    Ok(RecordOutcome::Recorded(payment))
}

/// True iff a paid payment exists for the normalized email and bookId.
/// Absence of any matching record is `false`, never an error.
pub fn is_entitled(conn: &Connection, email: &str, book_id: &FulfillmentId) -> Result<bool> {
    let email = normalize_email(email);
    Ok(queries::find_paid_payment(conn, &email, book_id)?.is_some())
}

/// All paid payments for the normalized email, most recent first.
pub fn list_entitlements(conn: &Connection, email: &str) -> Result<Vec<Payment>> {
    let email = normalize_email(email);
    queries::list_paid_payments_by_email(conn, &email)
}
