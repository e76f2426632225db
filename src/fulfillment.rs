//! Fulfillment registry - tracks which requests have been turned into
//! deliverable books and whether delivery has been administratively
//! confirmed.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::Result;
use crate::models::{CreateFulfilledRequest, FulfilledRequest, FulfillmentId};

/// Outcome of `fulfill`: either a fresh record or the pre-existing one for
/// the same (email, title) pair. Admins resubmit the fulfillment form;
/// both cases return the same bookId.
#[derive(Debug)]
pub enum FulfillOutcome {
    Created(FulfilledRequest),
    AlreadyFulfilled(FulfilledRequest),
}

impl FulfillOutcome {
    pub fn record(&self) -> &FulfilledRequest {
        match self {
            FulfillOutcome::Created(r) | FulfillOutcome::AlreadyFulfilled(r) => r,
        }
    }

    pub fn book_id(&self) -> &FulfillmentId {
        &self.record().id
    }
}

/// Create a deliverable record for a request, idempotent by (email, title).
pub fn fulfill(conn: &Connection, input: &CreateFulfilledRequest) -> Result<FulfillOutcome> {
    if let Some(existing) = queries::find_fulfilled_by_email_title(conn, &input.email, &input.title)?
    {
        return Ok(FulfillOutcome::AlreadyFulfilled(existing));
    }

    let record = queries::create_fulfilled_request(conn, input)?;
    tracing::info!("Fulfilled request saved: {} {:?}", record.email, record.title);
    Ok(FulfillOutcome::Created(record))
}

/// Flip the delivered flag on a fulfillment. A miss is not an error, but
/// it means a Payment references a bookId we never fulfilled, so it is
/// surfaced to operators as a warning.
pub fn mark_delivered(conn: &Connection, book_id: &FulfillmentId) -> Result<()> {
    let affected = queries::set_delivered(conn, book_id)?;
    if affected == 0 {
        tracing::warn!(
            "mark_delivered matched no fulfillment for bookId {} - payment/fulfillment mismatch",
            book_id
        );
    } else {
        tracing::info!("Marked book as delivered: {}", book_id);
    }
    Ok(())
}

pub fn get(conn: &Connection, book_id: &FulfillmentId) -> Result<Option<FulfilledRequest>> {
    queries::get_fulfilled_by_id(conn, book_id)
}

/// All fulfillments, newest first.
pub fn list_all(conn: &Connection) -> Result<Vec<FulfilledRequest>> {
    queries::list_fulfilled_requests(conn)
}

/// Batch lookup for the admin reconciliation view.
pub fn list_by_ids(conn: &Connection, ids: &[FulfillmentId]) -> Result<Vec<FulfilledRequest>> {
    queries::list_fulfilled_by_ids(conn, ids)
}
