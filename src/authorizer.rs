//! Download authorizer - the single gate deciding whether a download
//! redirect may be issued.
//!
//! Two independent state machines meet here: the payment side
//! (NoRecord -> Paid, driven by the verifier) and the fulfillment side
//! (Requested -> Fulfilled -> Delivered, driven by admins). Nothing
//! synchronizes them; their union is computed on demand, per request.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::{msg, AppError, OptionExt, Result};
use crate::ledger;
use crate::models::{FulfilledRequest, FulfillmentId};
use crate::util::normalize_email;

/// Decide whether `email` may download `book_id` and resolve the artifact.
///
/// Grants iff the ledger confirms a paid payment for the pair, OR the
/// fulfillment with that id belongs to the claimed email (self-owned
/// content needs no payment). Either failure collapses into the same
/// opaque `AccessDenied` - the denial must not reveal whether the book
/// exists, whether anyone paid, or whether the email is recognized.
///
/// A granted request whose record lacks a download URL is a distinct
/// `NotFound`: authorization succeeded, delivery is simply not available.
pub fn authorize(
    conn: &Connection,
    email: &str,
    book_id: &FulfillmentId,
) -> Result<FulfilledRequest> {
    if email.trim().is_empty() || book_id.as_str().trim().is_empty() {
        return Err(AppError::BadRequest(msg::MISSING_EMAIL_OR_BOOK_ID.into()));
    }

    let paid = ledger::is_entitled(conn, email, book_id)?;
    let owned =
        queries::get_fulfilled_by_id_and_email(conn, book_id, &normalize_email(email))?.is_some();

    if !paid && !owned {
        return Err(AppError::AccessDenied);
    }

    let book = queries::get_fulfilled_by_id(conn, book_id)
        .or_not_found(msg::DOWNLOAD_NOT_AVAILABLE)?;
    if book.download_url.trim().is_empty() {
        return Err(AppError::NotFound(msg::DOWNLOAD_NOT_AVAILABLE.into()));
    }
    Ok(book)
}
