//! Administrator endpoints: fulfillment, payment listings, and the
//! payment/fulfillment reconciliation view.

use std::collections::HashMap;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, Result};
use crate::extractors::Json;
use crate::fulfillment::{self, FulfillOutcome};
use crate::models::{CreateFulfilledRequest, FulfilledRequest, FulfillmentId, Payment};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FulfillResponse {
    message: &'static str,
    book_id: FulfillmentId,
}

/// Idempotent fulfillment: resubmitting the form for the same
/// (email, title) returns the existing bookId.
async fn fulfill_request(
    State(state): State<AppState>,
    Json(input): Json<CreateFulfilledRequest>,
) -> Result<Json<FulfillResponse>> {
    input.validate()?;
    let conn = state.db.get()?;

    let outcome = fulfillment::fulfill(&conn, &input)?;
    let response = match &outcome {
        FulfillOutcome::Created(record) => FulfillResponse {
            message: "Marked as fulfilled.",
            book_id: record.id.clone(),
        },
        FulfillOutcome::AlreadyFulfilled(record) => FulfillResponse {
            message: "Already fulfilled.",
            book_id: record.id.clone(),
        },
    };
    Ok(Json(response))
}

async fn list_fulfilled(State(state): State<AppState>) -> Result<Json<Vec<FulfilledRequest>>> {
    let conn = state.db.get()?;
    Ok(Json(fulfillment::list_all(&conn)?))
}

async fn list_payments(State(state): State<AppState>) -> Result<Json<Vec<Payment>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::list_all_payments(&conn)?))
}

/// One row of the reconciliation view: a paid payment joined against the
/// fulfillment it references. The reference is advisory, so a payment may
/// point at a book that does not exist here - those rows still appear,
/// with placeholder details.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaidDetail {
    id: String,
    email: String,
    book_id: FulfillmentId,
    paid_at: i64,
    title: String,
    price: Option<f64>,
    delivered: bool,
}

async fn paid_details(State(state): State<AppState>) -> Result<Json<Vec<PaidDetail>>> {
    let conn = state.db.get()?;

    let payments = queries::list_paid_payments(&conn)?;
    let book_ids: Vec<FulfillmentId> = payments.iter().map(|p| p.book_id.clone()).collect();
    let books: HashMap<FulfillmentId, FulfilledRequest> =
        fulfillment::list_by_ids(&conn, &book_ids)?
            .into_iter()
            .map(|b| (b.id.clone(), b))
            .collect();

    let merged = payments
        .into_iter()
        .map(|p| {
            let book = books.get(&p.book_id);
            PaidDetail {
                id: p.id,
                email: p.email,
                paid_at: p.paid_at,
                title: book
                    .map(|b| b.title.clone())
                    .unwrap_or_else(|| "Unknown".to_string()),
                price: book.map(|b| b.price),
                delivered: book.map(|b| b.delivered).unwrap_or(false),
                book_id: p.book_id,
            }
        })
        .collect();

    Ok(Json(merged))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FulfillPaymentRequest {
    payment_id: String,
    book_id: FulfillmentId,
}

#[derive(Serialize)]
struct FulfillPaymentResponse {
    message: &'static str,
}

/// Confirm delivery for a paid book: flips the delivered flag on the
/// referenced fulfillment.
async fn fulfill_payment(
    State(state): State<AppState>,
    Json(input): Json<FulfillPaymentRequest>,
) -> Result<Json<FulfillPaymentResponse>> {
    if input.payment_id.trim().is_empty() || input.book_id.as_str().trim().is_empty() {
        return Err(AppError::BadRequest(msg::MISSING_PAYMENT_OR_BOOK_ID.into()));
    }
    let conn = state.db.get()?;

    fulfillment::mark_delivered(&conn, &input.book_id)?;
    Ok(Json(FulfillPaymentResponse {
        message: "Fulfilled successfully.",
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/fulfill-request", post(fulfill_request))
        .route("/api/fulfilled-requests", get(list_fulfilled))
        .route("/api/payments", get(list_payments))
        .route("/api/admin/paid-details", get(paid_details))
        .route("/api/fulfill-payment", post(fulfill_payment))
}
