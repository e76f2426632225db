//! Public endpoints: user upsert, book requests, entitlement queries, and
//! the download gate.

use axum::extract::State;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::authorizer;
use crate::db::{queries, AppState};
use crate::error::{msg, AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::ledger;
use crate::models::{BookRequest, CreateBookRequest, CreateUser, FulfillmentId, Payment};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
}

/// Save a user on first sight of a new email; repeat calls are no-ops.
async fn save_user(
    State(state): State<AppState>,
    Json(input): Json<CreateUser>,
) -> Result<Json<SuccessResponse>> {
    input.validate()?;
    let conn = state.db.get()?;

    if queries::get_user_by_email(&conn, &input.email)?.is_none() {
        let user = queries::create_user(&conn, &input)?;
        tracing::info!("New user saved: {}", user.email);
    }

    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Serialize)]
struct BookRequestCreated {
    message: &'static str,
}

async fn submit_book_request(
    State(state): State<AppState>,
    Json(input): Json<CreateBookRequest>,
) -> Result<Json<BookRequestCreated>> {
    input.validate()?;
    let conn = state.db.get()?;

    let request = queries::create_book_request(&conn, &input)?;
    tracing::info!("Book requested: {:?} by {}", request.title, request.email);

    Ok(Json(BookRequestCreated {
        message: "Request saved successfully.",
    }))
}

async fn list_book_requests(State(state): State<AppState>) -> Result<Json<Vec<BookRequest>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::list_book_requests(&conn)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntitlementQuery {
    email: String,
    book_id: FulfillmentId,
}

#[derive(Serialize)]
struct HasPaidResponse {
    paid: bool,
}

async fn has_paid(
    State(state): State<AppState>,
    Query(query): Query<EntitlementQuery>,
) -> Result<Json<HasPaidResponse>> {
    if query.email.trim().is_empty() || query.book_id.as_str().trim().is_empty() {
        return Err(AppError::BadRequest(msg::MISSING_EMAIL_OR_BOOK_ID.into()));
    }
    let conn = state.db.get()?;
    let paid = ledger::is_entitled(&conn, &query.email, &query.book_id)?;
    Ok(Json(HasPaidResponse { paid }))
}

#[derive(Debug, Deserialize)]
struct EmailQuery {
    email: String,
}

async fn paid_requests(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<Payment>>> {
    if query.email.trim().is_empty() {
        return Err(AppError::BadRequest(msg::MISSING_EMAIL.into()));
    }
    let conn = state.db.get()?;
    Ok(Json(ledger::list_entitlements(&conn, &query.email)?))
}

/// The download gate: authorize, then redirect to the artifact.
async fn download(
    State(state): State<AppState>,
    Path(book_id): Path<FulfillmentId>,
    Query(query): Query<EmailQuery>,
) -> Result<Redirect> {
    let conn = state.db.get()?;
    let book = authorizer::authorize(&conn, &query.email, &book_id)?;
    Ok(Redirect::to(&book.download_url))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/users", post(save_user))
        .route("/api/book-request", post(submit_book_request))
        .route("/api/book-requests", get(list_book_requests))
        .route("/api/has-paid", get(has_paid))
        .route("/api/paid-requests", get(paid_requests))
        .route("/api/download/{book_id}", get(download))
}
