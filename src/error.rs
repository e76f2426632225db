use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Shared error message constants.
///
/// Centralized so handlers and tests agree on the exact wording, and so
/// access-denied responses stay byte-identical regardless of which check
/// produced them.
pub mod msg {
    pub const MISSING_EMAIL: &str = "Missing email";
    pub const MISSING_EMAIL_OR_BOOK_ID: &str = "Missing email or bookId";
    pub const MISSING_PAYMENT_OR_BOOK_ID: &str = "Missing paymentId or bookId";
    pub const TITLE_EMPTY: &str = "Title must not be empty";
    pub const EMAIL_EMPTY: &str = "Email must not be empty";
    pub const INVALID_EMAIL_FORMAT: &str = "Invalid email format";
    pub const DOWNLOAD_URL_EMPTY: &str = "Download URL must not be empty";
    pub const ACCESS_DENIED: &str = "Access denied";
    pub const DOWNLOAD_NOT_AVAILABLE: &str = "Download not available";
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Deliberately carries no detail: a denial must not reveal whether the
    /// book exists, whether anyone paid, or whether the email is known.
    #[error("Access denied")]
    AccessDenied,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(rejection: axum::extract::rejection::QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<axum::extract::rejection::PathRejection> for AppError {
    fn from(rejection: axum::extract::rejection::PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "Bad request", Some(msg.clone()))
            }
            AppError::AccessDenied => (StatusCode::FORBIDDEN, msg::ACCESS_DENIED, None),
            AppError::Upstream(e) => {
                tracing::error!("Upstream error: {}", e);
                (StatusCode::BAD_GATEWAY, "Upstream error", None)
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                (StatusCode::BAD_REQUEST, "Invalid JSON", Some(e.to_string()))
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Convert `Ok(None)` lookups into `NotFound` errors.
pub trait OptionExt<T> {
    fn or_not_found(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Result<Option<T>> {
    fn or_not_found(self, msg: &str) -> Result<T> {
        self?.ok_or_else(|| AppError::NotFound(msg.to_string()))
    }
}
