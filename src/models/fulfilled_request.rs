use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};
use crate::models::FulfillmentId;
use crate::util::validate_email_format;

/// The deliverable record for a request: a download URL and price attached
/// by an administrator. Its id is the canonical bookId that `Payment`
/// records reference.
///
/// `delivered` is the admin "delivery confirmed" flag. It is a different
/// fact from `Payment.status` ("funds received") and the two are never
/// merged - the download authorizer is the only place their union matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FulfilledRequest {
    pub id: FulfillmentId,
    pub email: String,
    pub title: String,
    pub author: Option<String>,
    pub edition: String,
    pub notes: String,
    pub download_url: String,
    /// Price in the store's display currency (same loose numeric the
    /// original records carried; no money arithmetic is done on it)
    pub price: f64,
    pub delivered: bool,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFulfilledRequest {
    pub email: String,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub edition: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub download_url: String,
    pub price: f64,
}

impl CreateFulfilledRequest {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::BadRequest(msg::TITLE_EMPTY.into()));
        }
        if self.download_url.trim().is_empty() {
            return Err(AppError::BadRequest(msg::DOWNLOAD_URL_EMPTY.into()));
        }
        validate_email_format(&self.email)
    }
}
