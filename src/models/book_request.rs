use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};
use crate::util::validate_email_format;

/// A user's ask for a title. Append-only: never updated, never deleted -
/// superseded by a `FulfilledRequest` once an admin attaches an artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub edition: String,
    pub email: String,
    pub notes: String,
    /// Path or URL to a reference image of the requested book
    pub image: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub edition: Option<String>,
    pub email: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl CreateBookRequest {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::BadRequest(msg::TITLE_EMPTY.into()));
        }
        validate_email_format(&self.email)
    }
}
