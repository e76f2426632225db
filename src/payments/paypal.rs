//! PayPal client and payment verification.
//!
//! A webhook body is an untrusted claim. The verifier never records a
//! payment from it directly: it exchanges server-held service credentials
//! for a bearer token and reads the order back from PayPal, taking the
//! payer email and the book reference from the authoritative order object.
//! A forged or malformed webhook body therefore cannot claim an arbitrary
//! book.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::config::PayPalCredentials;
use crate::error::{AppError, Result};
use crate::models::{FulfillmentId, ProviderOrderId};

/// The only webhook event type that produces a payment record.
pub const CAPTURE_COMPLETED: &str = "PAYMENT.CAPTURE.COMPLETED";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Order object returned by the `/v2/checkout/orders/{id}` read-back.
#[derive(Debug, Deserialize)]
pub struct ProviderOrder {
    #[serde(default)]
    pub purchase_units: Vec<PurchaseUnit>,
    #[serde(default)]
    pub payer: Option<OrderPayer>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseUnit {
    #[serde(default)]
    pub reference_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderPayer {
    #[serde(default)]
    pub email_address: Option<String>,
}

impl ProviderOrder {
    /// The canonical book reference the admin embedded when building the
    /// order: `purchase_units[0].reference_id`.
    pub fn book_reference(&self) -> Option<FulfillmentId> {
        self.purchase_units
            .first()
            .and_then(|u| u.reference_id.as_deref())
            .filter(|r| !r.trim().is_empty())
            .map(FulfillmentId::new)
    }

    pub fn payer_email(&self) -> Option<&str> {
        self.payer
            .as_ref()
            .and_then(|p| p.email_address.as_deref())
            .filter(|e| !e.trim().is_empty())
    }
}

// ============ Webhook payload ============

#[derive(Debug, Deserialize)]
pub struct PayPalWebhookEvent {
    pub event_type: String,
    #[serde(default)]
    pub resource: Option<WebhookResource>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookResource {
    #[serde(default)]
    pub payer: Option<WebhookPayer>,
    #[serde(default)]
    pub supplementary_data: Option<SupplementaryData>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayer {
    #[serde(default)]
    pub email_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SupplementaryData {
    #[serde(default)]
    pub related_ids: Option<RelatedIds>,
}

#[derive(Debug, Deserialize)]
pub struct RelatedIds {
    #[serde(default)]
    pub order_id: Option<String>,
}

impl PayPalWebhookEvent {
    pub fn order_id(&self) -> Option<ProviderOrderId> {
        self.resource
            .as_ref()
            .and_then(|r| r.supplementary_data.as_ref())
            .and_then(|s| s.related_ids.as_ref())
            .and_then(|r| r.order_id.as_deref())
            .filter(|id| !id.trim().is_empty())
            .map(ProviderOrderId::new)
    }

    /// The payer email the webhook body claims. Diagnostic only - the
    /// verifier trusts the order read-back, never this field.
    pub fn claimed_payer_email(&self) -> Option<&str> {
        self.resource
            .as_ref()
            .and_then(|r| r.payer.as_ref())
            .and_then(|p| p.email_address.as_deref())
    }
}

/// A payment fact established against the provider's order record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    pub payer_email: String,
    pub book_id: FulfillmentId,
}

/// Extract the trustworthy payment fact from a read-back order.
///
/// Both the payer identity and the book reference come from the order
/// object. Returns `None` when either cannot be determined - the caller
/// acknowledges the event without writing anything.
pub fn resolve_verified_payment(
    order: &ProviderOrder,
    claimed_payer: Option<&str>,
) -> Option<VerifiedPayment> {
    let payer_email = order.payer_email()?;
    let book_id = order.book_reference()?;

    if let Some(claimed) = claimed_payer {
        if !claimed.eq_ignore_ascii_case(payer_email) {
            tracing::warn!(
                "Webhook payer claim '{}' differs from order payer '{}' - using order value",
                claimed,
                payer_email
            );
        }
    }

    Some(VerifiedPayment {
        payer_email: payer_email.to_string(),
        book_id,
    })
}

/// Failures worth a second attempt: the provider was unreachable or slow.
/// Everything else (an HTTP error status arrives as `Ok`, so in practice
/// TLS and protocol errors) is definitive.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout()
}

/// Run `op`, retrying exactly once if the first attempt fails transiently.
/// The second attempt's result is returned as-is.
async fn retry_once<T, E, F, Fut>(is_transient: fn(&E) -> bool, mut op: F) -> std::result::Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, E>>,
{
    match op().await {
        Ok(v) => Ok(v),
        Err(e) if is_transient(&e) => {
            tracing::warn!("Request failed transiently, retrying once: {}", e);
            op().await
        }
        Err(e) => Err(e),
    }
}

// ============ Client ============

#[derive(Debug, Clone)]
pub struct PayPalClient {
    client: Client,
    api_base: String,
    credentials: PayPalCredentials,
}

impl PayPalClient {
    pub fn new(api_base: &str, credentials: PayPalCredentials) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            api_base: api_base.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Exchange the service credentials for a short-lived bearer token.
    ///
    /// Transient network failures are retried once; an authentication
    /// rejection is a configuration error and is not retried.
    pub async fn get_access_token(&self) -> Result<String> {
        let response = retry_once(is_transient, || self.request_token())
            .await
            .map_err(|e| AppError::Upstream(format!("PayPal token endpoint: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            // Bad service credentials: a deployment problem, not a retry case
            tracing::error!("PayPal rejected service credentials - check PAYPAL_CLIENT_ID/PAYPAL_SECRET");
            return Err(AppError::Upstream("PayPal rejected credentials".into()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "PayPal token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid PayPal token response: {}", e)))?;
        Ok(token.access_token)
    }

    async fn request_token(&self) -> std::result::Result<reqwest::Response, reqwest::Error> {
        self.client
            .post(format!("{}/v1/oauth2/token", self.api_base))
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
    }

    /// Authoritative read-back of an order by its provider-assigned id.
    pub async fn get_order(&self, order_id: &ProviderOrderId) -> Result<ProviderOrder> {
        let access_token = self.get_access_token().await?;

        let response = self
            .client
            .get(format!("{}/v2/checkout/orders/{}", self.api_base, order_id))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("PayPal order lookup: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "PayPal order lookup returned {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid PayPal order response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::retry_once;

    #[tokio::test]
    async fn test_transient_failure_is_retried_exactly_once() {
        let attempts = Cell::new(0u32);
        let result: Result<(), &str> = retry_once(|_| true, || {
            attempts.set(attempts.get() + 1);
            async { Err("connection refused") }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.get(), 2);
    }

    #[tokio::test]
    async fn test_second_attempt_result_is_returned() {
        let attempts = Cell::new(0u32);
        let result = retry_once(|_| true, || {
            attempts.set(attempts.get() + 1);
            let n = attempts.get();
            async move {
                if n == 1 {
                    Err("connection reset")
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(2));
    }

    #[tokio::test]
    async fn test_definitive_failure_is_not_retried() {
        let attempts = Cell::new(0u32);
        let result: Result<(), &str> = retry_once(|_| false, || {
            attempts.set(attempts.get() + 1);
            async { Err("unauthorized") }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.get(), 1);
    }
}
