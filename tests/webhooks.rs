//! Payment verifier tests: webhook payload parsing and the read-back
//! trust boundary.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;

use std::io::{Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bindery::config::PayPalCredentials;
use bindery::db::AppState;
use bindery::error::AppError;
use bindery::handlers::webhooks::handle_paypal_webhook;
use bindery::payments::{
    resolve_verified_payment, PayPalClient, PayPalWebhookEvent, ProviderOrder, CAPTURE_COMPLETED,
};

/// State for handler paths that never reach the provider or the database.
/// The API base is unroutable so an accidental network call fails fast.
fn test_state() -> AppState {
    let manager = r2d2_sqlite::SqliteConnectionManager::memory();
    let db = r2d2::Pool::builder().max_size(1).build(manager).unwrap();
    AppState {
        db,
        paypal: PayPalClient::new("http://127.0.0.1:9", test_credentials()),
    }
}

fn test_credentials() -> PayPalCredentials {
    PayPalCredentials {
        client_id: "test-client".to_string(),
        secret: "test-secret".to_string(),
    }
}

/// Minimal token-endpoint stub: answers every connection with a canned
/// HTTP response and counts how many requests arrive.
fn spawn_token_stub(response: &'static [u8]) -> (String, Arc<AtomicUsize>) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
    let addr = listener.local_addr().expect("stub addr");
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            counter.fetch_add(1, Ordering::SeqCst);
            // Drain the request (headers + the small form body) before
            // answering so the client never sees a reset mid-write
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while let Ok(n) = stream.read(&mut buf) {
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request.windows(18).any(|w| w == b"client_credentials") {
                    break;
                }
            }
            let _ = stream.write_all(response);
            let _ = stream.flush();
        }
    });

    (format!("http://{}", addr), hits)
}

fn capture_webhook_json(payer: &str, order_id: &str) -> String {
    serde_json::json!({
        "event_type": CAPTURE_COMPLETED,
        "resource": {
            "payer": { "email_address": payer },
            "supplementary_data": {
                "related_ids": { "order_id": order_id }
            }
        }
    })
    .to_string()
}

fn order_json(payer: &str, reference_id: &str) -> ProviderOrder {
    serde_json::from_value(serde_json::json!({
        "id": "7L621564R17262744",
        "status": "COMPLETED",
        "purchase_units": [ { "reference_id": reference_id } ],
        "payer": { "email_address": payer }
    }))
    .expect("order should parse")
}

#[test]
fn test_parses_capture_completed_payload() {
    let event: PayPalWebhookEvent =
        serde_json::from_str(&capture_webhook_json("a@x.com", "ORDER-1")).unwrap();

    assert_eq!(event.event_type, CAPTURE_COMPLETED);
    assert_eq!(event.order_id().unwrap().as_str(), "ORDER-1");
    assert_eq!(event.claimed_payer_email(), Some("a@x.com"));
}

#[test]
fn test_unrelated_event_type_parses_without_resource() {
    let event: PayPalWebhookEvent =
        serde_json::from_str(r#"{"event_type":"CHECKOUT.ORDER.APPROVED"}"#).unwrap();

    assert_ne!(event.event_type, CAPTURE_COMPLETED);
    assert!(event.order_id().is_none());
}

#[test]
fn test_missing_order_id_is_detected() {
    let event: PayPalWebhookEvent = serde_json::from_value(serde_json::json!({
        "event_type": CAPTURE_COMPLETED,
        "resource": { "payer": { "email_address": "a@x.com" } }
    }))
    .unwrap();

    assert!(event.order_id().is_none());
}

#[test]
fn test_blank_order_id_is_treated_as_missing() {
    let event: PayPalWebhookEvent =
        serde_json::from_str(&capture_webhook_json("a@x.com", "  ")).unwrap();
    assert!(event.order_id().is_none());
}

#[tokio::test]
async fn test_handler_acknowledges_unrelated_event_types() {
    let state = test_state();
    let body = Bytes::from(r#"{"event_type":"CHECKOUT.ORDER.APPROVED"}"#);

    let (status, message) = handle_paypal_webhook(State(state), body).await;

    // The provider must not retry on a type mismatch
    assert_eq!(status, StatusCode::OK);
    assert_eq!(message, "Event ignored");
}

#[tokio::test]
async fn test_handler_rejects_invalid_json() {
    let state = test_state();
    let body = Bytes::from("not json");

    let (status, _) = handle_paypal_webhook(State(state), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_handler_acknowledges_capture_without_order_id() {
    let state = test_state();
    let body = Bytes::from(
        serde_json::json!({
            "event_type": CAPTURE_COMPLETED,
            "resource": { "payer": { "email_address": "a@x.com" } }
        })
        .to_string(),
    );

    // Acknowledged, not retried: this event can never become verifiable
    let (status, _) = handle_paypal_webhook(State(state), body).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_handler_fails_retryably_when_provider_unreachable() {
    let state = test_state();
    let body = Bytes::from(capture_webhook_json("a@x.com", "ORDER-1"));

    // Read-back against the unroutable API base: the provider should
    // redeliver, so the response must be a 5xx
    let (status, _) = handle_paypal_webhook(State(state), body).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_rejected_credentials_are_not_retried() {
    let (base, hits) = spawn_token_stub(
        b"HTTP/1.1 401 Unauthorized\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
    );
    let client = PayPalClient::new(&base, test_credentials());

    let err = client.get_access_token().await.unwrap_err();

    // A credential rejection is a deployment problem: exactly one request,
    // surfaced as an upstream error
    assert!(matches!(err, AppError::Upstream(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_token_endpoint_error_status_is_not_retried() {
    let (base, hits) = spawn_token_stub(
        b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
    );
    let client = PayPalClient::new(&base, test_credentials());

    let err = client.get_access_token().await.unwrap_err();

    assert!(matches!(err, AppError::Upstream(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_successful_token_exchange_parses_access_token() {
    let (base, hits) = spawn_token_stub(
        b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 31\r\nconnection: close\r\n\r\n{\"access_token\":\"A21AAFtoken\"}\n",
    );
    let client = PayPalClient::new(&base, test_credentials());

    let token = client.get_access_token().await.unwrap();

    assert_eq!(token, "A21AAFtoken");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_verified_payment_comes_from_order_read_back() {
    let order = order_json("true-payer@x.com", "B1");

    let verified = resolve_verified_payment(&order, Some("true-payer@x.com")).unwrap();
    assert_eq!(verified.payer_email, "true-payer@x.com");
    assert_eq!(verified.book_id.as_str(), "B1");
}

#[test]
fn test_tampered_webhook_payer_is_overridden_by_order() {
    let order = order_json("true-payer@x.com", "B1");

    // The webhook body claims a different payer; the read-back wins
    let verified = resolve_verified_payment(&order, Some("attacker@evil.com")).unwrap();
    assert_eq!(verified.payer_email, "true-payer@x.com");
}

#[test]
fn test_order_without_book_reference_is_unverifiable() {
    let order: ProviderOrder = serde_json::from_value(serde_json::json!({
        "purchase_units": [ {} ],
        "payer": { "email_address": "a@x.com" }
    }))
    .unwrap();

    assert!(resolve_verified_payment(&order, None).is_none());
}

#[test]
fn test_order_without_payer_is_unverifiable() {
    let order: ProviderOrder = serde_json::from_value(serde_json::json!({
        "purchase_units": [ { "reference_id": "B1" } ]
    }))
    .unwrap();

    assert!(resolve_verified_payment(&order, Some("claimed@x.com")).is_none());
}

#[test]
fn test_order_with_empty_purchase_units_is_unverifiable() {
    let order: ProviderOrder = serde_json::from_value(serde_json::json!({
        "purchase_units": [],
        "payer": { "email_address": "a@x.com" }
    }))
    .unwrap();

    assert!(resolve_verified_payment(&order, None).is_none());
}
