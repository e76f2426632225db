//! Test utilities and fixtures for Bindery integration tests

#![allow(dead_code)]

use rusqlite::Connection;

pub use bindery::db::{init_db, queries};
pub use bindery::models::*;
pub use bindery::{authorizer, fulfillment, ledger};

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Fulfill a test book and return its bookId
pub fn fulfill_test_book(conn: &Connection, email: &str, title: &str) -> FulfillmentId {
    let outcome = fulfillment::fulfill(
        conn,
        &CreateFulfilledRequest {
            email: email.to_string(),
            title: title.to_string(),
            author: None,
            edition: None,
            notes: None,
            download_url: format!("https://cdn.example.com/{}.pdf", title.replace(' ', "-")),
            price: 20.0,
        },
    )
    .expect("Failed to fulfill test book");
    outcome.book_id().clone()
}

/// Count payment rows for a (email, bookId) pair, any status
pub fn count_payments(conn: &Connection, email: &str, book_id: &FulfillmentId) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM payments WHERE email = ?1 AND book_id = ?2",
        rusqlite::params![email, book_id.as_str()],
        |row| row.get(0),
    )
    .expect("Failed to count payments")
}

/// Insert a payment row the way a pre-status-column deployment would have:
/// status NULL, which must be treated as implicitly paid
pub fn insert_legacy_payment(conn: &Connection, email: &str, book_id: &FulfillmentId) {
    conn.execute(
        "INSERT INTO payments (id, email, book_id, paid_at, status) VALUES (?1, ?2, ?3, ?4, NULL)",
        rusqlite::params![
            uuid::Uuid::new_v4().to_string(),
            email,
            book_id.as_str(),
            chrono::Utc::now().timestamp(),
        ],
    )
    .expect("Failed to insert legacy payment");
}
