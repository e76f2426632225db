use chrono::Utc;
use rusqlite::{params, types::Value, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::util::normalize_email;

use super::from_row::{
    query_all, query_one, FromRow, BOOK_REQUEST_COLS, FULFILLED_REQUEST_COLS, PAYMENT_COLS,
    USER_COLS,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Book Requests ============

pub fn create_book_request(conn: &Connection, input: &CreateBookRequest) -> Result<BookRequest> {
    let request = BookRequest {
        id: gen_id(),
        title: input.title.clone(),
        author: input.author.clone(),
        edition: input.edition.clone().unwrap_or_else(|| "N/A".to_string()),
        email: input.email.clone(),
        notes: input.notes.clone().unwrap_or_default(),
        image: input.image.clone(),
        created_at: now(),
    };
    conn.execute(
        "INSERT INTO book_requests (id, title, author, edition, email, notes, image, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            request.id,
            request.title,
            request.author,
            request.edition,
            request.email,
            request.notes,
            request.image,
            request.created_at,
        ],
    )?;
    Ok(request)
}

pub fn list_book_requests(conn: &Connection) -> Result<Vec<BookRequest>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM book_requests ORDER BY created_at DESC",
            BOOK_REQUEST_COLS
        ),
        &[],
    )
}

// ============ Fulfilled Requests ============

pub fn find_fulfilled_by_email_title(
    conn: &Connection,
    email: &str,
    title: &str,
) -> Result<Option<FulfilledRequest>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM fulfilled_requests WHERE email = ?1 AND title = ?2",
            FULFILLED_REQUEST_COLS
        ),
        &[&email, &title],
    )
}

pub fn get_fulfilled_by_id(
    conn: &Connection,
    id: &FulfillmentId,
) -> Result<Option<FulfilledRequest>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM fulfilled_requests WHERE id = ?1",
            FULFILLED_REQUEST_COLS
        ),
        &[&id.as_str()],
    )
}

/// Lookup by id with an ownership check against a normalized email.
///
/// The comparison happens in Rust because SQLite's `lower()` only folds
/// ASCII, while emails are normalized with Unicode lowercasing.
pub fn get_fulfilled_by_id_and_email(
    conn: &Connection,
    id: &FulfillmentId,
    email: &str,
) -> Result<Option<FulfilledRequest>> {
    let book = get_fulfilled_by_id(conn, id)?;
    Ok(book.filter(|b| normalize_email(&b.email) == email))
}

pub fn list_fulfilled_by_ids(
    conn: &Connection,
    ids: &[FulfillmentId],
) -> Result<Vec<FulfilledRequest>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT {} FROM fulfilled_requests WHERE id IN ({})",
        FULFILLED_REQUEST_COLS,
        placeholders.join(", ")
    );
    let values: Vec<Value> = ids.iter().map(|id| id.as_str().to_string().into()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(values), FulfilledRequest::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_fulfilled_requests(conn: &Connection) -> Result<Vec<FulfilledRequest>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM fulfilled_requests ORDER BY created_at DESC",
            FULFILLED_REQUEST_COLS
        ),
        &[],
    )
}

pub fn create_fulfilled_request(
    conn: &Connection,
    input: &CreateFulfilledRequest,
) -> Result<FulfilledRequest> {
    let record = FulfilledRequest {
        id: FulfillmentId::new(gen_id()),
        email: input.email.clone(),
        title: input.title.clone(),
        author: input.author.clone(),
        edition: input.edition.clone().unwrap_or_else(|| "N/A".to_string()),
        notes: input.notes.clone().unwrap_or_default(),
        download_url: input.download_url.clone(),
        price: input.price,
        delivered: false,
        created_at: now(),
    };
    conn.execute(
        "INSERT INTO fulfilled_requests
         (id, email, title, author, edition, notes, download_url, price, delivered, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)",
        params![
            record.id.as_str(),
            record.email,
            record.title,
            record.author,
            record.edition,
            record.notes,
            record.download_url,
            record.price,
            record.created_at,
        ],
    )?;
    Ok(record)
}

/// Set delivered=true. Returns the number of rows affected - zero means
/// the bookId matched nothing, which the caller surfaces as a warning.
pub fn set_delivered(conn: &Connection, id: &FulfillmentId) -> Result<usize> {
    let affected = conn.execute(
        "UPDATE fulfilled_requests SET delivered = 1 WHERE id = ?1",
        params![id.as_str()],
    )?;
    Ok(affected)
}

// ============ Payments ============

/// Any-status lookup used by the idempotent-insert check: a duplicate is a
/// duplicate whatever its status column says.
pub fn find_payment(
    conn: &Connection,
    email: &str,
    book_id: &FulfillmentId,
) -> Result<Option<Payment>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM payments WHERE email = ?1 AND book_id = ?2",
            PAYMENT_COLS
        ),
        &[&email, &book_id.as_str()],
    )
}

/// Paid-only lookup. NULL status counts as paid (legacy rows).
pub fn find_paid_payment(
    conn: &Connection,
    email: &str,
    book_id: &FulfillmentId,
) -> Result<Option<Payment>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM payments
             WHERE email = ?1 AND book_id = ?2 AND (status = 'paid' OR status IS NULL)",
            PAYMENT_COLS
        ),
        &[&email, &book_id.as_str()],
    )
}

pub fn list_paid_payments_by_email(conn: &Connection, email: &str) -> Result<Vec<Payment>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM payments
             WHERE email = ?1 AND (status = 'paid' OR status IS NULL)
             ORDER BY paid_at DESC",
            PAYMENT_COLS
        ),
        &[&email],
    )
}

pub fn list_all_payments(conn: &Connection) -> Result<Vec<Payment>> {
    query_all(
        conn,
        &format!("SELECT {} FROM payments ORDER BY paid_at DESC", PAYMENT_COLS),
        &[],
    )
}

pub fn list_paid_payments(conn: &Connection) -> Result<Vec<Payment>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM payments WHERE status = 'paid' OR status IS NULL
             ORDER BY paid_at DESC",
            PAYMENT_COLS
        ),
        &[],
    )
}

pub fn create_payment(
    conn: &Connection,
    email: &str,
    book_id: &FulfillmentId,
) -> Result<Payment> {
    let payment = Payment {
        id: gen_id(),
        email: email.to_string(),
        book_id: book_id.clone(),
        paid_at: now(),
        status: Some(PaymentStatus::Paid),
    };
    conn.execute(
        "INSERT INTO payments (id, email, book_id, paid_at, status) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            payment.id,
            payment.email,
            payment.book_id.as_str(),
            payment.paid_at,
            PaymentStatus::Paid.as_str(),
        ],
    )?;
    Ok(payment)
}

// ============ Users ============

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLS),
        &[&email],
    )
}

pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<User> {
    let user = User {
        id: gen_id(),
        email: input.email.clone(),
        uid: input.uid.clone(),
        role: UserRole::User,
        created_at: now(),
    };
    conn.execute(
        "INSERT INTO users (id, email, uid, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user.id, user.email, user.uid, user.role.as_str(), user.created_at],
    )?;
    Ok(user)
}
