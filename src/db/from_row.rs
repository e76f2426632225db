//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors instead of panicking on corrupt data.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const BOOK_REQUEST_COLS: &str =
    "id, title, author, edition, email, notes, image, created_at";

pub const FULFILLED_REQUEST_COLS: &str =
    "id, email, title, author, edition, notes, download_url, price, delivered, created_at";

pub const PAYMENT_COLS: &str = "id, email, book_id, paid_at, status";

pub const USER_COLS: &str = "id, email, uid, role, created_at";

// ============ FromRow Implementations ============

impl FromRow for BookRequest {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(BookRequest {
            id: row.get(0)?,
            title: row.get(1)?,
            author: row.get(2)?,
            edition: row.get(3)?,
            email: row.get(4)?,
            notes: row.get(5)?,
            image: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

impl FromRow for FulfilledRequest {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(FulfilledRequest {
            id: FulfillmentId::new(row.get::<_, String>(0)?),
            email: row.get(1)?,
            title: row.get(2)?,
            author: row.get(3)?,
            edition: row.get(4)?,
            notes: row.get(5)?,
            download_url: row.get(6)?,
            price: row.get(7)?,
            delivered: row.get::<_, i32>(8)? != 0,
            created_at: row.get(9)?,
        })
    }
}

impl FromRow for Payment {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        // status is nullable: NULL on legacy rows, which count as paid
        let status: Option<PaymentStatus> = match row.get::<_, Option<String>>(4)? {
            Some(s) => Some(s.parse().map_err(|_| {
                rusqlite::Error::InvalidColumnType(
                    4,
                    "status".to_string(),
                    rusqlite::types::Type::Text,
                )
            })?),
            None => None,
        };
        Ok(Payment {
            id: row.get(0)?,
            email: row.get(1)?,
            book_id: FulfillmentId::new(row.get::<_, String>(2)?),
            paid_at: row.get(3)?,
            status,
        })
    }
}

impl FromRow for User {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            uid: row.get(2)?,
            role: parse_enum(row, 3, "role")?,
            created_at: row.get(4)?,
        })
    }
}
