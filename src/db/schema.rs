use rusqlite::Connection;

/// Initialize the database schema.
///
/// There are deliberately no foreign-key constraints between payments,
/// fulfilled_requests, and users: the collections are joined at query time
/// by the download authorizer, and a Payment may legitimately reference a
/// bookId that was never fulfilled here (the reference is advisory).
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Book requests (append-only request log)
        CREATE TABLE IF NOT EXISTS book_requests (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            author TEXT,
            edition TEXT NOT NULL DEFAULT 'N/A',
            email TEXT NOT NULL,
            notes TEXT NOT NULL DEFAULT '',
            image TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_book_requests_created ON book_requests(created_at DESC);

        -- Fulfilled requests (deliverable records; id doubles as the bookId)
        -- delivered: admin "delivery confirmed" flag, distinct from payment receipt
        CREATE TABLE IF NOT EXISTS fulfilled_requests (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            title TEXT NOT NULL,
            author TEXT,
            edition TEXT NOT NULL DEFAULT 'N/A',
            notes TEXT NOT NULL DEFAULT '',
            download_url TEXT NOT NULL,
            price REAL NOT NULL,
            delivered INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_fulfilled_email_title ON fulfilled_requests(email, title);
        CREATE INDEX IF NOT EXISTS idx_fulfilled_created ON fulfilled_requests(created_at DESC);

        -- Payments (written only by the verifier; email stored lowercase)
        -- status is nullable: NULL on legacy rows means implicitly paid
        CREATE TABLE IF NOT EXISTS payments (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            book_id TEXT NOT NULL,
            paid_at INTEGER NOT NULL,
            status TEXT CHECK (status IS NULL OR status IN ('paid'))
        );
        CREATE INDEX IF NOT EXISTS idx_payments_email_book ON payments(email, book_id);
        CREATE INDEX IF NOT EXISTS idx_payments_paid_at ON payments(paid_at DESC);

        -- Users (identity cache, created on first sight)
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            uid TEXT,
            role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        "#,
    )?;
    Ok(())
}
