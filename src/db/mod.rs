mod from_row;
pub mod queries;
mod schema;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::payments::PayPalClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state holding the database pool and shared clients
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// PayPal client used by the webhook verifier for order read-back
    pub paypal: PayPalClient,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
