mod schema;
pub mod from_row;
pub mod queries;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::TokenSigner;
use crate::payments::RazorpayClient;
use crate::whatsapp::WhatsappClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state holding the database pool, gateway clients, and the
/// configuration values handlers need at request time.
///
/// Gateway clients are `Option`: absence means the feature is unconfigured
/// and callers degrade to the null/false sentinel instead of erroring.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub tokens: TokenSigner,
    pub razorpay: Option<RazorpayClient>,
    pub whatsapp: Option<WhatsappClient>,
    /// Shared secret for webhook signature verification (None = reject events).
    pub webhook_secret: Option<String>,
    /// Public frontend origin for deep links and payment callbacks.
    pub frontend_url: String,
    /// Currency code for payment links.
    pub currency: String,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    // Foreign keys are off by default in SQLite; the schema relies on
    // ON DELETE CASCADE for invoice items and customer invoices.
    let manager = SqliteConnectionManager::file(database_path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    Pool::builder().max_size(10).build(manager)
}
