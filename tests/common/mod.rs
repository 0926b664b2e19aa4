//! Test utilities and fixtures for Billable integration tests

#![allow(dead_code)]

use axum::Router;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

pub use billable::auth::TokenSigner;
pub use billable::db::{init_db, queries, AppState};
pub use billable::models::*;

pub const TEST_TOKEN_SECRET: &str = "test-secret";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .expect("Failed to enable foreign keys");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Create an AppState for handler tests. Gateways are unconfigured; the
/// webhook secret is set. The pool holds a single connection so every
/// request sees the same in-memory database.
pub fn create_test_app_state() -> AppState {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }
    AppState {
        db: pool,
        tokens: TokenSigner::new(TEST_TOKEN_SECRET),
        razorpay: None,
        whatsapp: None,
        webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
        frontend_url: "http://localhost:5173".to_string(),
        currency: "INR".to_string(),
    }
}

/// Build the full application router the way main does
pub fn test_app(state: AppState) -> Router {
    Router::new()
        .merge(billable::handlers::auth::router())
        .merge(billable::handlers::webhooks::router())
        .merge(billable::handlers::protected_router(state.clone()))
        .with_state(state)
}

/// Sign a bearer token for an existing user
pub fn token_for(state: &AppState, user: &User) -> String {
    state
        .tokens
        .sign(&user.id, &user.email)
        .expect("Failed to sign token")
}

/// Create a test user with a password hash placeholder
pub fn create_test_user(conn: &Connection, email: &str) -> User {
    queries::create_user(
        conn,
        &queries::NewUser {
            name: "Test User",
            email,
            password_hash: Some("$2b$12$placeholderplaceholderplace"),
            google_id: None,
        },
    )
    .expect("Failed to create test user")
}

/// Create a test customer with email and phone set
pub fn create_test_customer(conn: &Connection, user_id: &str, name: &str) -> Customer {
    queries::create_customer(
        conn,
        user_id,
        &CreateCustomer {
            name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase().replace(' ', "."))),
            phone: Some("9876543210".to_string()),
        },
    )
    .expect("Failed to create test customer")
}

/// Create a test invoice: 2 x 50.00 + 1 x 25.00 at 10% tax
/// (subtotal 125.00, tax 12.50, total 137.50)
pub fn create_test_invoice(conn: &Connection, customer_id: &str) -> Invoice {
    let items = test_items();
    let (subtotal, tax, total) = invoice_totals(&items, 10.0);
    queries::create_invoice(
        conn,
        &queries::NewInvoice {
            customer_id,
            subtotal,
            tax,
            total,
            items: &items,
        },
    )
    .expect("Failed to create test invoice")
}

pub fn test_items() -> Vec<CreateInvoiceItem> {
    vec![
        CreateInvoiceItem {
            name: "Widget".to_string(),
            qty: 2,
            price: 50.0,
        },
        CreateInvoiceItem {
            name: "Gadget".to_string(),
            qty: 1,
            price: 25.0,
        },
    ]
}
