use axum::Router;
use clap::Parser;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use billable::auth::{hash_password, TokenSigner};
use billable::config::Config;
use billable::db::{create_pool, init_db, queries, AppState};
use billable::handlers;
use billable::models::{CreateCustomer, CreateInvoiceItem, invoice_totals};
use billable::payments::RazorpayClient;
use billable::whatsapp::WhatsappClient;

#[derive(Parser, Debug)]
#[command(name = "billable")]
#[command(about = "Invoicing backend with WhatsApp delivery and Razorpay payment links")]
struct Cli {
    /// Seed the database with dev data (user, customer, invoice)
    #[arg(long)]
    seed: bool,
}

/// Seeds the database with dev data for local testing.
/// Only runs in dev mode and when the database is empty.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    if queries::get_user_by_email(&conn, "dev@billable.local")
        .expect("Failed to check for dev user")
        .is_some()
    {
        tracing::info!("Database already has dev data, skipping seed");
        return;
    }

    tracing::info!("Seeding dev data");

    let password_hash = hash_password("devpassword").expect("Failed to hash dev password");
    let user = queries::create_user(
        &conn,
        &queries::NewUser {
            name: "Dev User",
            email: "dev@billable.local",
            password_hash: Some(&password_hash),
            google_id: None,
        },
    )
    .expect("Failed to create dev user");

    let customer = queries::create_customer(
        &conn,
        &user.id,
        &CreateCustomer {
            name: "Acme Traders".to_string(),
            email: Some("accounts@acme.example".to_string()),
            phone: Some("9876543210".to_string()),
        },
    )
    .expect("Failed to create dev customer");

    let items = vec![
        CreateInvoiceItem {
            name: "Consulting".to_string(),
            qty: 2,
            price: 50.0,
        },
        CreateInvoiceItem {
            name: "Support".to_string(),
            qty: 1,
            price: 25.0,
        },
    ];
    let (subtotal, tax, total) = invoice_totals(&items, 10.0);
    let invoice = queries::create_invoice(
        &conn,
        &queries::NewInvoice {
            customer_id: &customer.id,
            subtotal,
            tax,
            total,
            items: &items,
        },
    )
    .expect("Failed to create dev invoice");

    tracing::info!("Seeded dev user dev@billable.local / devpassword");
    tracing::info!("Seeded customer {} and invoice {}", customer.id, invoice.id);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "billable=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState {
        db: db_pool,
        tokens: TokenSigner::new(&config.token_secret),
        razorpay: config.razorpay.as_ref().map(RazorpayClient::new),
        whatsapp: config
            .twilio
            .as_ref()
            .map(|t| WhatsappClient::new(t, &config.default_country_code)),
        webhook_secret: config.webhook_secret.clone(),
        frontend_url: config.frontend_url.clone(),
        currency: config.currency.clone(),
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set BILLABLE_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    let app = Router::new()
        // Public endpoints (no auth)
        .merge(handlers::auth::router())
        // Webhook endpoints (signature auth)
        .merge(handlers::webhooks::router())
        // User-facing API (bearer auth)
        .merge(handlers::protected_router(state.clone()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Billable server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
