pub mod auth;
pub mod customers;
pub mod invoices;
pub mod users;
pub mod webhooks;

use axum::{middleware, Router};

use crate::db::AppState;

/// Routes behind bearer-token authentication.
pub fn protected_router(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(users::router())
        .merge(customers::router())
        .merge(invoices::router())
        .layer(middleware::from_fn_with_state(
            state,
            crate::middleware::require_auth,
        ))
}
