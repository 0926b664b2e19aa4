use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Router,
};

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::middleware::AuthUser;
use crate::models::{CreateCustomer, Customer, UpdateCustomer};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customers", post(create_customer))
        .route("/customers", get(list_customers))
        .route("/customers/{id}", get(get_customer))
        .route("/customers/{id}", patch(update_customer))
        .route("/customers/{id}", delete(delete_customer))
}

pub async fn create_customer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<CreateCustomer>,
) -> Result<Json<Customer>> {
    input.validate()?;

    let conn = state.db.get()?;
    let customer = queries::create_customer(&conn, &auth.id, &input)?;
    Ok(Json(customer))
}

pub async fn list_customers(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Customer>>> {
    let conn = state.db.get()?;
    let customers = queries::list_customers(&conn, &auth.id)?;
    Ok(Json(customers))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Customer>> {
    let conn = state.db.get()?;
    let customer = queries::get_customer_for_user(&conn, &id, &auth.id)?
        .ok_or(AppError::NotFound("Customer".into()))?;
    Ok(Json(customer))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCustomer>,
) -> Result<Json<Customer>> {
    input.validate()?;

    let conn = state.db.get()?;
    let customer = queries::update_customer(&conn, &id, &auth.id, &input)?
        .ok_or(AppError::NotFound("Customer".into()))?;
    Ok(Json(customer))
}

/// Deletes the customer and, through foreign keys, their invoices and items.
pub async fn delete_customer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let conn = state.db.get()?;
    if !queries::delete_customer(&conn, &id, &auth.id)? {
        return Err(AppError::NotFound("Customer".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}
