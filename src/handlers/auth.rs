use axum::{extract::State, routing::post, Router};
use serde::Serialize;

use crate::auth::{hash_password, verify_password};
use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::{AuthUserResponse, LoginRequest, RegisterRequest};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: AuthUserResponse,
}

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    input.validate()?;

    let conn = state.db.get()?;

    if queries::get_user_by_email(&conn, &input.email)?.is_some() {
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    let password_hash = hash_password(&input.password)?;
    let user = queries::create_user(
        &conn,
        &queries::NewUser {
            name: input.name.trim(),
            email: &input.email,
            password_hash: Some(&password_hash),
            google_id: None,
        },
    )?;

    let token = state.tokens.sign(&user.id, &user.email)?;

    tracing::info!("Registered user {}", user.email);

    Ok(Json(AuthResponse {
        token,
        user: AuthUserResponse::from(&user),
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let conn = state.db.get()?;

    // Uniform error for unknown email, password-less account, and mismatch,
    // so the response does not leak which emails exist.
    let invalid = || AppError::BadRequest("Invalid credentials".into());

    let user = queries::get_user_by_email(&conn, &input.email)?.ok_or_else(invalid)?;
    let hash = user.password_hash.as_deref().ok_or_else(invalid)?;

    if !verify_password(&input.password, hash)? {
        return Err(invalid());
    }

    let token = state.tokens.sign(&user.id, &user.email)?;

    Ok(Json(AuthResponse {
        token,
        user: AuthUserResponse::from(&user),
    }))
}
