use axum::{
    extract::{Extension, State},
    routing::{get, patch},
    Router,
};

use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::middleware::AuthUser;
use crate::models::{UpdateProfile, User};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me))
        .route("/users/me", patch(update_me))
}

pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<User>> {
    let conn = state.db.get()?;
    let user =
        queries::get_user_by_id(&conn, &auth.id)?.ok_or(AppError::NotFound("User".into()))?;
    Ok(Json(user))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(input): Json<UpdateProfile>,
) -> Result<Json<User>> {
    input.validate()?;

    let conn = state.db.get()?;
    let user = queries::update_user_profile(&conn, &auth.id, &input)?
        .ok_or(AppError::NotFound("User".into()))?;
    Ok(Json(user))
}
