//! Bearer-token authentication middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::util::extract_bearer_token;

/// Authenticated caller, injected as a request extension by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

/// Verify the bearer token, load the user, and inject [`AuthUser`].
/// Rejects with 401 on any failure.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let token = extract_bearer_token(req.headers()).ok_or(AppError::Unauthorized)?;
    let (user_id, _claims) = state.tokens.verify(token)?;

    // The token may outlive the account; re-check the user exists.
    let conn = state.db.get()?;
    let user = queries::get_user_by_id(&conn, &user_id)?.ok_or(AppError::Unauthorized)?;
    drop(conn);

    req.extensions_mut().insert(AuthUser {
        id: user.id,
        email: user.email,
    });

    Ok(next.run(req).await)
}
