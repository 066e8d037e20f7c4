//! Current-user HTTP handlers.
//!
//! - GET /api/v1/me - Current user and their clubs
//! - GET /api/v1/me/tokens - List own access tokens
//! - POST /api/v1/me/tokens - Mint an access token
//! - DELETE /api/v1/me/tokens/{id} - Revoke an access token

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::user::{AccessTokenResponse, CreateTokenRequest, MeResponse, User},
    services::{club_service, token_service},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

/// Current user profile with every club membership.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "user": { "id": "...", "email": "jo@example.com", "display_name": "Jo", ... },
///   "clubs": [
///     { "club_id": "...", "name": "Riverside Rowing", "slug": "riverside-rowing", "role": "owner" }
///   ]
/// }
/// ```
pub async fn get_me(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<MeResponse>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth.user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let clubs = club_service::clubs_for_user(&pool, auth.user_id).await?;

    Ok(Json(MeResponse { user, clubs }))
}

pub async fn list_tokens(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<AccessTokenResponse>>, AppError> {
    let tokens = token_service::list_tokens(&pool, auth.user_id).await?;
    Ok(Json(tokens))
}

/// Mint a new access token.
///
/// Returns 201 Created. The `token` field is only present in this
/// response; store it, it cannot be retrieved again.
pub async fn create_token(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = token_service::create_token(&pool, auth.user_id, &request.label).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

/// Revoke one of the caller's tokens. Returns 204 No Content.
pub async fn revoke_token(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(token_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    token_service::revoke_token(&pool, auth.user_id, token_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
