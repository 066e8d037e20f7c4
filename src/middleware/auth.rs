//! Access token authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the bearer token from the Authorization header
//! 2. Hash it and look up an unrevoked token in the database
//! 3. Inject the caller's identity into the request
//! 4. Reject unauthenticated requests with HTTP 401

use crate::{db::DbPool, error::AppError, services::token_service};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Authentication context attached to authenticated requests.
///
/// Inserted into the request's extension map; handlers extract it with
/// `Extension<AuthContext>`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,

    /// Platform admins act as owner in every club
    pub is_platform_admin: bool,

    /// Token used for this request
    pub token_id: Uuid,
}

#[derive(Debug, sqlx::FromRow)]
struct TokenOwner {
    token_id: Uuid,
    user_id: Uuid,
    email: String,
    display_name: String,
    is_platform_admin: bool,
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve a raw bearer token to its owner, recording `last_used_at`.
///
/// Returns `Unauthorized` for unknown or revoked tokens.
pub async fn authenticate(pool: &DbPool, token: &str) -> Result<AuthContext, AppError> {
    let token_hash = token_service::hash_token(token);

    // Touch the token and fetch its owner in one round trip
    let owner = sqlx::query_as::<_, TokenOwner>(
        r#"
        WITH touched AS (
            UPDATE access_tokens
            SET last_used_at = NOW()
            WHERE token_hash = $1 AND revoked_at IS NULL
            RETURNING id, user_id
        )
        SELECT touched.id AS token_id, users.id AS user_id, users.email,
               users.display_name, users.is_platform_admin
        FROM touched
        JOIN users ON users.id = touched.user_id
        "#,
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    let auth_context = AuthContext {
        user_id: owner.user_id,
        email: owner.email,
        display_name: owner.display_name,
        is_platform_admin: owner.is_platform_admin,
        token_id: owner.token_id,
    };

    tracing::debug!(
        user_id = %auth_context.user_id,
        email = %auth_context.email,
        token_id = %auth_context.token_id,
        "Request authenticated"
    );

    Ok(auth_context)
}

/// The caller's identity if the request carries an `Authorization` header.
///
/// No header means an anonymous caller. A header that is present but not a
/// valid bearer token is rejected rather than treated as anonymous.
pub async fn optional_caller(
    pool: &DbPool,
    headers: &HeaderMap,
) -> Result<Option<AuthContext>, AppError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let token = value
        .to_str()
        .ok()
        .and_then(bearer_token)
        .ok_or(AppError::Unauthorized)?;

    authenticate(pool, token).await.map(Some)
}

/// Access token authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>` header from request
/// 2. Hash the token using SHA-256
/// 3. Look up the hash among tokens where `revoked_at IS NULL`
/// 4. If found: record `last_used_at`, inject `AuthContext`, call next handler
/// 5. If not found: return 401 Unauthorized
pub async fn auth_middleware(
    State(pool): State<DbPool>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AppError::Unauthorized)?;

    let auth_context = authenticate(&pool, token).await?;
    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_requires_the_scheme() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("Basic abc123"), None);
        assert_eq!(bearer_token("abc123"), None);
    }

    #[test]
    fn empty_bearer_token_is_rejected() {
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer    "), None);
    }
}
