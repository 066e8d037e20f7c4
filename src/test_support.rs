//! Fixtures for tests that run against a real database.

use uuid::Uuid;

use crate::{
    db::DbPool,
    middleware::auth::{self, AuthContext},
    models::club::{Club, CreateClubRequest},
    permissions::{ClubAccess, Role},
    services::{club_service, token_service},
    state::AppSettings,
};

pub fn settings() -> AppSettings {
    AppSettings {
        app_base_url: "http://localhost:5173".to_string(),
        invitation_ttl_hours: 168,
        cors_allowed_origin: None,
    }
}

/// Insert a user with one access token; returns the plaintext token.
pub async fn user_with_token(pool: &DbPool, email: &str) -> (AuthContext, String) {
    let user_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (email, display_name) VALUES ($1, $2) RETURNING id",
    )
    .bind(email)
    .bind(email.split('@').next().unwrap())
    .fetch_one(pool)
    .await
    .unwrap();

    let (_, token) = token_service::mint(pool, user_id, "test").await.unwrap();
    let auth = auth::authenticate(pool, &token).await.unwrap();
    (auth, token)
}

pub async fn user(pool: &DbPool, email: &str) -> AuthContext {
    user_with_token(pool, email).await.0
}

/// A club on the free plan owned by `owner`.
pub async fn club(pool: &DbPool, owner: &AuthContext, name: &str) -> Club {
    club_service::create_club(
        pool,
        owner,
        CreateClubRequest {
            name: name.to_string(),
            slug: None,
            description: None,
            contact_email: None,
            timezone: "UTC".to_string(),
        },
    )
    .await
    .unwrap()
}

pub async fn join(pool: &DbPool, club_id: Uuid, user_id: Uuid, role: Role) {
    sqlx::query("INSERT INTO memberships (club_id, user_id, role) VALUES ($1, $2, $3)")
        .bind(club_id)
        .bind(user_id)
        .bind(role.as_str())
        .execute(pool)
        .await
        .unwrap();
}

pub async fn access(pool: &DbPool, auth: &AuthContext, club_id: Uuid) -> ClubAccess {
    ClubAccess::resolve(pool, auth, club_id).await.unwrap()
}

pub async fn token_count(pool: &DbPool, user_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM access_tokens WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
