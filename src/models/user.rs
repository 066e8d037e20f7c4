//! User and access token models.
//!
//! Users authenticate with opaque bearer tokens. Only the SHA-256 hash of a
//! token is stored; the plaintext is shown once when the token is minted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a user record from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct User {
    pub id: Uuid,

    /// Lowercased, unique across the platform
    pub email: String,

    pub display_name: String,

    /// Platform admins act as owner in every club
    pub is_platform_admin: bool,

    pub created_at: DateTime<Utc>,
}

/// Represents an access token record from the `access_tokens` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccessToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub label: String,

    /// SHA-256 hash of the token (64 hex characters)
    pub token_hash: String,

    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,

    /// Revoked tokens are rejected during authentication
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Request body for minting a new access token.
///
/// ```json
/// { "label": "laptop" }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateTokenRequest {
    pub label: String,
}

/// Access token as returned to clients.
///
/// The `token` field is only populated in the response that minted it.
#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub id: Uuid,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked: bool,
}

impl From<AccessToken> for AccessTokenResponse {
    fn from(token: AccessToken) -> Self {
        Self {
            id: token.id,
            label: token.label,
            token: None,
            created_at: token.created_at,
            last_used_at: token.last_used_at,
            revoked: token.revoked_at.is_some(),
        }
    }
}

impl AccessTokenResponse {
    /// Include the plaintext token (only when minting).
    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }
}

/// A club the current user belongs to, with their role.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct UserClub {
    pub club_id: Uuid,
    pub name: String,
    pub slug: String,
    pub role: String,
}

/// Response body for `GET /api/v1/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub clubs: Vec<UserClub>,
}
