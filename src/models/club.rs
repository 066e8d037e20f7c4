//! Club (tenant) and membership models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a club record from the `clubs` table.
///
/// Every other club-scoped table carries a `club_id` foreign key to this
/// row and is deleted with it.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Club {
    pub id: Uuid,
    pub name: String,

    /// URL-safe identifier, unique across the platform
    pub slug: String,

    pub description: Option<String>,
    pub contact_email: Option<String>,
    pub timezone: String,

    /// Current subscription plan
    pub plan_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for creating a club.
///
/// ```json
/// {
///   "name": "Riverside Rowing Club",
///   "slug": "riverside-rowing",
///   "timezone": "Europe/London"
/// }
/// ```
///
/// `slug` is derived from `name` when omitted.
#[derive(Debug, Deserialize)]
pub struct CreateClubRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Request body for updating a club. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateClubRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    pub timezone: Option<String>,
}

/// A club user as listed in user administration.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ClubUser {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

/// Request body for changing a club user's role.
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// Response body for `GET /api/v1/clubs/{club_id}/permissions`.
#[derive(Debug, Serialize)]
pub struct PermissionsResponse {
    pub club_id: Uuid,
    pub role: String,
    pub permissions: Vec<&'static str>,
}
