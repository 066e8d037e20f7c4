//! Team models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a team record from the `teams` table.
///
/// Team names are unique within a club.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Team {
    pub id: Uuid,
    pub club_id: Uuid,
    pub name: String,

    /// Free-form grouping such as "U12" or "Seniors"
    pub category: Option<String>,

    pub description: Option<String>,

    /// Must be a user with a membership in the same club
    pub coach_user_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub coach_user_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTeamRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub coach_user_id: Option<Uuid>,
}

/// A roster member as seen from a team.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TeamMember {
    pub member_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub position: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// Request body for `PUT .../teams/{team_id}/members/{member_id}`.
#[derive(Debug, Default, Deserialize)]
pub struct AssignMemberRequest {
    pub position: Option<String>,
}
