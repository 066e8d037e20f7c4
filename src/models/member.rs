//! Roster member models.
//!
//! Members are the people on a club's roster (players, parents, volunteers).
//! They are distinct from users: a member does not need an account.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Allowed values of `members.status`.
pub const MEMBER_STATUSES: [&str; 3] = ["active", "inactive", "pending"];

/// Represents a member record from the `members` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Member {
    pub id: Uuid,
    pub club_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,

    /// One of `active`, `inactive`, `pending`
    pub status: String,

    pub joined_on: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for adding a member to the roster.
///
/// ```json
/// {
///   "first_name": "Ada",
///   "last_name": "Lovelace",
///   "email": "ada@example.com",
///   "status": "active"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateMemberRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default = "default_status")]
    pub status: String,
    pub joined_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

fn default_status() -> String {
    "active".to_string()
}

/// Request body for updating a member. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMemberRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub status: Option<String>,
    pub joined_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Query string for listing members.
///
/// `search` matches first name, last name or email, case-insensitively.
#[derive(Debug, Default, Deserialize)]
pub struct MemberFilter {
    pub status: Option<String>,
    pub search: Option<String>,
    pub team_id: Option<Uuid>,
}
