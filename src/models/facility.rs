//! Facility models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a facility record from the `facilities` table.
///
/// Deleting a facility only deactivates it so booking history survives.
/// Inactive facilities cannot be booked.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Facility {
    pub id: Uuid,
    pub club_id: Uuid,
    pub name: String,

    /// e.g. "pitch", "court", "hall"
    pub kind: Option<String>,

    pub capacity: Option<i32>,
    pub location: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFacilityRequest {
    pub name: String,
    pub kind: Option<String>,
    pub capacity: Option<i32>,
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateFacilityRequest {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub capacity: Option<i32>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}
