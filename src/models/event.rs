//! Calendar event models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Allowed values of `events.event_type`.
pub const EVENT_TYPES: [&str; 5] = ["training", "match", "meeting", "social", "other"];

/// Represents an event record from the `events` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Event {
    pub id: Uuid,
    pub club_id: Uuid,
    pub team_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub event_type: String,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub team_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_event_type")]
    pub event_type: String,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

fn default_event_type() -> String {
    "other".to_string()
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateEventRequest {
    pub team_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_type: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Query string for event and calendar listings.
#[derive(Debug, Default, Deserialize)]
pub struct CalendarWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub team_id: Option<Uuid>,
}

/// One entry of the merged club calendar.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct CalendarEntry {
    /// `event` or `booking`
    pub kind: String,
    pub id: Uuid,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub team_id: Option<Uuid>,
}
