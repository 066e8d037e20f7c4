//! Announcement and notification models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a row of the `announcements` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Announcement {
    pub id: Uuid,
    pub club_id: Uuid,
    pub author_id: Option<Uuid>,
    pub title: String,
    pub body: String,

    /// Audience restricted to one team when set
    pub team_id: Option<Uuid>,

    /// Pinned announcements are listed first
    pub pinned: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub body: String,
    pub team_id: Option<Uuid>,
    #[serde(default)]
    pub pinned: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub pinned: Option<bool>,
}

/// Represents a row of the `notifications` table.
///
/// Notifications belong to one user within one club.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub club_id: Uuid,

    /// e.g. `announcement`, `member_joined`
    pub kind: String,

    pub title: String,
    pub body: Option<String>,

    /// Client-side route the notification points at
    pub link: Option<String>,

    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationFilter {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

/// Response body for bulk notification updates.
#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}
