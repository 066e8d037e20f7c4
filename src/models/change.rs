//! Club change feed models and the query-key invalidation table.
//!
//! Every mutation appends a row to `club_changes`. Clients poll the feed
//! with the last sequence number they saw and receive the list of cached
//! query keys they should refetch.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of club data a change can touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Club,
    Members,
    Teams,
    Facilities,
    Bookings,
    Events,
    Finances,
    Announcements,
    Notifications,
    Users,
    Subscription,
}

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Created,
    Updated,
    Deleted,
}

/// Every cached query key a client may hold for a club.
pub const ALL_QUERY_KEYS: &[&str] = &[
    "club",
    "members",
    "teams",
    "facilities",
    "bookings",
    "events",
    "calendar",
    "finances",
    "finance-summary",
    "announcements",
    "notifications",
    "users",
    "permissions",
    "subscription",
    "dashboard",
];

impl Entity {
    pub const ALL: [Entity; 11] = [
        Entity::Club,
        Entity::Members,
        Entity::Teams,
        Entity::Facilities,
        Entity::Bookings,
        Entity::Events,
        Entity::Finances,
        Entity::Announcements,
        Entity::Notifications,
        Entity::Users,
        Entity::Subscription,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Entity::Club => "club",
            Entity::Members => "members",
            Entity::Teams => "teams",
            Entity::Facilities => "facilities",
            Entity::Bookings => "bookings",
            Entity::Events => "events",
            Entity::Finances => "finances",
            Entity::Announcements => "announcements",
            Entity::Notifications => "notifications",
            Entity::Users => "users",
            Entity::Subscription => "subscription",
        }
    }

    /// Query keys that go stale when this entity changes.
    pub fn invalidated_keys(self) -> &'static [&'static str] {
        match self {
            Entity::Club => ALL_QUERY_KEYS,
            Entity::Members => &["members", "teams", "dashboard"],
            Entity::Teams => &[
                "teams",
                "members",
                "bookings",
                "events",
                "calendar",
                "dashboard",
            ],
            Entity::Facilities => &["facilities", "bookings", "calendar"],
            Entity::Bookings => &["bookings", "calendar", "facilities", "dashboard"],
            Entity::Events => &["events", "calendar", "dashboard"],
            Entity::Finances => &["finances", "finance-summary", "dashboard"],
            Entity::Announcements => &["announcements", "notifications"],
            Entity::Notifications => &["notifications"],
            Entity::Users => &["users", "permissions"],
            Entity::Subscription => &["subscription", "club", "dashboard"],
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Entity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Entity::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("Unknown entity '{s}'"))
    }
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Created => "created",
            Action::Updated => "updated",
            Action::Deleted => "deleted",
        }
    }
}

/// Union of the keys invalidated by `entities`, de-duplicated, in the order
/// they are first seen.
pub fn keys_to_invalidate<I>(entities: I) -> Vec<&'static str>
where
    I: IntoIterator<Item = Entity>,
{
    let mut keys: Vec<&'static str> = Vec::new();
    for entity in entities {
        for &key in entity.invalidated_keys() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

/// Represents a row of the `club_changes` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ClubChange {
    pub seq: i64,
    pub club_id: Uuid,
    pub entity: String,
    pub entity_id: Option<Uuid>,
    pub action: String,
    pub changed_at: DateTime<Utc>,
}

/// Query string for `GET .../changes`.
#[derive(Debug, Default, Deserialize)]
pub struct ChangesQuery {
    #[serde(default)]
    pub since: i64,
    pub limit: Option<i64>,
}

/// Response body for `GET .../changes`.
#[derive(Debug, Serialize)]
pub struct ChangesResponse {
    /// Highest sequence number the client has now seen
    pub latest_seq: i64,

    pub changes: Vec<ClubChange>,

    /// Query keys to refetch
    pub invalidate: Vec<&'static str>,

    /// More changes exist past `latest_seq`; `invalidate` lists every key
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn club_changes_invalidate_everything() {
        assert_eq!(Entity::Club.invalidated_keys(), ALL_QUERY_KEYS);
    }

    #[test]
    fn every_table_key_is_a_known_query_key() {
        for entity in Entity::ALL {
            for key in entity.invalidated_keys() {
                assert!(
                    ALL_QUERY_KEYS.contains(key),
                    "{entity} invalidates unknown key {key}"
                );
            }
        }
    }

    #[test]
    fn every_entity_invalidates_its_own_key_family() {
        for entity in Entity::ALL {
            assert!(!entity.invalidated_keys().is_empty());
        }
        assert!(Entity::Bookings.invalidated_keys().contains(&"calendar"));
        assert!(Entity::Finances.invalidated_keys().contains(&"finance-summary"));
    }

    #[test]
    fn union_is_deduplicated_in_first_seen_order() {
        let keys = keys_to_invalidate([Entity::Events, Entity::Bookings, Entity::Events]);
        assert_eq!(
            keys,
            vec!["events", "calendar", "dashboard", "bookings", "facilities"]
        );
    }

    #[test]
    fn entity_names_round_trip_through_strings() {
        for entity in Entity::ALL {
            assert_eq!(entity.as_str().parse::<Entity>().unwrap(), entity);
        }
        assert!("payments".parse::<Entity>().is_err());
    }

    #[test]
    fn serde_uses_snake_case_names() {
        assert_eq!(
            serde_json::to_value(Entity::Announcements).unwrap(),
            "announcements"
        );
        assert_eq!(serde_json::to_value(Action::Deleted).unwrap(), "deleted");
    }
}
