//! Club change feed.
//!
//! Mutating services call [`record`] on the same executor as the mutation,
//! so a rolled-back transaction leaves no change behind.

use crate::{
    db::DbPool,
    error::AppError,
    models::change::{
        ALL_QUERY_KEYS, Action, ChangesQuery, ChangesResponse, ClubChange, Entity,
        keys_to_invalidate,
    },
};
use uuid::Uuid;

pub const DEFAULT_LIMIT: i64 = 200;
pub const MAX_LIMIT: i64 = 1000;

/// Append a change to the club's feed.
pub async fn record<'e, E>(
    executor: E,
    club_id: Uuid,
    entity: Entity,
    entity_id: Option<Uuid>,
    action: Action,
) -> Result<(), AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO club_changes (club_id, entity, entity_id, action)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(club_id)
    .bind(entity.as_str())
    .bind(entity_id)
    .bind(action.as_str())
    .execute(executor)
    .await?;

    Ok(())
}

/// Changes after `query.since`, plus the query keys they invalidate.
///
/// One extra row is fetched to detect truncation. A truncated page tells
/// the client to drop every cached key.
pub async fn list_changes(
    pool: &DbPool,
    club_id: Uuid,
    query: ChangesQuery,
) -> Result<ChangesResponse, AppError> {
    let limit = effective_limit(query.limit)?;
    if query.since < 0 {
        return Err(AppError::InvalidRequest(
            "since must not be negative".to_string(),
        ));
    }

    let mut changes = sqlx::query_as::<_, ClubChange>(
        r#"
        SELECT seq, club_id, entity, entity_id, action, changed_at
        FROM club_changes
        WHERE club_id = $1 AND seq > $2
        ORDER BY seq
        LIMIT $3
        "#,
    )
    .bind(club_id)
    .bind(query.since)
    .bind(limit + 1)
    .fetch_all(pool)
    .await?;

    let truncated = changes.len() as i64 > limit;
    changes.truncate(limit as usize);

    Ok(build_response(query.since, changes, truncated))
}

fn effective_limit(requested: Option<i64>) -> Result<i64, AppError> {
    match requested {
        None => Ok(DEFAULT_LIMIT),
        Some(n) if (1..=MAX_LIMIT).contains(&n) => Ok(n),
        Some(_) => Err(AppError::InvalidRequest(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        ))),
    }
}

fn build_response(since: i64, changes: Vec<ClubChange>, truncated: bool) -> ChangesResponse {
    let latest_seq = changes.last().map_or(since, |c| c.seq);

    let invalidate = if truncated {
        ALL_QUERY_KEYS.to_vec()
    } else {
        // Rows with entity names this build does not know are skipped
        keys_to_invalidate(changes.iter().filter_map(|c| c.entity.parse::<Entity>().ok()))
    };

    ChangesResponse {
        latest_seq,
        changes,
        invalidate,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn change(seq: i64, entity: &str) -> ClubChange {
        ClubChange {
            seq,
            club_id: Uuid::nil(),
            entity: entity.to_string(),
            entity_id: Some(Uuid::new_v4()),
            action: "created".to_string(),
            changed_at: Utc::now(),
        }
    }

    #[test]
    fn empty_page_keeps_the_cursor() {
        let response = build_response(42, Vec::new(), false);
        assert_eq!(response.latest_seq, 42);
        assert!(response.invalidate.is_empty());
        assert!(!response.truncated);
    }

    #[test]
    fn cursor_advances_to_the_last_change() {
        let response = build_response(
            10,
            vec![change(11, "members"), change(15, "finances")],
            false,
        );
        assert_eq!(response.latest_seq, 15);
        assert_eq!(
            response.invalidate,
            vec!["members", "teams", "dashboard", "finances", "finance-summary"]
        );
    }

    #[test]
    fn truncated_page_invalidates_everything() {
        let response = build_response(0, vec![change(1, "notifications")], true);
        assert!(response.truncated);
        assert_eq!(response.invalidate, ALL_QUERY_KEYS.to_vec());
    }

    #[test]
    fn unknown_entities_are_ignored() {
        let response = build_response(0, vec![change(1, "legacy"), change(2, "users")], false);
        assert_eq!(response.invalidate, vec!["users", "permissions"]);
    }

    #[test]
    fn limit_is_bounded() {
        assert_eq!(effective_limit(None).unwrap(), DEFAULT_LIMIT);
        assert_eq!(effective_limit(Some(MAX_LIMIT)).unwrap(), MAX_LIMIT);
        assert!(effective_limit(Some(0)).is_err());
        assert!(effective_limit(Some(MAX_LIMIT + 1)).is_err());
    }
}
