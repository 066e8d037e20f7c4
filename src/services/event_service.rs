//! Calendar events and the merged club calendar.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        change::{Action, Entity},
        event::{
            CalendarEntry, CalendarWindow, CreateEventRequest, EVENT_TYPES, Event,
            UpdateEventRequest,
        },
    },
    services::{change_service, one_of, optional_text, required_text, team_service},
};

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const MAX_WINDOW_DAYS: i64 = 366;

/// Resolve a calendar window, defaulting to the next 30 days.
///
/// Only `from` given: the window runs 30 days from it. Only `to` given: it
/// ends there and starts 30 days earlier.
pub fn resolve_window(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let default_span = Duration::days(DEFAULT_WINDOW_DAYS);
    let (from, to) = match (from, to) {
        (Some(from), Some(to)) => (from, to),
        (Some(from), None) => (from, from + default_span),
        (None, Some(to)) => (to - default_span, to),
        (None, None) => (now, now + default_span),
    };

    if to <= from {
        return Err(AppError::InvalidRequest("to must be after from".to_string()));
    }
    if to - from > Duration::days(MAX_WINDOW_DAYS) {
        return Err(AppError::InvalidRequest(format!(
            "Calendar window may span at most {MAX_WINDOW_DAYS} days"
        )));
    }
    Ok((from, to))
}

fn validate_times(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<(), AppError> {
    if ends_at < starts_at {
        return Err(AppError::InvalidRequest(
            "ends_at must not be before starts_at".to_string(),
        ));
    }
    Ok(())
}

/// Events overlapping the window, ordered by start.
pub async fn list_events(
    pool: &DbPool,
    club_id: Uuid,
    window: CalendarWindow,
) -> Result<Vec<Event>, AppError> {
    let (from, to) = resolve_window(window.from, window.to, Utc::now())?;

    let events = sqlx::query_as::<_, Event>(
        r#"
        SELECT *
        FROM events
        WHERE club_id = $1
          AND starts_at < $3
          AND ends_at >= $2
          AND ($4::uuid IS NULL OR team_id = $4)
        ORDER BY starts_at, title
        "#,
    )
    .bind(club_id)
    .bind(from)
    .bind(to)
    .bind(window.team_id)
    .fetch_all(pool)
    .await?;

    Ok(events)
}

pub async fn get_event(pool: &DbPool, club_id: Uuid, event_id: Uuid) -> Result<Event, AppError> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 AND club_id = $2")
        .bind(event_id)
        .bind(club_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("event"))
}

pub async fn create_event(
    pool: &DbPool,
    club_id: Uuid,
    created_by: Uuid,
    request: CreateEventRequest,
) -> Result<Event, AppError> {
    let title = required_text("title", &request.title, 200)?;
    one_of("event_type", &request.event_type, &EVENT_TYPES)?;
    validate_times(request.starts_at, request.ends_at)?;

    let mut tx = pool.begin().await?;

    if let Some(team_id) = request.team_id {
        team_service::ensure_team_in_club(&mut *tx, club_id, team_id).await?;
    }

    let event = sqlx::query_as::<_, Event>(
        r#"
        INSERT INTO events (
            club_id, team_id, title, description, event_type, location,
            starts_at, ends_at, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(club_id)
    .bind(request.team_id)
    .bind(title)
    .bind(optional_text(request.description))
    .bind(&request.event_type)
    .bind(optional_text(request.location))
    .bind(request.starts_at)
    .bind(request.ends_at)
    .bind(created_by)
    .fetch_one(&mut *tx)
    .await?;

    change_service::record(&mut *tx, club_id, Entity::Events, Some(event.id), Action::Created)
        .await?;

    tx.commit().await?;

    tracing::info!(club_id = %club_id, event_id = %event.id, "Event created");
    Ok(event)
}

pub async fn update_event(
    pool: &DbPool,
    club_id: Uuid,
    event_id: Uuid,
    request: UpdateEventRequest,
) -> Result<Event, AppError> {
    let title = request
        .title
        .map(|t| required_text("title", &t, 200))
        .transpose()?;
    if let Some(event_type) = &request.event_type {
        one_of("event_type", event_type, &EVENT_TYPES)?;
    }

    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, Event>(
        "SELECT * FROM events WHERE id = $1 AND club_id = $2 FOR UPDATE",
    )
    .bind(event_id)
    .bind(club_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("event"))?;

    let starts_at = request.starts_at.unwrap_or(existing.starts_at);
    let ends_at = request.ends_at.unwrap_or(existing.ends_at);
    validate_times(starts_at, ends_at)?;

    if let Some(team_id) = request.team_id {
        team_service::ensure_team_in_club(&mut *tx, club_id, team_id).await?;
    }

    let event = sqlx::query_as::<_, Event>(
        r#"
        UPDATE events
        SET team_id = COALESCE($2, team_id),
            title = COALESCE($3, title),
            description = COALESCE($4, description),
            event_type = COALESCE($5, event_type),
            location = COALESCE($6, location),
            starts_at = $7,
            ends_at = $8,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(event_id)
    .bind(request.team_id)
    .bind(title)
    .bind(optional_text(request.description))
    .bind(request.event_type)
    .bind(optional_text(request.location))
    .bind(starts_at)
    .bind(ends_at)
    .fetch_one(&mut *tx)
    .await?;

    change_service::record(&mut *tx, club_id, Entity::Events, Some(event_id), Action::Updated)
        .await?;

    tx.commit().await?;

    Ok(event)
}

pub async fn delete_event(pool: &DbPool, club_id: Uuid, event_id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("DELETE FROM events WHERE id = $1 AND club_id = $2")
        .bind(event_id)
        .bind(club_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(AppError::NotFound("event"));
    }

    change_service::record(&mut *tx, club_id, Entity::Events, Some(event_id), Action::Deleted)
        .await?;

    tx.commit().await?;

    Ok(())
}

/// Events and confirmed bookings in the window, merged by start time.
pub async fn calendar(
    pool: &DbPool,
    club_id: Uuid,
    window: CalendarWindow,
) -> Result<Vec<CalendarEntry>, AppError> {
    let (from, to) = resolve_window(window.from, window.to, Utc::now())?;

    let entries = sqlx::query_as::<_, CalendarEntry>(
        r#"
        SELECT 'event'::text AS kind, id, title, starts_at, ends_at, team_id
        FROM events
        WHERE club_id = $1 AND starts_at < $3 AND ends_at >= $2
          AND ($4::uuid IS NULL OR team_id = $4)
        UNION ALL
        SELECT 'booking'::text AS kind, id, title, starts_at, ends_at, team_id
        FROM bookings
        WHERE club_id = $1 AND status = 'confirmed' AND starts_at < $3 AND ends_at > $2
          AND ($4::uuid IS NULL OR team_id = $4)
        ORDER BY starts_at, kind, title
        "#,
    )
    .bind(club_id)
    .bind(from)
    .bind(to)
    .bind(window.team_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn default_window_is_next_thirty_days() {
        let (from, to) = resolve_window(None, None, now()).unwrap();
        assert_eq!(from, now());
        assert_eq!(to - from, Duration::days(30));
    }

    #[test]
    fn one_sided_windows_extend_thirty_days() {
        let anchor = now() + Duration::days(10);

        let (from, to) = resolve_window(Some(anchor), None, now()).unwrap();
        assert_eq!((from, to), (anchor, anchor + Duration::days(30)));

        let (from, to) = resolve_window(None, Some(anchor), now()).unwrap();
        assert_eq!((from, to), (anchor - Duration::days(30), anchor));
    }

    #[test]
    fn inverted_window_is_rejected() {
        assert!(resolve_window(Some(now()), Some(now()), now()).is_err());
        assert!(resolve_window(Some(now()), Some(now() - Duration::hours(1)), now()).is_err());
    }

    #[test]
    fn window_is_capped_at_a_year() {
        assert!(resolve_window(Some(now()), Some(now() + Duration::days(366)), now()).is_ok());
        assert!(resolve_window(Some(now()), Some(now() + Duration::days(367)), now()).is_err());
    }

    #[test]
    fn instant_events_are_allowed() {
        assert!(validate_times(now(), now()).is_ok());
        assert!(validate_times(now(), now() - Duration::minutes(1)).is_err());
    }
}
