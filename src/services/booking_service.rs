//! Facility bookings.
//!
//! Bookings are written inside a database transaction that first locks the
//! facility row with `FOR UPDATE`. Every writer for a facility therefore
//! runs its overlap check and insert one at a time, so two requests can
//! never both book the same slot.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        booking::{
            Booking, BookingFilter, CreateBookingRequest, STATUS_CANCELLED, STATUS_CONFIRMED,
            UpdateBookingRequest, intervals_overlap,
        },
        change::{Action, Entity},
    },
    services::{change_service, optional_text, required_text, team_service},
};

fn validate_window(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<(), AppError> {
    if ends_at <= starts_at {
        return Err(AppError::InvalidRequest(
            "ends_at must be after starts_at".to_string(),
        ));
    }
    Ok(())
}

/// Lock the facility row and check that it belongs to the club and is active.
async fn lock_facility(
    conn: &mut PgConnection,
    club_id: Uuid,
    facility_id: Uuid,
) -> Result<(), AppError> {
    let is_active: bool = sqlx::query_scalar(
        "SELECT is_active FROM facilities WHERE id = $1 AND club_id = $2 FOR UPDATE",
    )
    .bind(facility_id)
    .bind(club_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound("facility"))?;

    if !is_active {
        return Err(AppError::Conflict(
            "Facility is inactive and cannot be booked".to_string(),
        ));
    }
    Ok(())
}

/// Fail with 409 if a confirmed booking of the facility overlaps the window.
///
/// `exclude` skips the booking being rescheduled. The predicate matches
/// `booking::intervals_overlap` on half-open intervals.
async fn ensure_no_overlap(
    conn: &mut PgConnection,
    facility_id: Uuid,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> Result<(), AppError> {
    let clash: Option<(Uuid, String, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT id, title, starts_at, ends_at
        FROM bookings
        WHERE facility_id = $1
          AND status = 'confirmed'
          AND starts_at < $3
          AND $2 < ends_at
          AND ($4::uuid IS NULL OR id <> $4)
        ORDER BY starts_at
        LIMIT 1
        "#,
    )
    .bind(facility_id)
    .bind(starts_at)
    .bind(ends_at)
    .bind(exclude)
    .fetch_optional(&mut *conn)
    .await?
    .filter(|(_, _, clash_start, clash_end)| {
        intervals_overlap(starts_at, ends_at, *clash_start, *clash_end)
    });

    match clash {
        Some((id, title, clash_start, clash_end)) => {
            tracing::debug!(facility_id = %facility_id, clashing_booking = %id, "Booking overlap");
            Err(AppError::Conflict(format!(
                "Facility is already booked for '{title}' from {} to {}",
                clash_start.to_rfc3339(),
                clash_end.to_rfc3339()
            )))
        }
        None => Ok(()),
    }
}

pub async fn list_bookings(
    pool: &DbPool,
    club_id: Uuid,
    filter: BookingFilter,
) -> Result<Vec<Booking>, AppError> {
    let bookings = sqlx::query_as::<_, Booking>(
        r#"
        SELECT *
        FROM bookings
        WHERE club_id = $1
          AND ($2::uuid IS NULL OR facility_id = $2)
          AND ($3::uuid IS NULL OR team_id = $3)
          AND ($4::timestamptz IS NULL OR ends_at > $4)
          AND ($5::timestamptz IS NULL OR starts_at < $5)
          AND ($6 OR status = 'confirmed')
        ORDER BY starts_at
        "#,
    )
    .bind(club_id)
    .bind(filter.facility_id)
    .bind(filter.team_id)
    .bind(filter.from)
    .bind(filter.to)
    .bind(filter.include_cancelled)
    .fetch_all(pool)
    .await?;

    Ok(bookings)
}

pub async fn get_booking(pool: &DbPool, club_id: Uuid, booking_id: Uuid) -> Result<Booking, AppError> {
    sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 AND club_id = $2")
        .bind(booking_id)
        .bind(club_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("booking"))
}

/// Book a facility.
///
/// # Errors
///
/// - `InvalidRequest`: empty title or `ends_at <= starts_at`
/// - `NotFound`: facility or team not in this club
/// - `Conflict`: facility inactive or the slot overlaps a confirmed booking
pub async fn create_booking(
    pool: &DbPool,
    club_id: Uuid,
    booked_by: Uuid,
    request: CreateBookingRequest,
) -> Result<Booking, AppError> {
    let title = required_text("title", &request.title, 200)?;
    validate_window(request.starts_at, request.ends_at)?;

    let mut tx = pool.begin().await?;

    lock_facility(&mut tx, club_id, request.facility_id).await?;
    if let Some(team_id) = request.team_id {
        team_service::ensure_team_in_club(&mut *tx, club_id, team_id).await?;
    }
    ensure_no_overlap(
        &mut tx,
        request.facility_id,
        request.starts_at,
        request.ends_at,
        None,
    )
    .await?;

    let booking = sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings (
            club_id, facility_id, team_id, booked_by, title, starts_at, ends_at, status, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(club_id)
    .bind(request.facility_id)
    .bind(request.team_id)
    .bind(booked_by)
    .bind(title)
    .bind(request.starts_at)
    .bind(request.ends_at)
    .bind(STATUS_CONFIRMED)
    .bind(optional_text(request.notes))
    .fetch_one(&mut *tx)
    .await?;

    change_service::record(&mut *tx, club_id, Entity::Bookings, Some(booking.id), Action::Created)
        .await?;

    tx.commit().await?;

    tracing::info!(
        club_id = %club_id,
        booking_id = %booking.id,
        facility_id = %booking.facility_id,
        "Booking created"
    );
    Ok(booking)
}

/// Update or reschedule a confirmed booking.
///
/// A change of facility or time re-runs the overlap check, ignoring the
/// booking itself.
pub async fn update_booking(
    pool: &DbPool,
    club_id: Uuid,
    booking_id: Uuid,
    request: UpdateBookingRequest,
) -> Result<Booking, AppError> {
    let title = request
        .title
        .map(|t| required_text("title", &t, 200))
        .transpose()?;

    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings WHERE id = $1 AND club_id = $2 FOR UPDATE",
    )
    .bind(booking_id)
    .bind(club_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("booking"))?;

    if existing.status == STATUS_CANCELLED {
        tx.rollback().await?;
        return Err(AppError::Conflict(
            "Cancelled bookings cannot be changed".to_string(),
        ));
    }

    let facility_id = request.facility_id.unwrap_or(existing.facility_id);
    let starts_at = request.starts_at.unwrap_or(existing.starts_at);
    let ends_at = request.ends_at.unwrap_or(existing.ends_at);
    validate_window(starts_at, ends_at)?;

    if let Some(team_id) = request.team_id {
        team_service::ensure_team_in_club(&mut *tx, club_id, team_id).await?;
    }

    let rescheduled = facility_id != existing.facility_id
        || starts_at != existing.starts_at
        || ends_at != existing.ends_at;
    if rescheduled {
        lock_facility(&mut tx, club_id, facility_id).await?;
        ensure_no_overlap(&mut tx, facility_id, starts_at, ends_at, Some(booking_id)).await?;
    }

    let booking = sqlx::query_as::<_, Booking>(
        r#"
        UPDATE bookings
        SET facility_id = $2,
            team_id = COALESCE($3, team_id),
            title = COALESCE($4, title),
            starts_at = $5,
            ends_at = $6,
            notes = COALESCE($7, notes),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(booking_id)
    .bind(facility_id)
    .bind(request.team_id)
    .bind(title)
    .bind(starts_at)
    .bind(ends_at)
    .bind(optional_text(request.notes))
    .fetch_one(&mut *tx)
    .await?;

    change_service::record(&mut *tx, club_id, Entity::Bookings, Some(booking_id), Action::Updated)
        .await?;

    tx.commit().await?;

    Ok(booking)
}

/// Cancel a booking, freeing its slot. Cancelling twice is a 409.
pub async fn cancel_booking(
    pool: &DbPool,
    club_id: Uuid,
    booking_id: Uuid,
) -> Result<Booking, AppError> {
    let mut tx = pool.begin().await?;

    let status: String =
        sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1 AND club_id = $2 FOR UPDATE")
            .bind(booking_id)
            .bind(club_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("booking"))?;

    if status == STATUS_CANCELLED {
        tx.rollback().await?;
        return Err(AppError::Conflict("Booking is already cancelled".to_string()));
    }

    let booking = sqlx::query_as::<_, Booking>(
        r#"
        UPDATE bookings
        SET status = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(booking_id)
    .bind(STATUS_CANCELLED)
    .fetch_one(&mut *tx)
    .await?;

    change_service::record(&mut *tx, club_id, Entity::Bookings, Some(booking_id), Action::Updated)
        .await?;

    tx.commit().await?;

    tracing::info!(club_id = %club_id, booking_id = %booking_id, "Booking cancelled");
    Ok(booking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::facility::CreateFacilityRequest, services::facility_service, test_support,
    };
    use chrono::{Duration, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, hour, 0, 0).unwrap()
    }

    struct Fixture {
        club_id: Uuid,
        user_id: Uuid,
        facility_id: Uuid,
    }

    async fn fixture(pool: &DbPool) -> Fixture {
        let owner = test_support::user(pool, "owner@example.com").await;
        let club = test_support::club(pool, &owner, "Riverside Tennis").await;
        let facility = facility_service::create_facility(
            pool,
            club.id,
            CreateFacilityRequest {
                name: "Court 1".to_string(),
                kind: Some("court".to_string()),
                capacity: Some(4),
                location: None,
            },
        )
        .await
        .unwrap();

        Fixture {
            club_id: club.id,
            user_id: owner.user_id,
            facility_id: facility.id,
        }
    }

    async fn book(
        pool: &DbPool,
        f: &Fixture,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<Booking, AppError> {
        create_booking(
            pool,
            f.club_id,
            f.user_id,
            CreateBookingRequest {
                facility_id: f.facility_id,
                team_id: None,
                title: "Training".to_string(),
                starts_at,
                ends_at,
                notes: None,
            },
        )
        .await
    }

    #[test]
    fn window_must_have_positive_length() {
        let start = Utc::now();
        assert!(validate_window(start, start + Duration::minutes(30)).is_ok());
        assert!(validate_window(start, start).is_err());
        assert!(validate_window(start, start - Duration::minutes(1)).is_err());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn overlapping_slot_is_rejected(pool: DbPool) {
        let f = fixture(&pool).await;
        book(&pool, &f, at(10), at(12)).await.unwrap();

        let clash = book(&pool, &f, at(11), at(13)).await;
        assert!(matches!(clash, Err(AppError::Conflict(_))));

        let inside = book(&pool, &f, at(10) + Duration::minutes(30), at(11)).await;
        assert!(matches!(inside, Err(AppError::Conflict(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn back_to_back_bookings_are_allowed(pool: DbPool) {
        let f = fixture(&pool).await;
        book(&pool, &f, at(10), at(12)).await.unwrap();
        book(&pool, &f, at(12), at(14)).await.unwrap();
        book(&pool, &f, at(8), at(10)).await.unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn reschedule_ignores_the_booking_itself(pool: DbPool) {
        let f = fixture(&pool).await;
        let booking = book(&pool, &f, at(10), at(12)).await.unwrap();
        book(&pool, &f, at(14), at(16)).await.unwrap();

        let moved = update_booking(
            &pool,
            f.club_id,
            booking.id,
            UpdateBookingRequest {
                starts_at: Some(at(11)),
                ends_at: Some(at(13)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(moved.starts_at, at(11));

        let onto_other = update_booking(
            &pool,
            f.club_id,
            booking.id,
            UpdateBookingRequest {
                starts_at: Some(at(13)),
                ends_at: Some(at(15)),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(onto_other, Err(AppError::Conflict(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn cancelled_booking_frees_its_slot(pool: DbPool) {
        let f = fixture(&pool).await;
        let booking = book(&pool, &f, at(10), at(12)).await.unwrap();

        let cancelled = cancel_booking(&pool, f.club_id, booking.id).await.unwrap();
        assert_eq!(cancelled.status, STATUS_CANCELLED);
        assert!(matches!(
            cancel_booking(&pool, f.club_id, booking.id).await,
            Err(AppError::Conflict(_))
        ));

        book(&pool, &f, at(10), at(12)).await.unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn inactive_facility_cannot_be_booked(pool: DbPool) {
        let f = fixture(&pool).await;
        facility_service::deactivate_facility(&pool, f.club_id, f.facility_id)
            .await
            .unwrap();

        let booked = book(&pool, &f, at(10), at(12)).await;
        assert!(matches!(booked, Err(AppError::Conflict(_))));
    }
}
