//! Facility management.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        change::{Action, Entity},
        facility::{CreateFacilityRequest, Facility, UpdateFacilityRequest},
        plan::LimitedResource,
    },
    services::{change_service, optional_text, required_text, subscription_service},
};
use uuid::Uuid;

fn validate_capacity(capacity: Option<i32>) -> Result<(), AppError> {
    match capacity {
        Some(c) if c <= 0 => Err(AppError::InvalidRequest(
            "capacity must be positive".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Active facilities first, then by name.
pub async fn list_facilities(pool: &DbPool, club_id: Uuid) -> Result<Vec<Facility>, AppError> {
    let facilities = sqlx::query_as::<_, Facility>(
        "SELECT * FROM facilities WHERE club_id = $1 ORDER BY is_active DESC, name",
    )
    .bind(club_id)
    .fetch_all(pool)
    .await?;

    Ok(facilities)
}

pub async fn get_facility(
    pool: &DbPool,
    club_id: Uuid,
    facility_id: Uuid,
) -> Result<Facility, AppError> {
    sqlx::query_as::<_, Facility>("SELECT * FROM facilities WHERE id = $1 AND club_id = $2")
        .bind(facility_id)
        .bind(club_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("facility"))
}

pub async fn create_facility(
    pool: &DbPool,
    club_id: Uuid,
    request: CreateFacilityRequest,
) -> Result<Facility, AppError> {
    let name = required_text("name", &request.name, 100)?;
    validate_capacity(request.capacity)?;

    let mut tx = pool.begin().await?;

    subscription_service::ensure_capacity(&mut tx, club_id, LimitedResource::Facilities).await?;

    let facility = sqlx::query_as::<_, Facility>(
        r#"
        INSERT INTO facilities (club_id, name, kind, capacity, location)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(club_id)
    .bind(name)
    .bind(optional_text(request.kind))
    .bind(request.capacity)
    .bind(optional_text(request.location))
    .fetch_one(&mut *tx)
    .await?;

    change_service::record(
        &mut *tx,
        club_id,
        Entity::Facilities,
        Some(facility.id),
        Action::Created,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(club_id = %club_id, facility_id = %facility.id, "Facility created");
    Ok(facility)
}

/// Update a facility. Reactivating one counts against the plan limit.
pub async fn update_facility(
    pool: &DbPool,
    club_id: Uuid,
    facility_id: Uuid,
    request: UpdateFacilityRequest,
) -> Result<Facility, AppError> {
    let name = request
        .name
        .map(|n| required_text("name", &n, 100))
        .transpose()?;
    validate_capacity(request.capacity)?;

    let mut tx = pool.begin().await?;

    if request.is_active == Some(true) {
        let currently_active: Option<bool> = sqlx::query_scalar(
            "SELECT is_active FROM facilities WHERE id = $1 AND club_id = $2",
        )
        .bind(facility_id)
        .bind(club_id)
        .fetch_optional(&mut *tx)
        .await?;

        if currently_active == Some(false) {
            subscription_service::ensure_capacity(&mut tx, club_id, LimitedResource::Facilities)
                .await?;
        }
    }

    let facility = sqlx::query_as::<_, Facility>(
        r#"
        UPDATE facilities
        SET name = COALESCE($3, name),
            kind = COALESCE($4, kind),
            capacity = COALESCE($5, capacity),
            location = COALESCE($6, location),
            is_active = COALESCE($7, is_active)
        WHERE id = $1 AND club_id = $2
        RETURNING *
        "#,
    )
    .bind(facility_id)
    .bind(club_id)
    .bind(name)
    .bind(optional_text(request.kind))
    .bind(request.capacity)
    .bind(optional_text(request.location))
    .bind(request.is_active)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("facility"))?;

    change_service::record(
        &mut *tx,
        club_id,
        Entity::Facilities,
        Some(facility_id),
        Action::Updated,
    )
    .await?;

    tx.commit().await?;

    Ok(facility)
}

/// Deactivate a facility. Its booking history is kept.
pub async fn deactivate_facility(
    pool: &DbPool,
    club_id: Uuid,
    facility_id: Uuid,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE facilities SET is_active = false WHERE id = $1 AND club_id = $2 AND is_active",
    )
    .bind(facility_id)
    .bind(club_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(AppError::NotFound("facility"));
    }

    change_service::record(
        &mut *tx,
        club_id,
        Entity::Facilities,
        Some(facility_id),
        Action::Deleted,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(club_id = %club_id, facility_id = %facility_id, "Facility deactivated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[sqlx::test(migrations = "./migrations")]
    async fn facility_lifecycle(pool: DbPool) {
        let owner = test_support::user(&pool, "owner@example.com").await;
        let club = test_support::club(&pool, &owner, "Lakeside Rowing").await;

        let zero = create_facility(
            &pool,
            club.id,
            CreateFacilityRequest {
                name: "Boathouse".to_string(),
                kind: None,
                capacity: Some(0),
                location: None,
            },
        )
        .await;
        assert!(matches!(zero, Err(AppError::InvalidRequest(_))));

        let boathouse = create_facility(
            &pool,
            club.id,
            CreateFacilityRequest {
                name: "  Boathouse ".to_string(),
                kind: Some("shed".to_string()),
                capacity: Some(12),
                location: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(boathouse.name, "Boathouse");

        let renamed = update_facility(
            &pool,
            club.id,
            boathouse.id,
            UpdateFacilityRequest {
                location: Some("North bank".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.capacity, Some(12));
        assert_eq!(renamed.location.as_deref(), Some("North bank"));

        deactivate_facility(&pool, club.id, boathouse.id).await.unwrap();
        let again = deactivate_facility(&pool, club.id, boathouse.id).await;
        assert!(matches!(again, Err(AppError::NotFound("facility"))));

        let listed = list_facilities(&pool, club.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].is_active);
    }
}
