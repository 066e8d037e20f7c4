//! Facility HTTP handlers.

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::facility::{CreateFacilityRequest, Facility, UpdateFacilityRequest},
    permissions::{ClubAccess, Permission},
    services::facility_service,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn list_facilities(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
) -> Result<Json<Vec<Facility>>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewClub)?;

    let facilities = facility_service::list_facilities(&pool, club_id).await?;
    Ok(Json(facilities))
}

pub async fn create_facility(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Json(request): Json<CreateFacilityRequest>,
) -> Result<impl IntoResponse, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageFacilities)?;

    let facility = facility_service::create_facility(&pool, club_id, request).await?;
    Ok((StatusCode::CREATED, Json(facility)))
}

pub async fn get_facility(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, facility_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Facility>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewClub)?;

    let facility = facility_service::get_facility(&pool, club_id, facility_id).await?;
    Ok(Json(facility))
}

pub async fn update_facility(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, facility_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateFacilityRequest>,
) -> Result<Json<Facility>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageFacilities)?;

    let facility =
        facility_service::update_facility(&pool, club_id, facility_id, request).await?;
    Ok(Json(facility))
}

/// Deactivate a facility (soft delete). Returns 204 No Content.
pub async fn delete_facility(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, facility_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageFacilities)?;

    facility_service::deactivate_facility(&pool, club_id, facility_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
