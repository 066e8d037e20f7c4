//! Event and calendar HTTP handlers.

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::event::{CalendarEntry, CalendarWindow, CreateEventRequest, Event, UpdateEventRequest},
    permissions::{ClubAccess, Permission},
    services::event_service,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn list_events(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Query(window): Query<CalendarWindow>,
) -> Result<Json<Vec<Event>>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewClub)?;

    let events = event_service::list_events(&pool, club_id, window).await?;
    Ok(Json(events))
}

pub async fn create_event(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Json(request): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageEvents)?;

    let event = event_service::create_event(&pool, club_id, auth.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn get_event(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, event_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Event>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewClub)?;

    let event = event_service::get_event(&pool, club_id, event_id).await?;
    Ok(Json(event))
}

pub async fn update_event(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, event_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<Event>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageEvents)?;

    let event = event_service::update_event(&pool, club_id, event_id, request).await?;
    Ok(Json(event))
}

pub async fn delete_event(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, event_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageEvents)?;

    event_service::delete_event(&pool, club_id, event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Merged, start-ordered calendar of events and confirmed bookings.
///
/// # Query Parameters
///
/// - `from`, `to` - RFC 3339 window bounds; defaults to the next 30 days,
///   at most 366 days wide
/// - `team_id` - restrict to one team
///
/// # Response (200 OK)
///
/// ```json
/// [
///   { "kind": "booking", "id": "...", "title": "Pitch 1", "starts_at": "...", "ends_at": "...", "team_id": null },
///   { "kind": "event", "id": "...", "title": "League match", "starts_at": "...", "ends_at": null, "team_id": "..." }
/// ]
/// ```
pub async fn calendar(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Query(window): Query<CalendarWindow>,
) -> Result<Json<Vec<CalendarEntry>>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewClub)?;

    let entries = event_service::calendar(&pool, club_id, window).await?;
    Ok(Json(entries))
}
