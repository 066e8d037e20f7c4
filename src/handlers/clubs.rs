//! Club HTTP handlers.
//!
//! - POST /api/v1/clubs - Create a club (caller becomes owner)
//! - GET /api/v1/clubs - Clubs the caller belongs to
//! - GET/PATCH/DELETE /api/v1/clubs/{club_id}
//! - GET /api/v1/clubs/{club_id}/permissions - Caller's role and permissions
//! - GET /api/v1/clubs/{club_id}/changes - Change feed and keys to refetch

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        change::{ChangesQuery, ChangesResponse},
        club::{Club, CreateClubRequest, PermissionsResponse, UpdateClubRequest},
    },
    permissions::{ClubAccess, Permission},
    services::{change_service, club_service},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

/// Create a new club.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Riverside Rowing Club",
///   "timezone": "Europe/London"
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the club, on the free plan, owned by the caller
/// - **409 Conflict**: slug already taken
pub async fn create_club(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateClubRequest>,
) -> Result<impl IntoResponse, AppError> {
    let club = club_service::create_club(&pool, &auth, request).await?;
    Ok((StatusCode::CREATED, Json(club)))
}

pub async fn list_clubs(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<Club>>, AppError> {
    let clubs = club_service::list_clubs(&pool, &auth).await?;
    Ok(Json(clubs))
}

/// Get a club.
///
/// Returns 404 both for unknown clubs and for clubs the caller does not
/// belong to.
pub async fn get_club(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
) -> Result<Json<Club>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewClub)?;

    let club = club_service::get_club(&pool, club_id).await?;
    Ok(Json(club))
}

pub async fn update_club(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Json(request): Json<UpdateClubRequest>,
) -> Result<Json<Club>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageClub)?;

    let club = club_service::update_club(&pool, club_id, request).await?;
    Ok(Json(club))
}

/// Delete a club and all of its data. Owners only.
pub async fn delete_club(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageSubscription)?;

    club_service::delete_club(&pool, club_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's role and the permissions it grants.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "club_id": "550e8400-e29b-41d4-a716-446655440000",
///   "role": "coach",
///   "permissions": ["view_club", "view_members", "manage_members", "manage_teams", ...]
/// }
/// ```
pub async fn get_permissions(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
) -> Result<Json<PermissionsResponse>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;

    Ok(Json(PermissionsResponse {
        club_id,
        role: access.role.as_str().to_string(),
        permissions: access.permission_names(),
    }))
}

/// Changes since a sequence number, with the query keys clients should
/// refetch.
///
/// # Query Parameters
///
/// - `since` - last `latest_seq` the client saw (default 0)
/// - `limit` - page size, 1-1000 (default 200)
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "latest_seq": 1042,
///   "changes": [
///     { "seq": 1042, "entity": "bookings", "entity_id": "...", "action": "created", ... }
///   ],
///   "invalidate": ["bookings", "calendar", "facilities", "dashboard"],
///   "truncated": false
/// }
/// ```
pub async fn list_changes(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Query(query): Query<ChangesQuery>,
) -> Result<Json<ChangesResponse>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewClub)?;

    let changes = change_service::list_changes(&pool, club_id, query).await?;
    Ok(Json(changes))
}
