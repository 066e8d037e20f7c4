//! Announcement and notification HTTP handlers.
//!
//! Notifications are always scoped to the caller; there is no way to read
//! another user's inbox.

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::communication::{
        Announcement, CreateAnnouncementRequest, MarkedRead, Notification, NotificationFilter,
        UnreadCount, UpdateAnnouncementRequest,
    },
    permissions::{ClubAccess, Permission},
    services::communication_service,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn list_announcements(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
) -> Result<Json<Vec<Announcement>>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewClub)?;

    let announcements = communication_service::list_announcements(&pool, club_id).await?;
    Ok(Json(announcements))
}

/// Post an announcement. Every other club user gets a notification.
pub async fn create_announcement(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Json(request): Json<CreateAnnouncementRequest>,
) -> Result<impl IntoResponse, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::PostAnnouncements)?;

    let announcement =
        communication_service::create_announcement(&pool, club_id, auth.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

pub async fn update_announcement(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, announcement_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateAnnouncementRequest>,
) -> Result<Json<Announcement>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::PostAnnouncements)?;

    let announcement =
        communication_service::update_announcement(&pool, club_id, announcement_id, request)
            .await?;
    Ok(Json(announcement))
}

pub async fn delete_announcement(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, announcement_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::PostAnnouncements)?;

    communication_service::delete_announcement(&pool, club_id, announcement_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_notifications(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Query(filter): Query<NotificationFilter>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;

    let notifications =
        communication_service::list_notifications(&pool, club_id, access.user_id, filter).await?;
    Ok(Json(notifications))
}

pub async fn unread_count(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
) -> Result<Json<UnreadCount>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;

    let count = communication_service::unread_count(&pool, club_id, access.user_id).await?;
    Ok(Json(count))
}

pub async fn mark_read(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, notification_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Notification>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;

    let notification =
        communication_service::mark_read(&pool, club_id, access.user_id, notification_id).await?;
    Ok(Json(notification))
}

pub async fn mark_all_read(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
) -> Result<Json<MarkedRead>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;

    let marked = communication_service::mark_all_read(&pool, club_id, access.user_id).await?;
    Ok(Json(marked))
}
