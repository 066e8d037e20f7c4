//! Facility booking HTTP handlers.
//!
//! - GET /api/v1/clubs/{club_id}/bookings?facility_id=&team_id=&from=&to=&include_cancelled=
//! - POST /api/v1/clubs/{club_id}/bookings
//! - GET/PATCH /api/v1/clubs/{club_id}/bookings/{booking_id}
//! - POST /api/v1/clubs/{club_id}/bookings/{booking_id}/cancel

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::booking::{Booking, BookingFilter, CreateBookingRequest, UpdateBookingRequest},
    permissions::{ClubAccess, Permission},
    services::booking_service,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn list_bookings(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Query(filter): Query<BookingFilter>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewClub)?;

    let bookings = booking_service::list_bookings(&pool, club_id, filter).await?;
    Ok(Json(bookings))
}

/// Book a facility.
///
/// # Request Body
///
/// ```json
/// {
///   "facility_id": "550e8400-e29b-41d4-a716-446655440000",
///   "team_id": null,
///   "title": "U12 training",
///   "starts_at": "2026-03-01T17:00:00Z",
///   "ends_at": "2026-03-01T18:30:00Z"
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the confirmed booking
/// - **400 Bad Request**: `ends_at` not after `starts_at`
/// - **409 Conflict**: overlaps a confirmed booking, or the facility is inactive
pub async fn create_booking(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageBookings)?;

    let booking = booking_service::create_booking(&pool, club_id, auth.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn get_booking(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, booking_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Booking>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewClub)?;

    let booking = booking_service::get_booking(&pool, club_id, booking_id).await?;
    Ok(Json(booking))
}

/// Edit or reschedule a booking. A new time window is checked against
/// the facility's other confirmed bookings.
pub async fn update_booking(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, booking_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageBookings)?;

    let booking = booking_service::update_booking(&pool, club_id, booking_id, request).await?;
    Ok(Json(booking))
}

pub async fn cancel_booking(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, booking_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Booking>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageBookings)?;

    let booking = booking_service::cancel_booking(&pool, club_id, booking_id).await?;
    Ok(Json(booking))
}
