//! Roster member HTTP handlers.
//!
//! - GET /api/v1/clubs/{club_id}/members?status=&search=&team_id=
//! - POST /api/v1/clubs/{club_id}/members
//! - GET/PATCH/DELETE /api/v1/clubs/{club_id}/members/{member_id}

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::member::{CreateMemberRequest, Member, MemberFilter, UpdateMemberRequest},
    permissions::{ClubAccess, Permission},
    services::member_service,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn list_members(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Query(filter): Query<MemberFilter>,
) -> Result<Json<Vec<Member>>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewMembers)?;

    let members = member_service::list_members(&pool, club_id, filter).await?;
    Ok(Json(members))
}

/// Add a member to the roster.
///
/// # Response
///
/// - **201 Created**: the new member
/// - **403 plan_limit_reached**: the club's plan allows no more members
pub async fn create_member(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Json(request): Json<CreateMemberRequest>,
) -> Result<impl IntoResponse, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageMembers)?;

    let member = member_service::create_member(&pool, club_id, request).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn get_member(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Member>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewMembers)?;

    let member = member_service::get_member(&pool, club_id, member_id).await?;
    Ok(Json(member))
}

pub async fn update_member(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, member_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateMemberRequest>,
) -> Result<Json<Member>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageMembers)?;

    let member = member_service::update_member(&pool, club_id, member_id, request).await?;
    Ok(Json(member))
}

pub async fn delete_member(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageMembers)?;

    member_service::delete_member(&pool, club_id, member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
