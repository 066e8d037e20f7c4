//! Team HTTP handlers.
//!
//! - GET/POST /api/v1/clubs/{club_id}/teams
//! - GET/PATCH/DELETE /api/v1/clubs/{club_id}/teams/{team_id}
//! - GET /api/v1/clubs/{club_id}/teams/{team_id}/members
//! - PUT/DELETE /api/v1/clubs/{club_id}/teams/{team_id}/members/{member_id}

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::team::{AssignMemberRequest, CreateTeamRequest, Team, TeamMember, UpdateTeamRequest},
    permissions::{ClubAccess, Permission},
    services::team_service,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn list_teams(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
) -> Result<Json<Vec<Team>>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewClub)?;

    let teams = team_service::list_teams(&pool, club_id).await?;
    Ok(Json(teams))
}

/// Create a team.
///
/// # Response
///
/// - **201 Created**
/// - **409 Conflict**: a team with this name exists in the club
/// - **403 plan_limit_reached**: the club's plan allows no more teams
pub async fn create_team(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Json(request): Json<CreateTeamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageTeams)?;

    let team = team_service::create_team(&pool, club_id, request).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

pub async fn get_team(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, team_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Team>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewClub)?;

    let team = team_service::get_team(&pool, club_id, team_id).await?;
    Ok(Json(team))
}

pub async fn update_team(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, team_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateTeamRequest>,
) -> Result<Json<Team>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageTeams)?;

    let team = team_service::update_team(&pool, club_id, team_id, request).await?;
    Ok(Json(team))
}

pub async fn delete_team(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, team_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageTeams)?;

    team_service::delete_team(&pool, club_id, team_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_team_members(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, team_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<TeamMember>>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewMembers)?;

    let members = team_service::list_team_members(&pool, club_id, team_id).await?;
    Ok(Json(members))
}

/// Put a roster member on the team (idempotent; updates the position).
pub async fn assign_member(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, team_id, member_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(request): Json<AssignMemberRequest>,
) -> Result<Json<TeamMember>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageTeams)?;

    let assigned =
        team_service::assign_member(&pool, club_id, team_id, member_id, request.position).await?;
    Ok(Json(assigned))
}

pub async fn remove_member(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, team_id, member_id)): Path<(Uuid, Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageTeams)?;

    team_service::remove_member(&pool, club_id, team_id, member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
