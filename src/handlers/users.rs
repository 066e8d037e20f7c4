//! Club user administration and invitation HTTP handlers.
//!
//! - GET /api/v1/clubs/{club_id}/users
//! - PATCH/DELETE /api/v1/clubs/{club_id}/users/{user_id}
//! - GET/POST /api/v1/clubs/{club_id}/invitations
//! - DELETE /api/v1/clubs/{club_id}/invitations/{invitation_id}
//! - POST /api/v1/invitations/{token}/accept (public)

use std::sync::Arc;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::{self, AuthContext},
    models::{
        club::{ClubUser, UpdateRoleRequest},
        invitation::{
            AcceptInvitationRequest, AcceptInvitationResponse, CreateInvitationRequest,
            InvitationResponse,
        },
    },
    permissions::{ClubAccess, Permission, Role},
    services::{email_service::Mailer, user_service},
    state::AppSettings,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn list_users(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
) -> Result<Json<Vec<ClubUser>>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageUsers)?;

    let users = user_service::list_club_users(&pool, club_id).await?;
    Ok(Json(users))
}

/// Change a club user's role.
///
/// # Request Body
///
/// ```json
/// { "role": "treasurer" }
/// ```
///
/// # Response
///
/// - **200 OK**: the updated membership
/// - **403 Forbidden**: caller's role does not outrank the current or new role
/// - **409 Conflict**: would demote the last owner
pub async fn update_role(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, user_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<ClubUser>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    let role: Role = request.role.parse()?;

    let user = user_service::update_role(&pool, &access, user_id, role).await?;
    Ok(Json(user))
}

/// Remove a user from the club. Any user may remove themselves.
pub async fn remove_user(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;

    user_service::remove_user(&pool, &access, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_invitations(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
) -> Result<Json<Vec<InvitationResponse>>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageUsers)?;

    let invitations = user_service::list_invitations(&pool, club_id).await?;
    Ok(Json(invitations))
}

/// Invite someone by email.
///
/// The accept link is emailed in the background; the response carries the
/// token and link once so the inviter can share it directly.
///
/// # Response
///
/// - **201 Created**
/// - **409 Conflict**: already a member, or a pending invitation exists
pub async fn create_invitation(
    State(pool): State<DbPool>,
    State(mailer): State<Mailer>,
    State(settings): State<Arc<AppSettings>>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Json(request): Json<CreateInvitationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;

    let invitation =
        user_service::create_invitation(&pool, &mailer, &settings, &access, &auth, request)
            .await?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

pub async fn revoke_invitation(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, invitation_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageUsers)?;

    user_service::revoke_invitation(&pool, club_id, invitation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Accept an invitation.
///
/// Public for new emails, where the token is the credential. An invitation
/// to an existing account must be accepted with that account's bearer
/// token in the `Authorization` header.
///
/// # Request Body
///
/// ```json
/// { "display_name": "Sam Carter" }
/// ```
///
/// # Response
///
/// - **200 OK**: `{user, club_id, role}`, plus `access_token` for a new user
/// - **401 Unauthorized**: the email has an account and no valid token was sent
/// - **403 Forbidden**: signed in as a different account
/// - **404 Not Found**: unknown token
/// - **409 Conflict**: already accepted
/// - **400 Bad Request**: expired
pub async fn accept_invitation(
    State(pool): State<DbPool>,
    headers: HeaderMap,
    Path(token): Path<String>,
    Json(request): Json<AcceptInvitationRequest>,
) -> Result<Json<AcceptInvitationResponse>, AppError> {
    let caller = auth::optional_caller(&pool, &headers).await?;
    let accepted =
        user_service::accept_invitation(&pool, &token, request.display_name, caller.as_ref())
            .await?;
    Ok(Json(accepted))
}
