//! Club user administration: roles, removal and invitations.
//!
//! Every club keeps at least one owner. Role changes and removals that
//! would leave a club ownerless are rejected with 409.

use chrono::{Duration, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        change::{Action, Entity},
        club::ClubUser,
        invitation::{
            AcceptInvitationResponse, CreateInvitationRequest, Invitation, InvitationResponse,
        },
        user::User,
    },
    permissions::{ClubAccess, Role},
    services::{
        change_service, communication_service, conflict_on_unique, email_service,
        email_service::Mailer, normalize_email, optional_text, token_service,
    },
    state::AppSettings,
};

pub async fn list_club_users(pool: &DbPool, club_id: Uuid) -> Result<Vec<ClubUser>, AppError> {
    let users = sqlx::query_as::<_, ClubUser>(
        r#"
        SELECT u.id AS user_id, u.email, u.display_name, m.role, m.joined_at
        FROM memberships m
        JOIN users u ON u.id = m.user_id
        WHERE m.club_id = $1
        ORDER BY u.display_name, u.email
        "#,
    )
    .bind(club_id)
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// Lock the membership row and return its role.
async fn lock_membership(
    conn: &mut PgConnection,
    club_id: Uuid,
    user_id: Uuid,
) -> Result<Role, AppError> {
    let role: String = sqlx::query_scalar(
        "SELECT role FROM memberships WHERE club_id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(club_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound("user"))?;

    role.parse()
}

/// Fail with 409 if `user_id` is the club's only owner.
async fn ensure_not_last_owner(
    conn: &mut PgConnection,
    club_id: Uuid,
    user_id: Uuid,
) -> Result<(), AppError> {
    // Lock all owner rows so concurrent demotions serialize
    let owners: Vec<Uuid> = sqlx::query_scalar(
        "SELECT user_id FROM memberships WHERE club_id = $1 AND role = 'owner' FOR UPDATE",
    )
    .bind(club_id)
    .fetch_all(&mut *conn)
    .await?;

    if owners == [user_id] {
        return Err(AppError::Conflict(
            "A club must keep at least one owner".to_string(),
        ));
    }
    Ok(())
}

/// Change a club user's role.
///
/// The caller must be able to manage both the user's current role and the
/// new one.
pub async fn update_role(
    pool: &DbPool,
    access: &ClubAccess,
    user_id: Uuid,
    new_role: Role,
) -> Result<ClubUser, AppError> {
    access.require_can_manage(new_role)?;

    let mut tx = pool.begin().await?;

    let current = lock_membership(&mut tx, access.club_id, user_id).await?;
    access.require_can_manage(current)?;

    if current == Role::Owner && new_role != Role::Owner {
        ensure_not_last_owner(&mut tx, access.club_id, user_id).await?;
    }

    sqlx::query("UPDATE memberships SET role = $3 WHERE club_id = $1 AND user_id = $2")
        .bind(access.club_id)
        .bind(user_id)
        .bind(new_role.as_str())
        .execute(&mut *tx)
        .await?;

    let user = sqlx::query_as::<_, ClubUser>(
        r#"
        SELECT u.id AS user_id, u.email, u.display_name, m.role, m.joined_at
        FROM memberships m
        JOIN users u ON u.id = m.user_id
        WHERE m.club_id = $1 AND m.user_id = $2
        "#,
    )
    .bind(access.club_id)
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    change_service::record(&mut *tx, access.club_id, Entity::Users, Some(user_id), Action::Updated)
        .await?;

    tx.commit().await?;

    tracing::info!(
        club_id = %access.club_id,
        user_id = %user_id,
        from = %current,
        to = %new_role,
        "Club role changed"
    );
    Ok(user)
}

/// Remove a user from a club. Users may always remove themselves, unless
/// they are the last owner.
pub async fn remove_user(pool: &DbPool, access: &ClubAccess, user_id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let current = lock_membership(&mut tx, access.club_id, user_id).await?;
    if user_id != access.user_id {
        access.require_can_manage(current)?;
    }

    if current == Role::Owner {
        ensure_not_last_owner(&mut tx, access.club_id, user_id).await?;
    }

    sqlx::query("DELETE FROM memberships WHERE club_id = $1 AND user_id = $2")
        .bind(access.club_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    change_service::record(&mut *tx, access.club_id, Entity::Users, Some(user_id), Action::Deleted)
        .await?;

    tx.commit().await?;

    tracing::info!(club_id = %access.club_id, user_id = %user_id, "User removed from club");
    Ok(())
}

/// Pending (unaccepted, unexpired) invitations, newest first.
pub async fn list_invitations(
    pool: &DbPool,
    club_id: Uuid,
) -> Result<Vec<InvitationResponse>, AppError> {
    let invitations = sqlx::query_as::<_, Invitation>(
        r#"
        SELECT *
        FROM invitations
        WHERE club_id = $1 AND accepted_at IS NULL AND expires_at > NOW()
        ORDER BY created_at DESC
        "#,
    )
    .bind(club_id)
    .fetch_all(pool)
    .await?;

    Ok(invitations.into_iter().map(Into::into).collect())
}

/// Invite someone by email and send them the accept link.
///
/// Email delivery runs in the background; the invitation (including its
/// token) is returned either way so it can be shared by other means.
pub async fn create_invitation(
    pool: &DbPool,
    mailer: &Mailer,
    settings: &AppSettings,
    access: &ClubAccess,
    inviter: &AuthContext,
    request: CreateInvitationRequest,
) -> Result<InvitationResponse, AppError> {
    let email = normalize_email(&request.email)?;
    let role: Role = request.role.trim().parse()?;
    access.require_can_manage(role)?;

    let mut tx = pool.begin().await?;

    let already_member: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM memberships m JOIN users u ON u.id = m.user_id
            WHERE m.club_id = $1 AND u.email = $2
        )
        "#,
    )
    .bind(access.club_id)
    .bind(&email)
    .fetch_one(&mut *tx)
    .await?;
    if already_member {
        tx.rollback().await?;
        return Err(AppError::Conflict(format!(
            "{email} is already a member of this club"
        )));
    }

    let pending: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM invitations
            WHERE club_id = $1 AND email = $2 AND accepted_at IS NULL AND expires_at > NOW()
        )
        "#,
    )
    .bind(access.club_id)
    .bind(&email)
    .fetch_one(&mut *tx)
    .await?;
    if pending {
        tx.rollback().await?;
        return Err(AppError::Conflict(format!(
            "{email} already has a pending invitation"
        )));
    }

    let token = token_service::generate_token();
    let expires_at = Utc::now() + Duration::hours(settings.invitation_ttl_hours);

    let invitation = sqlx::query_as::<_, Invitation>(
        r#"
        INSERT INTO invitations (club_id, email, role, token_hash, invited_by, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(access.club_id)
    .bind(&email)
    .bind(role.as_str())
    .bind(token_service::hash_token(&token))
    .bind(inviter.user_id)
    .bind(expires_at)
    .fetch_one(&mut *tx)
    .await?;

    let club_name: String = sqlx::query_scalar("SELECT name FROM clubs WHERE id = $1")
        .bind(access.club_id)
        .fetch_one(&mut *tx)
        .await?;

    change_service::record(
        &mut *tx,
        access.club_id,
        Entity::Users,
        Some(invitation.id),
        Action::Created,
    )
    .await?;

    tx.commit().await?;

    let accept_url = format!("{}/invite/{}", settings.app_base_url, token);
    mailer.send_in_background(email_service::invitation_email(
        mailer.sender(),
        &email,
        &club_name,
        &inviter.display_name,
        role.as_str(),
        &accept_url,
    ));

    tracing::info!(
        club_id = %access.club_id,
        invitation_id = %invitation.id,
        role = %role,
        "Invitation created"
    );

    let mut response = InvitationResponse::from(invitation);
    response.token = Some(token);
    response.accept_url = Some(accept_url);
    Ok(response)
}

/// Revoke a pending invitation.
pub async fn revoke_invitation(
    pool: &DbPool,
    club_id: Uuid,
    invitation_id: Uuid,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "DELETE FROM invitations WHERE id = $1 AND club_id = $2 AND accepted_at IS NULL",
    )
    .bind(invitation_id)
    .bind(club_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(AppError::NotFound("invitation"));
    }

    change_service::record(&mut *tx, club_id, Entity::Users, Some(invitation_id), Action::Deleted)
        .await?;

    tx.commit().await?;

    Ok(())
}

/// Accept an invitation by its token.
///
/// A new email gets a fresh user and an access token. An email that
/// already belongs to a user can only be accepted by that user signed in,
/// and no token is minted for them. The membership is added with the
/// invited role and the club's owners and admins are notified.
///
/// # Errors
///
/// - `NotFound`: unknown token
/// - `Conflict`: invitation already used
/// - `InvalidRequest`: invitation expired
/// - `Unauthorized`: the email belongs to a user and the caller is anonymous
/// - `Forbidden`: the caller is signed in as someone else
pub async fn accept_invitation(
    pool: &DbPool,
    token: &str,
    display_name: Option<String>,
    caller: Option<&AuthContext>,
) -> Result<AcceptInvitationResponse, AppError> {
    let mut tx = pool.begin().await?;

    let invitation = sqlx::query_as::<_, Invitation>(
        "SELECT * FROM invitations WHERE token_hash = $1 FOR UPDATE",
    )
    .bind(token_service::hash_token(token))
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("invitation"))?;

    if invitation.accepted_at.is_some() {
        tx.rollback().await?;
        return Err(AppError::Conflict(
            "Invitation has already been accepted".to_string(),
        ));
    }
    if invitation.is_expired(Utc::now()) {
        tx.rollback().await?;
        return Err(AppError::InvalidRequest("Invitation has expired".to_string()));
    }

    let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&invitation.email)
        .fetch_optional(&mut *tx)
        .await?;

    let (user, is_new_user) = match (existing, caller) {
        (Some(user), Some(caller)) if caller.user_id == user.id => (user, false),
        (Some(_), Some(caller)) => {
            tx.rollback().await?;
            tracing::warn!(
                invitation_id = %invitation.id,
                caller = %caller.user_id,
                "Invitation accept attempted by a different user"
            );
            return Err(AppError::Forbidden(
                "This invitation was sent to another account".to_string(),
            ));
        }
        (Some(_), None) => {
            tx.rollback().await?;
            return Err(AppError::Unauthorized);
        }
        (None, _) => {
            let display_name = optional_text(display_name).unwrap_or_else(|| {
                invitation
                    .email
                    .split('@')
                    .next()
                    .unwrap_or(&invitation.email)
                    .to_string()
            });

            let user = sqlx::query_as::<_, User>(
                "INSERT INTO users (email, display_name) VALUES ($1, $2) RETURNING *",
            )
            .bind(&invitation.email)
            .bind(&display_name)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| conflict_on_unique(e, "An account with this email already exists"))?;

            (user, true)
        }
    };

    sqlx::query(
        r#"
        INSERT INTO memberships (club_id, user_id, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (club_id, user_id) DO NOTHING
        "#,
    )
    .bind(invitation.club_id)
    .bind(user.id)
    .bind(&invitation.role)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE invitations SET accepted_at = NOW() WHERE id = $1")
        .bind(invitation.id)
        .execute(&mut *tx)
        .await?;

    communication_service::notify_club_managers(
        &mut *tx,
        invitation.club_id,
        user.id,
        communication_service::KIND_MEMBER_JOINED,
        &format!("{} joined the club", user.display_name),
        Some(&format!("Joined as {}", invitation.role)),
    )
    .await?;

    let access_token = if is_new_user {
        let (_, token) = token_service::mint(&mut *tx, user.id, "invitation").await?;
        Some(token)
    } else {
        None
    };

    change_service::record(
        &mut *tx,
        invitation.club_id,
        Entity::Users,
        Some(user.id),
        Action::Created,
    )
    .await?;
    change_service::record(
        &mut *tx,
        invitation.club_id,
        Entity::Notifications,
        None,
        Action::Created,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        club_id = %invitation.club_id,
        user_id = %user.id,
        role = %invitation.role,
        new_user = is_new_user,
        "Invitation accepted"
    );

    Ok(AcceptInvitationResponse {
        user,
        club_id: invitation.club_id,
        role: invitation.role,
        access_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db, middleware::auth, models::change::ChangesQuery,
        models::communication::NotificationFilter, test_support,
    };

    async fn invite(
        pool: &DbPool,
        inviter: &AuthContext,
        club_id: Uuid,
        email: &str,
        role: &str,
    ) -> String {
        let access = test_support::access(pool, inviter, club_id).await;
        let invitation = create_invitation(
            pool,
            &Mailer::disabled(),
            &test_support::settings(),
            &access,
            inviter,
            CreateInvitationRequest {
                email: email.to_string(),
                role: role.to_string(),
            },
        )
        .await
        .unwrap();
        invitation.token.unwrap()
    }

    async fn membership_role(pool: &DbPool, club_id: Uuid, user_id: Uuid) -> Option<String> {
        sqlx::query_scalar("SELECT role FROM memberships WHERE club_id = $1 AND user_id = $2")
            .bind(club_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn invitation_cannot_claim_an_existing_account(pool: DbPool) {
        db::ensure_bootstrap_admin(&pool, "admin@clubflow.test", "bootstrap-secret")
            .await
            .unwrap();
        let admin = auth::authenticate(&pool, "bootstrap-secret").await.unwrap();

        let mallory = test_support::user(&pool, "mallory@example.com").await;
        let club = test_support::club(&pool, &mallory, "Mallory FC").await;
        let token = invite(&pool, &mallory, club.id, "admin@clubflow.test", "member").await;

        let anonymous = accept_invitation(&pool, &token, None, None).await;
        assert!(matches!(anonymous, Err(AppError::Unauthorized)));

        let as_inviter = accept_invitation(&pool, &token, None, Some(&mallory)).await;
        assert!(matches!(as_inviter, Err(AppError::Forbidden(_))));

        // Nothing was minted or joined, and the invitation is still open
        assert_eq!(test_support::token_count(&pool, admin.user_id).await, 1);
        assert_eq!(membership_role(&pool, club.id, admin.user_id).await, None);
        let pending = list_invitations(&pool, club.id).await.unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn signed_in_user_accepts_without_a_new_token(pool: DbPool) {
        let owner = test_support::user(&pool, "owner@example.com").await;
        let club = test_support::club(&pool, &owner, "Riverside Rowing").await;
        let (sam, sam_token) = test_support::user_with_token(&pool, "sam@example.com").await;
        let token = invite(&pool, &owner, club.id, "sam@example.com", "coach").await;

        let caller = auth::authenticate(&pool, &sam_token).await.unwrap();
        let accepted = accept_invitation(&pool, &token, Some("Ignored".to_string()), Some(&caller))
            .await
            .unwrap();

        assert_eq!(accepted.user.id, sam.user_id);
        assert_eq!(accepted.user.display_name, "sam");
        assert_eq!(accepted.role, "coach");
        assert!(accepted.access_token.is_none());
        assert_eq!(test_support::token_count(&pool, sam.user_id).await, 1);
        assert_eq!(
            membership_role(&pool, club.id, sam.user_id).await.as_deref(),
            Some("coach")
        );

        let json = serde_json::to_value(&accepted).unwrap();
        assert!(json.get("access_token").is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn new_email_gets_an_account_and_a_working_token(pool: DbPool) {
        let owner = test_support::user(&pool, "owner@example.com").await;
        let club = test_support::club(&pool, &owner, "Riverside Rowing").await;
        let token = invite(&pool, &owner, club.id, "new.player@example.com", "member").await;

        let accepted = accept_invitation(&pool, &token, None, None).await.unwrap();
        assert_eq!(accepted.user.email, "new.player@example.com");
        assert_eq!(accepted.user.display_name, "new.player");

        let access_token = accepted.access_token.unwrap();
        let caller = auth::authenticate(&pool, &access_token).await.unwrap();
        assert_eq!(caller.user_id, accepted.user.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn joining_notifies_managers_through_the_change_feed(pool: DbPool) {
        let owner = test_support::user(&pool, "owner@example.com").await;
        let club = test_support::club(&pool, &owner, "Riverside Rowing").await;
        let token = invite(&pool, &owner, club.id, "jo@example.com", "member").await;

        let before = change_service::list_changes(
            &pool,
            club.id,
            ChangesQuery {
                since: 0,
                limit: None,
            },
        )
        .await
        .unwrap()
        .latest_seq;

        accept_invitation(&pool, &token, None, None).await.unwrap();

        let notifications = communication_service::list_notifications(
            &pool,
            club.id,
            owner.user_id,
            NotificationFilter { unread_only: true },
        )
        .await
        .unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, communication_service::KIND_MEMBER_JOINED);

        let feed = change_service::list_changes(
            &pool,
            club.id,
            ChangesQuery {
                since: before,
                limit: None,
            },
        )
        .await
        .unwrap();
        assert!(feed.invalidate.contains(&"notifications"));
        assert!(feed.invalidate.contains(&"users"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unusable_invitations_are_rejected(pool: DbPool) {
        let owner = test_support::user(&pool, "owner@example.com").await;
        let club = test_support::club(&pool, &owner, "Riverside Rowing").await;

        let unknown = accept_invitation(&pool, "no-such-token", None, None).await;
        assert!(matches!(unknown, Err(AppError::NotFound("invitation"))));

        let token = invite(&pool, &owner, club.id, "first@example.com", "member").await;
        accept_invitation(&pool, &token, None, None).await.unwrap();
        let reused = accept_invitation(&pool, &token, None, None).await;
        assert!(matches!(reused, Err(AppError::Conflict(_))));

        let token = invite(&pool, &owner, club.id, "late@example.com", "member").await;
        sqlx::query("UPDATE invitations SET expires_at = NOW() - INTERVAL '1 hour' WHERE email = $1")
            .bind("late@example.com")
            .execute(&pool)
            .await
            .unwrap();
        let expired = accept_invitation(&pool, &token, None, None).await;
        assert!(matches!(expired, Err(AppError::InvalidRequest(_))));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn last_owner_cannot_step_down_or_leave(pool: DbPool) {
        let owner = test_support::user(&pool, "owner@example.com").await;
        let club = test_support::club(&pool, &owner, "Riverside Rowing").await;
        let access = test_support::access(&pool, &owner, club.id).await;

        let demoted = update_role(&pool, &access, owner.user_id, Role::Admin).await;
        assert!(matches!(demoted, Err(AppError::Conflict(_))));
        let left = remove_user(&pool, &access, owner.user_id).await;
        assert!(matches!(left, Err(AppError::Conflict(_))));

        let second = test_support::user(&pool, "second@example.com").await;
        test_support::join(&pool, club.id, second.user_id, Role::Owner).await;

        let demoted = update_role(&pool, &access, owner.user_id, Role::Admin)
            .await
            .unwrap();
        assert_eq!(demoted.role, "admin");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn admins_cannot_manage_owners(pool: DbPool) {
        let owner = test_support::user(&pool, "owner@example.com").await;
        let club = test_support::club(&pool, &owner, "Riverside Rowing").await;
        let admin = test_support::user(&pool, "admin@example.com").await;
        test_support::join(&pool, club.id, admin.user_id, Role::Admin).await;
        let access = test_support::access(&pool, &admin, club.id).await;

        let removed = remove_user(&pool, &access, owner.user_id).await;
        assert!(matches!(removed, Err(AppError::Forbidden(_))));
        let promoted = update_role(&pool, &access, admin.user_id, Role::Owner).await;
        assert!(matches!(promoted, Err(AppError::Forbidden(_))));
    }
}
