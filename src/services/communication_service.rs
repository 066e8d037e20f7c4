//! Announcements and per-user notifications.
//!
//! Posting an announcement fans out one notification per club user (other
//! than the author) in the same transaction as the announcement itself.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        change::{Action, Entity},
        communication::{
            Announcement, CreateAnnouncementRequest, MarkedRead, Notification,
            NotificationFilter, UnreadCount, UpdateAnnouncementRequest,
        },
    },
    services::{change_service, required_text, team_service},
};

pub const KIND_ANNOUNCEMENT: &str = "announcement";
pub const KIND_MEMBER_JOINED: &str = "member_joined";

/// Maximum length of the notification preview of an announcement body.
const PREVIEW_CHARS: usize = 140;

/// First `PREVIEW_CHARS` characters of `body`, with an ellipsis if cut.
pub fn preview(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= PREVIEW_CHARS {
        return body.to_string();
    }
    let cut: String = body.chars().take(PREVIEW_CHARS - 1).collect();
    format!("{}…", cut.trim_end())
}

/// Pinned first, then newest.
pub async fn list_announcements(
    pool: &DbPool,
    club_id: Uuid,
) -> Result<Vec<Announcement>, AppError> {
    let announcements = sqlx::query_as::<_, Announcement>(
        r#"
        SELECT *
        FROM announcements
        WHERE club_id = $1
        ORDER BY pinned DESC, created_at DESC
        "#,
    )
    .bind(club_id)
    .fetch_all(pool)
    .await?;

    Ok(announcements)
}

/// Post an announcement and notify every other club user.
pub async fn create_announcement(
    pool: &DbPool,
    club_id: Uuid,
    author_id: Uuid,
    request: CreateAnnouncementRequest,
) -> Result<Announcement, AppError> {
    let title = required_text("title", &request.title, 200)?;
    let body = required_text("body", &request.body, 10_000)?;

    let mut tx = pool.begin().await?;

    if let Some(team_id) = request.team_id {
        team_service::ensure_team_in_club(&mut *tx, club_id, team_id).await?;
    }

    let announcement = sqlx::query_as::<_, Announcement>(
        r#"
        INSERT INTO announcements (club_id, author_id, title, body, team_id, pinned)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(club_id)
    .bind(author_id)
    .bind(&title)
    .bind(&body)
    .bind(request.team_id)
    .bind(request.pinned)
    .fetch_one(&mut *tx)
    .await?;

    let notified = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, club_id, kind, title, body, link)
        SELECT user_id, $1, $2, $3, $4, $5
        FROM memberships
        WHERE club_id = $1 AND user_id <> $6
        "#,
    )
    .bind(club_id)
    .bind(KIND_ANNOUNCEMENT)
    .bind(&title)
    .bind(preview(&body))
    .bind(format!("/announcements/{}", announcement.id))
    .bind(author_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    change_service::record(
        &mut *tx,
        club_id,
        Entity::Announcements,
        Some(announcement.id),
        Action::Created,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        club_id = %club_id,
        announcement_id = %announcement.id,
        notified,
        "Announcement posted"
    );
    Ok(announcement)
}

pub async fn update_announcement(
    pool: &DbPool,
    club_id: Uuid,
    announcement_id: Uuid,
    request: UpdateAnnouncementRequest,
) -> Result<Announcement, AppError> {
    let title = request
        .title
        .map(|t| required_text("title", &t, 200))
        .transpose()?;
    let body = request
        .body
        .map(|b| required_text("body", &b, 10_000))
        .transpose()?;

    let mut tx = pool.begin().await?;

    let announcement = sqlx::query_as::<_, Announcement>(
        r#"
        UPDATE announcements
        SET title = COALESCE($3, title),
            body = COALESCE($4, body),
            pinned = COALESCE($5, pinned),
            updated_at = NOW()
        WHERE id = $1 AND club_id = $2
        RETURNING *
        "#,
    )
    .bind(announcement_id)
    .bind(club_id)
    .bind(title)
    .bind(body)
    .bind(request.pinned)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("announcement"))?;

    change_service::record(
        &mut *tx,
        club_id,
        Entity::Announcements,
        Some(announcement_id),
        Action::Updated,
    )
    .await?;

    tx.commit().await?;

    Ok(announcement)
}

pub async fn delete_announcement(
    pool: &DbPool,
    club_id: Uuid,
    announcement_id: Uuid,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("DELETE FROM announcements WHERE id = $1 AND club_id = $2")
        .bind(announcement_id)
        .bind(club_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(AppError::NotFound("announcement"));
    }

    change_service::record(
        &mut *tx,
        club_id,
        Entity::Announcements,
        Some(announcement_id),
        Action::Deleted,
    )
    .await?;

    tx.commit().await?;

    Ok(())
}

/// Notify the club's owners and admins, except `except_user`.
pub async fn notify_club_managers<'e, E>(
    executor: E,
    club_id: Uuid,
    except_user: Uuid,
    kind: &str,
    title: &str,
    body: Option<&str>,
) -> Result<u64, AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, club_id, kind, title, body)
        SELECT user_id, $1, $2, $3, $4
        FROM memberships
        WHERE club_id = $1 AND role IN ('owner', 'admin') AND user_id <> $5
        "#,
    )
    .bind(club_id)
    .bind(kind)
    .bind(title)
    .bind(body)
    .bind(except_user)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// The caller's notifications in a club, newest first (at most 100).
pub async fn list_notifications(
    pool: &DbPool,
    club_id: Uuid,
    user_id: Uuid,
    filter: NotificationFilter,
) -> Result<Vec<Notification>, AppError> {
    let notifications = sqlx::query_as::<_, Notification>(
        r#"
        SELECT *
        FROM notifications
        WHERE club_id = $1 AND user_id = $2
          AND (NOT $3 OR read_at IS NULL)
        ORDER BY created_at DESC
        LIMIT 100
        "#,
    )
    .bind(club_id)
    .bind(user_id)
    .bind(filter.unread_only)
    .fetch_all(pool)
    .await?;

    Ok(notifications)
}

pub async fn unread_count(
    pool: &DbPool,
    club_id: Uuid,
    user_id: Uuid,
) -> Result<UnreadCount, AppError> {
    let unread: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM notifications
        WHERE club_id = $1 AND user_id = $2 AND read_at IS NULL
        "#,
    )
    .bind(club_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(UnreadCount { unread })
}

/// Mark one of the caller's notifications read. Already-read ones keep
/// their original `read_at`.
pub async fn mark_read(
    pool: &DbPool,
    club_id: Uuid,
    user_id: Uuid,
    notification_id: Uuid,
) -> Result<Notification, AppError> {
    sqlx::query_as::<_, Notification>(
        r#"
        UPDATE notifications
        SET read_at = COALESCE(read_at, NOW())
        WHERE id = $1 AND club_id = $2 AND user_id = $3
        RETURNING *
        "#,
    )
    .bind(notification_id)
    .bind(club_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("notification"))
}

pub async fn mark_all_read(
    pool: &DbPool,
    club_id: Uuid,
    user_id: Uuid,
) -> Result<MarkedRead, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE notifications
        SET read_at = NOW()
        WHERE club_id = $1 AND user_id = $2 AND read_at IS NULL
        "#,
    )
    .bind(club_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(MarkedRead {
        updated: result.rows_affected(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{permissions::Role, test_support};

    #[test]
    fn short_bodies_are_kept_whole() {
        assert_eq!(preview("  Training moved to 6pm.  "), "Training moved to 6pm.");
    }

    #[test]
    fn long_bodies_are_cut_with_ellipsis() {
        let body = "word ".repeat(100);
        let preview = preview(&body);
        assert!(preview.chars().count() <= PREVIEW_CHARS);
        assert!(preview.ends_with('…'));
    }

    #[test]
    fn preview_counts_characters_not_bytes() {
        let body = "ü".repeat(PREVIEW_CHARS);
        assert_eq!(preview(&body), body);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn announcement_notifies_everyone_but_the_author(pool: DbPool) {
        let owner = test_support::user(&pool, "owner@example.com").await;
        let club = test_support::club(&pool, &owner, "Northside Netball").await;
        let coach = test_support::user(&pool, "coach@example.com").await;
        let player = test_support::user(&pool, "player@example.com").await;
        test_support::join(&pool, club.id, coach.user_id, Role::Coach).await;
        test_support::join(&pool, club.id, player.user_id, Role::Member).await;

        let announcement = create_announcement(
            &pool,
            club.id,
            coach.user_id,
            CreateAnnouncementRequest {
                title: "Training moved".to_string(),
                body: "Thursday training starts at 6pm.".to_string(),
                team_id: None,
                pinned: false,
            },
        )
        .await
        .unwrap();

        assert_eq!(unread_count(&pool, club.id, coach.user_id).await.unwrap().unread, 0);
        assert_eq!(unread_count(&pool, club.id, owner.user_id).await.unwrap().unread, 1);

        let inbox = list_notifications(&pool, club.id, player.user_id, NotificationFilter::default())
            .await
            .unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, KIND_ANNOUNCEMENT);
        assert_eq!(
            inbox[0].link.as_deref(),
            Some(format!("/announcements/{}", announcement.id).as_str())
        );

        mark_read(&pool, club.id, player.user_id, inbox[0].id).await.unwrap();
        assert_eq!(unread_count(&pool, club.id, player.user_id).await.unwrap().unread, 0);

        // Other users' notifications are invisible
        let foreign = mark_read(&pool, club.id, coach.user_id, inbox[0].id).await;
        assert!(matches!(foreign, Err(AppError::NotFound("notification"))));
    }
}
