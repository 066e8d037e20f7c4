//! Roster member management.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        change::{Action, Entity},
        member::{
            CreateMemberRequest, MEMBER_STATUSES, Member, MemberFilter, UpdateMemberRequest,
        },
        plan::LimitedResource,
    },
    services::{
        change_service, normalize_email, one_of, optional_text, required_text,
        subscription_service,
    },
};
use uuid::Uuid;

/// List the roster, optionally filtered by status, team and free-text search.
pub async fn list_members(
    pool: &DbPool,
    club_id: Uuid,
    filter: MemberFilter,
) -> Result<Vec<Member>, AppError> {
    if let Some(status) = &filter.status {
        one_of("status", status, &MEMBER_STATUSES)?;
    }
    let search = optional_text(filter.search).map(|s| format!("%{}%", escape_like(&s)));

    let members = sqlx::query_as::<_, Member>(
        r#"
        SELECT m.*
        FROM members m
        WHERE m.club_id = $1
          AND ($2::text IS NULL OR m.status = $2)
          AND ($3::text IS NULL
               OR m.first_name ILIKE $3
               OR m.last_name ILIKE $3
               OR m.email ILIKE $3)
          AND ($4::uuid IS NULL OR EXISTS (
               SELECT 1 FROM team_members tm WHERE tm.member_id = m.id AND tm.team_id = $4))
        ORDER BY m.last_name, m.first_name
        "#,
    )
    .bind(club_id)
    .bind(filter.status)
    .bind(search)
    .bind(filter.team_id)
    .fetch_all(pool)
    .await?;

    Ok(members)
}

/// Escape `%`, `_` and `\` so user input matches literally inside ILIKE.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub async fn get_member(pool: &DbPool, club_id: Uuid, member_id: Uuid) -> Result<Member, AppError> {
    sqlx::query_as::<_, Member>("SELECT * FROM members WHERE id = $1 AND club_id = $2")
        .bind(member_id)
        .bind(club_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("member"))
}

/// Add a member to the roster, subject to the plan's member limit.
pub async fn create_member(
    pool: &DbPool,
    club_id: Uuid,
    request: CreateMemberRequest,
) -> Result<Member, AppError> {
    let first_name = required_text("first_name", &request.first_name, 100)?;
    let last_name = required_text("last_name", &request.last_name, 100)?;
    let email = optional_text(request.email)
        .map(|e| normalize_email(&e))
        .transpose()?;
    one_of("status", &request.status, &MEMBER_STATUSES)?;

    let mut tx = pool.begin().await?;

    subscription_service::ensure_capacity(&mut tx, club_id, LimitedResource::Members).await?;

    let member = sqlx::query_as::<_, Member>(
        r#"
        INSERT INTO members (
            club_id, first_name, last_name, email, phone,
            date_of_birth, status, joined_on, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, CURRENT_DATE), $9)
        RETURNING *
        "#,
    )
    .bind(club_id)
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(optional_text(request.phone))
    .bind(request.date_of_birth)
    .bind(&request.status)
    .bind(request.joined_on)
    .bind(optional_text(request.notes))
    .fetch_one(&mut *tx)
    .await?;

    change_service::record(&mut *tx, club_id, Entity::Members, Some(member.id), Action::Created)
        .await?;

    tx.commit().await?;

    tracing::info!(club_id = %club_id, member_id = %member.id, "Member added");
    Ok(member)
}

/// Update a member. Absent fields are left unchanged.
pub async fn update_member(
    pool: &DbPool,
    club_id: Uuid,
    member_id: Uuid,
    request: UpdateMemberRequest,
) -> Result<Member, AppError> {
    let first_name = request
        .first_name
        .map(|n| required_text("first_name", &n, 100))
        .transpose()?;
    let last_name = request
        .last_name
        .map(|n| required_text("last_name", &n, 100))
        .transpose()?;
    let email = optional_text(request.email)
        .map(|e| normalize_email(&e))
        .transpose()?;
    if let Some(status) = &request.status {
        one_of("status", status, &MEMBER_STATUSES)?;
    }

    let mut tx = pool.begin().await?;

    let member = sqlx::query_as::<_, Member>(
        r#"
        UPDATE members
        SET first_name = COALESCE($3, first_name),
            last_name = COALESCE($4, last_name),
            email = COALESCE($5, email),
            phone = COALESCE($6, phone),
            date_of_birth = COALESCE($7, date_of_birth),
            status = COALESCE($8, status),
            joined_on = COALESCE($9, joined_on),
            notes = COALESCE($10, notes),
            updated_at = NOW()
        WHERE id = $1 AND club_id = $2
        RETURNING *
        "#,
    )
    .bind(member_id)
    .bind(club_id)
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(optional_text(request.phone))
    .bind(request.date_of_birth)
    .bind(request.status)
    .bind(request.joined_on)
    .bind(optional_text(request.notes))
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("member"))?;

    change_service::record(&mut *tx, club_id, Entity::Members, Some(member_id), Action::Updated)
        .await?;

    tx.commit().await?;

    Ok(member)
}

/// Remove a member from the roster (and from every team).
pub async fn delete_member(pool: &DbPool, club_id: Uuid, member_id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("DELETE FROM members WHERE id = $1 AND club_id = $2")
        .bind(member_id)
        .bind(club_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(AppError::NotFound("member"));
    }

    change_service::record(&mut *tx, club_id, Entity::Members, Some(member_id), Action::Deleted)
        .await?;

    tx.commit().await?;

    tracing::info!(club_id = %club_id, member_id = %member_id, "Member removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
        assert_eq!(escape_like("Smith"), "Smith");
    }
}
