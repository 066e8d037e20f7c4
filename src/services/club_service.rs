//! Club lifecycle: creation, listing, updates and deletion.

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::{
        change::{Action, Entity},
        club::{Club, CreateClubRequest, UpdateClubRequest},
        user::UserClub,
    },
    permissions::Role,
    services::{
        change_service, conflict_on_unique, normalize_email, optional_text, required_text,
        subscription_service,
    },
};
use uuid::Uuid;

/// Plan every new club starts on.
pub const DEFAULT_PLAN_CODE: &str = "free";

/// Derive a URL slug from a club name.
///
/// Lowercases ASCII alphanumerics, turns every other run of characters into
/// a single `-`, and trims dashes from both ends.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

fn validate_slug(slug: &str) -> Result<(), AppError> {
    let valid = (3..=64).contains(&slug.len())
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');

    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(
            "slug must be 3-64 lowercase letters, digits or dashes".to_string(),
        ))
    }
}

/// Create a club owned by the caller, on the default plan.
pub async fn create_club(
    pool: &DbPool,
    auth: &AuthContext,
    request: CreateClubRequest,
) -> Result<Club, AppError> {
    let name = required_text("name", &request.name, 120)?;
    let slug = match optional_text(request.slug) {
        Some(slug) => slug.to_lowercase(),
        None => slugify(&name),
    };
    validate_slug(&slug)?;
    let contact_email = optional_text(request.contact_email)
        .map(|e| normalize_email(&e))
        .transpose()?;
    let timezone = required_text("timezone", &request.timezone, 64)?;

    let mut tx = pool.begin().await?;

    let plan = subscription_service::plan_by_code(&mut *tx, DEFAULT_PLAN_CODE).await?;

    let club = sqlx::query_as::<_, Club>(
        r#"
        INSERT INTO clubs (name, slug, description, contact_email, timezone, plan_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(&name)
    .bind(&slug)
    .bind(optional_text(request.description))
    .bind(contact_email)
    .bind(&timezone)
    .bind(plan.id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| conflict_on_unique(e, "A club with this slug already exists"))?;

    sqlx::query("INSERT INTO memberships (club_id, user_id, role) VALUES ($1, $2, $3)")
        .bind(club.id)
        .bind(auth.user_id)
        .bind(Role::Owner.as_str())
        .execute(&mut *tx)
        .await?;

    change_service::record(&mut *tx, club.id, Entity::Club, Some(club.id), Action::Created)
        .await?;

    tx.commit().await?;

    tracing::info!(club_id = %club.id, slug = %club.slug, owner = %auth.user_id, "Club created");
    Ok(club)
}

/// Clubs visible to the caller. Platform admins see every club.
pub async fn list_clubs(pool: &DbPool, auth: &AuthContext) -> Result<Vec<Club>, AppError> {
    let clubs = if auth.is_platform_admin {
        sqlx::query_as::<_, Club>("SELECT * FROM clubs ORDER BY name")
            .fetch_all(pool)
            .await?
    } else {
        sqlx::query_as::<_, Club>(
            r#"
            SELECT c.*
            FROM clubs c
            JOIN memberships m ON m.club_id = c.id
            WHERE m.user_id = $1
            ORDER BY c.name
            "#,
        )
        .bind(auth.user_id)
        .fetch_all(pool)
        .await?
    };

    Ok(clubs)
}

/// Clubs a user belongs to, with their role in each.
pub async fn clubs_for_user(pool: &DbPool, user_id: Uuid) -> Result<Vec<UserClub>, AppError> {
    let clubs = sqlx::query_as::<_, UserClub>(
        r#"
        SELECT c.id AS club_id, c.name, c.slug, m.role
        FROM memberships m
        JOIN clubs c ON c.id = m.club_id
        WHERE m.user_id = $1
        ORDER BY c.name
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(clubs)
}

pub async fn get_club(pool: &DbPool, club_id: Uuid) -> Result<Club, AppError> {
    sqlx::query_as::<_, Club>("SELECT * FROM clubs WHERE id = $1")
        .bind(club_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("club"))
}

/// Update club settings. Absent fields are left unchanged.
pub async fn update_club(
    pool: &DbPool,
    club_id: Uuid,
    request: UpdateClubRequest,
) -> Result<Club, AppError> {
    let name = request
        .name
        .map(|n| required_text("name", &n, 120))
        .transpose()?;
    let contact_email = optional_text(request.contact_email)
        .map(|e| normalize_email(&e))
        .transpose()?;
    let timezone = request
        .timezone
        .map(|t| required_text("timezone", &t, 64))
        .transpose()?;

    let mut tx = pool.begin().await?;

    let club = sqlx::query_as::<_, Club>(
        r#"
        UPDATE clubs
        SET name = COALESCE($2, name),
            description = COALESCE($3, description),
            contact_email = COALESCE($4, contact_email),
            timezone = COALESCE($5, timezone),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(club_id)
    .bind(name)
    .bind(optional_text(request.description))
    .bind(contact_email)
    .bind(timezone)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("club"))?;

    change_service::record(&mut *tx, club_id, Entity::Club, Some(club_id), Action::Updated)
        .await?;

    tx.commit().await?;

    Ok(club)
}

/// Delete a club and, by cascade, everything it owns.
///
/// No change row is written: the cascade removes the club's feed along
/// with it. Clients polling the feed get `404 club_not_found` and drop
/// their cached club data.
pub async fn delete_club(pool: &DbPool, club_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM clubs WHERE id = $1")
        .bind(club_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("club"));
    }

    tracing::info!(club_id = %club_id, "Club deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Riverside Rowing Club"), "riverside-rowing-club");
        assert_eq!(slugify("  FC   Ajax -- U12!  "), "fc-ajax-u12");
        assert_eq!(slugify("Tennis & Padel 2025"), "tennis-padel-2025");
    }

    #[test]
    fn slugify_drops_non_ascii() {
        assert_eq!(slugify("Sportverein Müller"), "sportverein-m-ller");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slug_validation() {
        assert!(validate_slug("riverside-rowing").is_ok());
        assert!(validate_slug("ab").is_err());
        assert!(validate_slug("-riverside").is_err());
        assert!(validate_slug("Riverside").is_err());
        assert!(validate_slug("river side").is_err());
    }
}
