//! Teams and team rosters.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        change::{Action, Entity},
        plan::LimitedResource,
        team::{CreateTeamRequest, Team, TeamMember, UpdateTeamRequest},
    },
    services::{
        change_service, conflict_on_unique, optional_text, required_text, subscription_service,
    },
};
use sqlx::PgConnection;
use uuid::Uuid;

const DUPLICATE_NAME: &str = "A team with this name already exists";

/// Coaches must hold a membership in the team's club.
async fn ensure_coach_in_club(
    conn: &mut PgConnection,
    club_id: Uuid,
    coach_user_id: Option<Uuid>,
) -> Result<(), AppError> {
    let Some(coach) = coach_user_id else {
        return Ok(());
    };

    let is_member: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM memberships WHERE club_id = $1 AND user_id = $2)",
    )
    .bind(club_id)
    .bind(coach)
    .fetch_one(&mut *conn)
    .await?;

    if is_member {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(
            "Coach must be a user of this club".to_string(),
        ))
    }
}

/// Check that a team belongs to the club. Used by other services.
pub async fn ensure_team_in_club<'e, E>(
    executor: E,
    club_id: Uuid,
    team_id: Uuid,
) -> Result<(), AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM teams WHERE id = $1 AND club_id = $2)")
            .bind(team_id)
            .bind(club_id)
            .fetch_one(executor)
            .await?;

    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound("team"))
    }
}

pub async fn list_teams(pool: &DbPool, club_id: Uuid) -> Result<Vec<Team>, AppError> {
    let teams = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE club_id = $1 ORDER BY name")
        .bind(club_id)
        .fetch_all(pool)
        .await?;

    Ok(teams)
}

pub async fn get_team(pool: &DbPool, club_id: Uuid, team_id: Uuid) -> Result<Team, AppError> {
    sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = $1 AND club_id = $2")
        .bind(team_id)
        .bind(club_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("team"))
}

/// Create a team, subject to the plan's team limit.
pub async fn create_team(
    pool: &DbPool,
    club_id: Uuid,
    request: CreateTeamRequest,
) -> Result<Team, AppError> {
    let name = required_text("name", &request.name, 100)?;

    let mut tx = pool.begin().await?;

    subscription_service::ensure_capacity(&mut tx, club_id, LimitedResource::Teams).await?;
    ensure_coach_in_club(&mut tx, club_id, request.coach_user_id).await?;

    let team = sqlx::query_as::<_, Team>(
        r#"
        INSERT INTO teams (club_id, name, category, description, coach_user_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(club_id)
    .bind(name)
    .bind(optional_text(request.category))
    .bind(optional_text(request.description))
    .bind(request.coach_user_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| conflict_on_unique(e, DUPLICATE_NAME))?;

    change_service::record(&mut *tx, club_id, Entity::Teams, Some(team.id), Action::Created)
        .await?;

    tx.commit().await?;

    tracing::info!(club_id = %club_id, team_id = %team.id, "Team created");
    Ok(team)
}

pub async fn update_team(
    pool: &DbPool,
    club_id: Uuid,
    team_id: Uuid,
    request: UpdateTeamRequest,
) -> Result<Team, AppError> {
    let name = request
        .name
        .map(|n| required_text("name", &n, 100))
        .transpose()?;

    let mut tx = pool.begin().await?;

    ensure_coach_in_club(&mut tx, club_id, request.coach_user_id).await?;

    let team = sqlx::query_as::<_, Team>(
        r#"
        UPDATE teams
        SET name = COALESCE($3, name),
            category = COALESCE($4, category),
            description = COALESCE($5, description),
            coach_user_id = COALESCE($6, coach_user_id),
            updated_at = NOW()
        WHERE id = $1 AND club_id = $2
        RETURNING *
        "#,
    )
    .bind(team_id)
    .bind(club_id)
    .bind(name)
    .bind(optional_text(request.category))
    .bind(optional_text(request.description))
    .bind(request.coach_user_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|e| conflict_on_unique(e, DUPLICATE_NAME))?
    .ok_or(AppError::NotFound("team"))?;

    change_service::record(&mut *tx, club_id, Entity::Teams, Some(team_id), Action::Updated)
        .await?;

    tx.commit().await?;

    Ok(team)
}

pub async fn delete_team(pool: &DbPool, club_id: Uuid, team_id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("DELETE FROM teams WHERE id = $1 AND club_id = $2")
        .bind(team_id)
        .bind(club_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(AppError::NotFound("team"));
    }

    change_service::record(&mut *tx, club_id, Entity::Teams, Some(team_id), Action::Deleted)
        .await?;

    tx.commit().await?;

    tracing::info!(club_id = %club_id, team_id = %team_id, "Team deleted");
    Ok(())
}

/// The team's roster, ordered by name.
pub async fn list_team_members(
    pool: &DbPool,
    club_id: Uuid,
    team_id: Uuid,
) -> Result<Vec<TeamMember>, AppError> {
    ensure_team_in_club(pool, club_id, team_id).await?;

    let members = sqlx::query_as::<_, TeamMember>(
        r#"
        SELECT m.id AS member_id, m.first_name, m.last_name, tm.position, tm.added_at
        FROM team_members tm
        JOIN members m ON m.id = tm.member_id
        WHERE tm.team_id = $1
        ORDER BY m.last_name, m.first_name
        "#,
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;

    Ok(members)
}

/// Put a member on a team, or update their position if already there.
pub async fn assign_member(
    pool: &DbPool,
    club_id: Uuid,
    team_id: Uuid,
    member_id: Uuid,
    position: Option<String>,
) -> Result<TeamMember, AppError> {
    let mut tx = pool.begin().await?;

    ensure_team_in_club(&mut *tx, club_id, team_id).await?;

    let member_in_club: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM members WHERE id = $1 AND club_id = $2)")
            .bind(member_id)
            .bind(club_id)
            .fetch_one(&mut *tx)
            .await?;
    if !member_in_club {
        tx.rollback().await?;
        return Err(AppError::NotFound("member"));
    }

    sqlx::query(
        r#"
        INSERT INTO team_members (team_id, member_id, position)
        VALUES ($1, $2, $3)
        ON CONFLICT (team_id, member_id) DO UPDATE SET position = EXCLUDED.position
        "#,
    )
    .bind(team_id)
    .bind(member_id)
    .bind(optional_text(position))
    .execute(&mut *tx)
    .await?;

    let assigned = sqlx::query_as::<_, TeamMember>(
        r#"
        SELECT m.id AS member_id, m.first_name, m.last_name, tm.position, tm.added_at
        FROM team_members tm
        JOIN members m ON m.id = tm.member_id
        WHERE tm.team_id = $1 AND tm.member_id = $2
        "#,
    )
    .bind(team_id)
    .bind(member_id)
    .fetch_one(&mut *tx)
    .await?;

    change_service::record(&mut *tx, club_id, Entity::Teams, Some(team_id), Action::Updated)
        .await?;

    tx.commit().await?;

    Ok(assigned)
}

pub async fn remove_member(
    pool: &DbPool,
    club_id: Uuid,
    team_id: Uuid,
    member_id: Uuid,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    ensure_team_in_club(&mut *tx, club_id, team_id).await?;

    let result = sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND member_id = $2")
        .bind(team_id)
        .bind(member_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(AppError::NotFound("team_member"));
    }

    change_service::record(&mut *tx, club_id, Entity::Teams, Some(team_id), Action::Updated)
        .await?;

    tx.commit().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::member::CreateMemberRequest, services::member_service, test_support};

    fn team(name: &str, coach_user_id: Option<Uuid>) -> CreateTeamRequest {
        CreateTeamRequest {
            name: name.to_string(),
            category: None,
            description: None,
            coach_user_id,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn roster_assignment_and_removal(pool: DbPool) {
        let owner = test_support::user(&pool, "owner@example.com").await;
        let club = test_support::club(&pool, &owner, "Eastfield Hockey").await;
        let squad = create_team(&pool, club.id, team("First XI", Some(owner.user_id)))
            .await
            .unwrap();
        let member = member_service::create_member(
            &pool,
            club.id,
            CreateMemberRequest {
                first_name: "Alex".to_string(),
                last_name: "Morgan".to_string(),
                email: None,
                phone: None,
                date_of_birth: None,
                status: "active".to_string(),
                joined_on: None,
                notes: None,
            },
        )
        .await
        .unwrap();

        assign_member(&pool, club.id, squad.id, member.id, Some("goalkeeper".to_string()))
            .await
            .unwrap();
        let moved = assign_member(&pool, club.id, squad.id, member.id, Some("defender".to_string()))
            .await
            .unwrap();
        assert_eq!(moved.position.as_deref(), Some("defender"));
        assert_eq!(list_team_members(&pool, club.id, squad.id).await.unwrap().len(), 1);

        remove_member(&pool, club.id, squad.id, member.id).await.unwrap();
        let again = remove_member(&pool, club.id, squad.id, member.id).await;
        assert!(matches!(again, Err(AppError::NotFound("team_member"))));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn team_rules_are_enforced(pool: DbPool) {
        let owner = test_support::user(&pool, "owner@example.com").await;
        let club = test_support::club(&pool, &owner, "Eastfield Hockey").await;
        let outsider = test_support::user(&pool, "outsider@example.com").await;

        let foreign_coach = create_team(&pool, club.id, team("Juniors", Some(outsider.user_id))).await;
        assert!(matches!(foreign_coach, Err(AppError::InvalidRequest(_))));

        create_team(&pool, club.id, team("Juniors", None)).await.unwrap();
        let duplicate = create_team(&pool, club.id, team("Juniors", None)).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));

        // Teams of another club are not reachable through this one
        let other_club = test_support::club(&pool, &outsider, "Westfield Hockey").await;
        let other_team = create_team(&pool, other_club.id, team("Seniors", None))
            .await
            .unwrap();
        let crossed = list_team_members(&pool, club.id, other_team.id).await;
        assert!(matches!(crossed, Err(AppError::NotFound("team"))));
    }
}
