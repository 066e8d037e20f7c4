//! Subscription plans and plan limits.
//!
//! Create operations for limited resources call [`ensure_capacity`] inside
//! their transaction. It locks the club row, so two concurrent creates
//! cannot both slip under the cap.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        change::{Action, Entity},
        plan::{LimitedResource, PlanUsage, SubscriptionPlan, SubscriptionResponse},
    },
    services::change_service,
};
use sqlx::PgConnection;
use uuid::Uuid;

const PLAN_COLUMNS: &str = "p.id, p.code, p.name, p.price_cents, p.currency, p.billing_interval, \
                            p.max_members, p.max_teams, p.max_facilities";

/// All plans, cheapest first.
pub async fn list_plans(pool: &DbPool) -> Result<Vec<SubscriptionPlan>, AppError> {
    let plans = sqlx::query_as::<_, SubscriptionPlan>(&format!(
        "SELECT {PLAN_COLUMNS} FROM subscription_plans p ORDER BY p.sort_order, p.price_cents"
    ))
    .fetch_all(pool)
    .await?;

    Ok(plans)
}

/// Look up a plan by its code.
pub async fn plan_by_code<'e, E>(executor: E, code: &str) -> Result<SubscriptionPlan, AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, SubscriptionPlan>(&format!(
        "SELECT {PLAN_COLUMNS} FROM subscription_plans p WHERE p.code = $1"
    ))
    .bind(code)
    .fetch_optional(executor)
    .await?
    .ok_or(AppError::NotFound("plan"))
}

/// The club's current plan, locking the club row for the transaction.
async fn lock_club_plan(
    conn: &mut PgConnection,
    club_id: Uuid,
) -> Result<SubscriptionPlan, AppError> {
    sqlx::query_as::<_, SubscriptionPlan>(&format!(
        r#"
        SELECT {PLAN_COLUMNS}
        FROM clubs c
        JOIN subscription_plans p ON p.id = c.plan_id
        WHERE c.id = $1
        FOR UPDATE OF c
        "#
    ))
    .bind(club_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::NotFound("club"))
}

/// Current resource counts of a club. Inactive facilities do not count.
pub async fn usage<'e, E>(executor: E, club_id: Uuid) -> Result<PlanUsage, AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    let usage = sqlx::query_as::<_, PlanUsage>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM members WHERE club_id = $1) AS members,
            (SELECT COUNT(*) FROM teams WHERE club_id = $1) AS teams,
            (SELECT COUNT(*) FROM facilities WHERE club_id = $1 AND is_active) AS facilities
        "#,
    )
    .bind(club_id)
    .fetch_one(executor)
    .await?;

    Ok(usage)
}

/// Fail with `PlanLimitReached` unless the club's plan allows one more
/// `resource`.
pub async fn ensure_capacity(
    conn: &mut PgConnection,
    club_id: Uuid,
    resource: LimitedResource,
) -> Result<(), AppError> {
    let plan = lock_club_plan(conn, club_id).await?;
    if plan.limit(resource).is_none() {
        return Ok(());
    }

    let usage = usage(&mut *conn, club_id).await?;
    let current = match resource {
        LimitedResource::Members => usage.members,
        LimitedResource::Teams => usage.teams,
        LimitedResource::Facilities => usage.facilities,
    };

    if plan.allows_another(resource, current) {
        Ok(())
    } else {
        Err(AppError::PlanLimitReached(format!(
            "The {} plan allows at most {} {} records",
            plan.name,
            plan.limit(resource).unwrap_or_default(),
            resource.label()
        )))
    }
}

/// The club's plan together with its current usage.
pub async fn get_subscription(
    pool: &DbPool,
    club_id: Uuid,
) -> Result<SubscriptionResponse, AppError> {
    let plan = sqlx::query_as::<_, SubscriptionPlan>(&format!(
        r#"
        SELECT {PLAN_COLUMNS}
        FROM clubs c
        JOIN subscription_plans p ON p.id = c.plan_id
        WHERE c.id = $1
        "#
    ))
    .bind(club_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("club"))?;

    let usage = usage(pool, club_id).await?;

    Ok(SubscriptionResponse { plan, usage })
}

/// Move the club to another plan.
///
/// Rejected with 409 when current usage exceeds the target plan's limits.
pub async fn change_plan(
    pool: &DbPool,
    club_id: Uuid,
    plan_code: &str,
) -> Result<SubscriptionResponse, AppError> {
    let mut tx = pool.begin().await?;

    let current = lock_club_plan(&mut tx, club_id).await?;
    let target = plan_by_code(&mut *tx, plan_code.trim()).await?;
    let usage = usage(&mut *tx, club_id).await?;

    if current.id == target.id {
        tx.rollback().await?;
        return Ok(SubscriptionResponse {
            plan: target,
            usage,
        });
    }

    if !target.fits(&usage) {
        tx.rollback().await?;
        return Err(AppError::Conflict(format!(
            "Current usage exceeds the limits of the {} plan",
            target.name
        )));
    }

    sqlx::query("UPDATE clubs SET plan_id = $1, updated_at = NOW() WHERE id = $2")
        .bind(target.id)
        .bind(club_id)
        .execute(&mut *tx)
        .await?;

    change_service::record(
        &mut *tx,
        club_id,
        Entity::Subscription,
        Some(target.id),
        Action::Updated,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(club_id = %club_id, from = %current.code, to = %target.code, "Subscription plan changed");

    Ok(SubscriptionResponse {
        plan: target,
        usage,
    })
}
