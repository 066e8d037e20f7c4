//! Subscription plan HTTP handlers.
//!
//! - GET /api/v1/plans - Available plans
//! - GET /api/v1/clubs/{club_id}/subscription - Current plan and usage
//! - PUT /api/v1/clubs/{club_id}/subscription - Switch plan

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::plan::{ChangePlanRequest, SubscriptionPlan, SubscriptionResponse},
    permissions::{ClubAccess, Permission},
    services::subscription_service,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

pub async fn list_plans(State(pool): State<DbPool>) -> Result<Json<Vec<SubscriptionPlan>>, AppError> {
    let plans = subscription_service::list_plans(&pool).await?;
    Ok(Json(plans))
}

/// Current plan with live usage counts.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "plan": { "code": "free", "max_members": 50, "max_teams": 3, "max_facilities": 1, ... },
///   "usage": { "members": 12, "teams": 2, "facilities": 1 }
/// }
/// ```
pub async fn get_subscription(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewClub)?;

    let subscription = subscription_service::get_subscription(&pool, club_id).await?;
    Ok(Json(subscription))
}

/// Switch plan. Returns 409 when current usage exceeds the new plan.
pub async fn change_plan(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Json(request): Json<ChangePlanRequest>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageSubscription)?;

    let subscription =
        subscription_service::change_plan(&pool, club_id, &request.plan_code).await?;
    Ok(Json(subscription))
}
