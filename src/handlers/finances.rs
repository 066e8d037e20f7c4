//! Club ledger HTTP handlers.
//!
//! - GET /api/v1/clubs/{club_id}/finances?kind=&category=&from=&to=
//! - POST /api/v1/clubs/{club_id}/finances
//! - GET /api/v1/clubs/{club_id}/finances/summary?from=&to=
//! - GET/DELETE /api/v1/clubs/{club_id}/finances/{entry_id}

use crate::{
    db::DbPool,
    error::AppError,
    middleware::auth::AuthContext,
    models::finance::{CreateFinanceEntryRequest, FinanceEntry, FinanceFilter, FinanceSummary},
    permissions::{ClubAccess, Permission},
    services::finance_service,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn list_entries(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Query(filter): Query<FinanceFilter>,
) -> Result<Json<Vec<FinanceEntry>>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewFinances)?;

    let entries = finance_service::list_entries(&pool, club_id, filter).await?;
    Ok(Json(entries))
}

/// Record income or an expense.
///
/// # Request Body
///
/// ```json
/// {
///   "kind": "income",
///   "category": "membership_fees",
///   "amount_cents": 4500,
///   "currency": "EUR",
///   "occurred_on": "2026-02-01",
///   "member_id": null
/// }
/// ```
///
/// # Response
///
/// - **201 Created**
/// - **400 Bad Request**: non-positive amount, unknown kind or bad currency code
pub async fn create_entry(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Json(request): Json<CreateFinanceEntryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageFinances)?;

    let entry = finance_service::create_entry(&pool, club_id, auth.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn get_entry(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, entry_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<FinanceEntry>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewFinances)?;

    let entry = finance_service::get_entry(&pool, club_id, entry_id).await?;
    Ok(Json(entry))
}

pub async fn delete_entry(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path((club_id, entry_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ManageFinances)?;

    finance_service::delete_entry(&pool, club_id, entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Income, expense and balance totals with a per-category breakdown.
pub async fn summary(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    Path(club_id): Path<Uuid>,
    Query(filter): Query<FinanceFilter>,
) -> Result<Json<FinanceSummary>, AppError> {
    let access = ClubAccess::resolve(&pool, &auth, club_id).await?;
    access.require(Permission::ViewFinances)?;

    let summary = finance_service::summary(&pool, club_id, filter).await?;
    Ok(Json(summary))
}
