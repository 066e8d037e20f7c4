//! Club finance ledger.
//!
//! Entries are immutable once recorded; corrections are made by deleting
//! and re-recording.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        change::{Action, Entity},
        finance::{
            CategoryTotal, CreateFinanceEntryRequest, FinanceEntry, FinanceFilter,
            FinanceSummary, KIND_EXPENSE, KIND_INCOME,
        },
    },
    services::{change_service, one_of, optional_text, required_text},
};

const KINDS: [&str; 2] = [KIND_INCOME, KIND_EXPENSE];

fn validate_filter(filter: &FinanceFilter) -> Result<(), AppError> {
    if let Some(kind) = &filter.kind {
        one_of("kind", kind, &KINDS)?;
    }
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if to < from {
            return Err(AppError::InvalidRequest(
                "to must not be before from".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_currency(currency: &str) -> Result<String, AppError> {
    let currency = currency.trim().to_uppercase();
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(currency)
    } else {
        Err(AppError::InvalidRequest(
            "currency must be a 3-letter ISO 4217 code".to_string(),
        ))
    }
}

/// Ledger entries, newest first. Date bounds are inclusive.
pub async fn list_entries(
    pool: &DbPool,
    club_id: Uuid,
    filter: FinanceFilter,
) -> Result<Vec<FinanceEntry>, AppError> {
    validate_filter(&filter)?;

    let entries = sqlx::query_as::<_, FinanceEntry>(
        r#"
        SELECT *
        FROM finance_entries
        WHERE club_id = $1
          AND ($2::text IS NULL OR kind = $2)
          AND ($3::text IS NULL OR category = $3)
          AND ($4::date IS NULL OR occurred_on >= $4)
          AND ($5::date IS NULL OR occurred_on <= $5)
        ORDER BY occurred_on DESC, created_at DESC
        "#,
    )
    .bind(club_id)
    .bind(filter.kind)
    .bind(optional_text(filter.category))
    .bind(filter.from)
    .bind(filter.to)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

pub async fn get_entry(
    pool: &DbPool,
    club_id: Uuid,
    entry_id: Uuid,
) -> Result<FinanceEntry, AppError> {
    sqlx::query_as::<_, FinanceEntry>(
        "SELECT * FROM finance_entries WHERE id = $1 AND club_id = $2",
    )
    .bind(entry_id)
    .bind(club_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("finance_entry"))
}

/// Record an income or expense.
///
/// # Errors
///
/// - `InvalidRequest`: amount not positive, unknown kind, bad currency
/// - `NotFound`: `member_id` is not on this club's roster
pub async fn create_entry(
    pool: &DbPool,
    club_id: Uuid,
    recorded_by: Uuid,
    request: CreateFinanceEntryRequest,
) -> Result<FinanceEntry, AppError> {
    one_of("kind", &request.kind, &KINDS)?;
    let category = required_text("category", &request.category, 64)?;
    if request.amount_cents <= 0 {
        return Err(AppError::InvalidRequest(
            "Amount must be positive".to_string(),
        ));
    }
    let currency = validate_currency(&request.currency)?;

    let mut tx = pool.begin().await?;

    if let Some(member_id) = request.member_id {
        let in_club: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM members WHERE id = $1 AND club_id = $2)",
        )
        .bind(member_id)
        .bind(club_id)
        .fetch_one(&mut *tx)
        .await?;
        if !in_club {
            tx.rollback().await?;
            return Err(AppError::NotFound("member"));
        }
    }

    let entry = sqlx::query_as::<_, FinanceEntry>(
        r#"
        INSERT INTO finance_entries (
            club_id, kind, category, amount_cents, currency,
            description, occurred_on, member_id, recorded_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(club_id)
    .bind(&request.kind)
    .bind(category)
    .bind(request.amount_cents)
    .bind(currency)
    .bind(optional_text(request.description))
    .bind(request.occurred_on)
    .bind(request.member_id)
    .bind(recorded_by)
    .fetch_one(&mut *tx)
    .await?;

    change_service::record(&mut *tx, club_id, Entity::Finances, Some(entry.id), Action::Created)
        .await?;

    tx.commit().await?;

    tracing::info!(
        club_id = %club_id,
        entry_id = %entry.id,
        kind = %entry.kind,
        amount_cents = entry.amount_cents,
        "Finance entry recorded"
    );
    Ok(entry)
}

pub async fn delete_entry(pool: &DbPool, club_id: Uuid, entry_id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query("DELETE FROM finance_entries WHERE id = $1 AND club_id = $2")
        .bind(entry_id)
        .bind(club_id)
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(AppError::NotFound("finance_entry"));
    }

    change_service::record(&mut *tx, club_id, Entity::Finances, Some(entry_id), Action::Deleted)
        .await?;

    tx.commit().await?;

    Ok(())
}

/// Income, expenses and balance over an inclusive date range.
pub async fn summary(
    pool: &DbPool,
    club_id: Uuid,
    filter: FinanceFilter,
) -> Result<FinanceSummary, AppError> {
    validate_filter(&filter)?;

    let totals = sqlx::query_as::<_, CategoryTotal>(
        r#"
        SELECT category, kind, SUM(amount_cents)::BIGINT AS total_cents
        FROM finance_entries
        WHERE club_id = $1
          AND ($2::date IS NULL OR occurred_on >= $2)
          AND ($3::date IS NULL OR occurred_on <= $3)
        GROUP BY category, kind
        ORDER BY kind, total_cents DESC, category
        "#,
    )
    .bind(club_id)
    .bind(filter.from)
    .bind(filter.to)
    .fetch_all(pool)
    .await?;

    Ok(FinanceSummary::from_totals(totals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn currency_is_normalized() {
        assert_eq!(validate_currency(" eur ").unwrap(), "EUR");
        assert!(validate_currency("EURO").is_err());
        assert!(validate_currency("E1R").is_err());
    }

    #[test]
    fn filter_rejects_unknown_kind_and_inverted_range() {
        let bad_kind = FinanceFilter {
            kind: Some("refund".into()),
            ..Default::default()
        };
        assert!(validate_filter(&bad_kind).is_err());

        let inverted = FinanceFilter {
            from: NaiveDate::from_ymd_opt(2025, 3, 1),
            to: NaiveDate::from_ymd_opt(2025, 2, 1),
            ..Default::default()
        };
        assert!(validate_filter(&inverted).is_err());

        let single_day = FinanceFilter {
            from: NaiveDate::from_ymd_opt(2025, 3, 1),
            to: NaiveDate::from_ymd_opt(2025, 3, 1),
            kind: Some("income".into()),
            ..Default::default()
        };
        assert!(validate_filter(&single_day).is_ok());
    }
}
