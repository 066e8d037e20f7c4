//! Club finance ledger models.
//!
//! Amounts are stored as `i64` cents and are always positive; the `kind`
//! column says whether an entry adds to or subtracts from the balance.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const KIND_INCOME: &str = "income";
pub const KIND_EXPENSE: &str = "expense";

/// Represents a row of the `finance_entries` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct FinanceEntry {
    pub id: Uuid,
    pub club_id: Uuid,

    /// `income` or `expense`
    pub kind: String,

    /// e.g. "membership_fees", "equipment", "facility_rent"
    pub category: String,

    /// Always > 0 (enforced by CHECK constraint)
    pub amount_cents: i64,

    pub currency: String,
    pub description: Option<String>,
    pub occurred_on: NaiveDate,

    /// Set when the entry relates to a roster member (e.g. dues)
    pub member_id: Option<Uuid>,

    pub recorded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Request body for recording a ledger entry.
///
/// ```json
/// {
///   "kind": "income",
///   "category": "membership_fees",
///   "amount_cents": 4500,
///   "occurred_on": "2025-02-01",
///   "member_id": "550e8400-e29b-41d4-a716-446655440000"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateFinanceEntryRequest {
    pub kind: String,
    pub category: String,
    pub amount_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub description: Option<String>,
    pub occurred_on: NaiveDate,
    pub member_id: Option<Uuid>,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Query string for listing ledger entries and summaries.
#[derive(Debug, Default, Deserialize)]
pub struct FinanceFilter {
    pub kind: Option<String>,
    pub category: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Total per (category, kind).
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub kind: String,
    pub total_cents: i64,
}

/// Response body for `GET .../finances/summary`.
#[derive(Debug, Serialize)]
pub struct FinanceSummary {
    pub income_cents: i64,
    pub expense_cents: i64,
    pub balance_cents: i64,
    pub by_category: Vec<CategoryTotal>,
}

impl FinanceSummary {
    /// Fold per-category totals into a summary.
    pub fn from_totals(by_category: Vec<CategoryTotal>) -> Self {
        let (income_cents, expense_cents) =
            by_category
                .iter()
                .fold((0i64, 0i64), |(income, expense), total| {
                    if total.kind == KIND_INCOME {
                        (income + total.total_cents, expense)
                    } else {
                        (income, expense + total.total_cents)
                    }
                });

        Self {
            income_cents,
            expense_cents,
            balance_cents: income_cents - expense_cents,
            by_category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(category: &str, kind: &str, total_cents: i64) -> CategoryTotal {
        CategoryTotal {
            category: category.to_string(),
            kind: kind.to_string(),
            total_cents,
        }
    }

    #[test]
    fn summary_balances_income_against_expenses() {
        let summary = FinanceSummary::from_totals(vec![
            total("membership_fees", KIND_INCOME, 120_000),
            total("sponsorship", KIND_INCOME, 50_000),
            total("equipment", KIND_EXPENSE, 30_500),
            total("facility_rent", KIND_EXPENSE, 80_000),
        ]);

        assert_eq!(summary.income_cents, 170_000);
        assert_eq!(summary.expense_cents, 110_500);
        assert_eq!(summary.balance_cents, 59_500);
        assert_eq!(summary.by_category.len(), 4);
    }

    #[test]
    fn empty_ledger_has_zero_balance() {
        let summary = FinanceSummary::from_totals(Vec::new());
        assert_eq!(summary.income_cents, 0);
        assert_eq!(summary.expense_cents, 0);
        assert_eq!(summary.balance_cents, 0);
    }

    #[test]
    fn balance_can_go_negative() {
        let summary = FinanceSummary::from_totals(vec![total("travel", KIND_EXPENSE, 900)]);
        assert_eq!(summary.balance_cents, -900);
    }
}
