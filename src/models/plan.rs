//! Subscription plan models.
//!
//! Plans are reference data seeded by migration. A `NULL` limit means the
//! plan does not cap that resource.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a row of the `subscription_plans` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SubscriptionPlan {
    pub id: Uuid,

    /// `free`, `basic` or `pro`
    pub code: String,

    pub name: String,
    pub price_cents: i64,
    pub currency: String,
    pub billing_interval: String,
    pub max_members: Option<i32>,
    pub max_teams: Option<i32>,
    pub max_facilities: Option<i32>,
}

/// Resources limited by a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitedResource {
    Members,
    Teams,
    Facilities,
}

impl LimitedResource {
    pub fn label(self) -> &'static str {
        match self {
            LimitedResource::Members => "member",
            LimitedResource::Teams => "team",
            LimitedResource::Facilities => "facility",
        }
    }
}

impl SubscriptionPlan {
    /// The plan's cap for a resource, `None` when unlimited.
    pub fn limit(&self, resource: LimitedResource) -> Option<i64> {
        let limit = match resource {
            LimitedResource::Members => self.max_members,
            LimitedResource::Teams => self.max_teams,
            LimitedResource::Facilities => self.max_facilities,
        };
        limit.map(i64::from)
    }

    /// Whether one more resource fits next to `current` existing ones.
    pub fn allows_another(&self, resource: LimitedResource, current: i64) -> bool {
        self.limit(resource).is_none_or(|max| current < max)
    }

    /// Whether existing usage fits within this plan.
    pub fn fits(&self, usage: &PlanUsage) -> bool {
        [
            (LimitedResource::Members, usage.members),
            (LimitedResource::Teams, usage.teams),
            (LimitedResource::Facilities, usage.facilities),
        ]
        .into_iter()
        .all(|(resource, count)| self.limit(resource).is_none_or(|max| count <= max))
    }
}

/// Current resource counts of a club.
#[derive(Debug, Clone, Default, sqlx::FromRow, Serialize)]
pub struct PlanUsage {
    pub members: i64,
    pub teams: i64,
    pub facilities: i64,
}

/// Response body for `GET .../subscription`.
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub plan: SubscriptionPlan,
    pub usage: PlanUsage,
}

/// Request body for `PUT .../subscription`.
#[derive(Debug, Deserialize)]
pub struct ChangePlanRequest {
    pub plan_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(max_members: Option<i32>, max_teams: Option<i32>) -> SubscriptionPlan {
        SubscriptionPlan {
            id: Uuid::new_v4(),
            code: "test".to_string(),
            name: "Test".to_string(),
            price_cents: 0,
            currency: "USD".to_string(),
            billing_interval: "month".to_string(),
            max_members,
            max_teams,
            max_facilities: Some(1),
        }
    }

    #[test]
    fn allows_another_until_the_cap() {
        let plan = plan(Some(3), None);
        assert!(plan.allows_another(LimitedResource::Members, 2));
        assert!(!plan.allows_another(LimitedResource::Members, 3));
        assert!(plan.allows_another(LimitedResource::Teams, 10_000));
    }

    #[test]
    fn usage_at_the_cap_still_fits() {
        let plan = plan(Some(3), Some(1));
        let usage = PlanUsage {
            members: 3,
            teams: 1,
            facilities: 1,
        };
        assert!(plan.fits(&usage));
    }

    #[test]
    fn usage_over_any_cap_does_not_fit() {
        let plan = plan(Some(3), None);
        let usage = PlanUsage {
            members: 2,
            teams: 40,
            facilities: 2,
        };
        assert!(!plan.fits(&usage));
    }
}
