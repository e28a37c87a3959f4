//! Budget records and the threshold-crossing monitor.
//!
//! A budget caps spending for one (user, category, month, year) tuple in
//! a single currency. The monitor classifies a period's spend against the
//! limit and decides which notifications a write should produce.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use uuid::Uuid;

use crate::{Category, Currency, EngineError, util::parse_uuid};

/// A monthly spending cap for one category.
///
/// Unique per (user, category, month, year); the migration enforces this
/// with a unique index, and violations surface as `CONFLICT`.
#[derive(Clone, Debug, PartialEq)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: String,
    pub category: Category,
    pub month: u32,
    pub year: i32,
    pub currency: Currency,
    /// Non-negative cap in minor units of `currency`.
    pub limit_minor: i64,
    pub created_at: DateTime<Utc>,
}

/// Result of classifying a period spend against a budget limit.
///
/// The two flags are decided independently; near-limit additionally
/// requires the spend to stay within the limit, so a single write that
/// jumps straight past 100% reports `exceeded` only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ThresholdOutcome {
    /// The write moved the spend from below the near-limit threshold to
    /// at-or-above it, while staying within the limit.
    pub near_limit: bool,
    /// The spend now exceeds the limit.
    pub exceeded: bool,
}

/// Classifies cumulative period spend against a budget limit.
///
/// Per (owner, category, period) the intended progression is
/// `BELOW_THRESHOLD -> NEAR_LIMIT -> EXCEEDED`. The monitor compares a
/// derived "before" value (`spent_after - this_amount`) rather than
/// re-querying, so it never regresses on a later refund within the same
/// evaluation; it carries no cross-request state, and repeated edits near
/// a boundary can re-fire (accepted behavior, notifications are not
/// exactly-once).
#[derive(Clone, Copy, Debug)]
pub struct BudgetThresholdMonitor {
    near_limit_ratio: Decimal,
}

impl Default for BudgetThresholdMonitor {
    fn default() -> Self {
        Self {
            // 80% of the limit.
            near_limit_ratio: Decimal::new(8, 1),
        }
    }
}

impl BudgetThresholdMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The absolute near-limit threshold for a limit, in minor units.
    #[must_use]
    pub fn threshold_minor(&self, limit_minor: i64) -> Decimal {
        Decimal::from(limit_minor) * self.near_limit_ratio
    }

    /// Classify a write that moved the period spend from `spent_before`
    /// to `spent_after` (both in minor units of the budget currency).
    #[must_use]
    pub fn classify(
        &self,
        limit_minor: i64,
        spent_before: Decimal,
        spent_after: Decimal,
    ) -> ThresholdOutcome {
        let limit = Decimal::from(limit_minor);
        let threshold = self.threshold_minor(limit_minor);

        let near_limit =
            spent_before < threshold && threshold <= spent_after && spent_after <= limit;
        let exceeded = spent_after > limit;

        ThresholdOutcome {
            near_limit,
            exceeded,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub category: String,
    pub month: i32,
    pub year: i32,
    pub currency: String,
    pub limit_minor: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Budget {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let month = u32::try_from(model.month)
            .ok()
            .filter(|m| (1..=12).contains(m))
            .ok_or_else(|| EngineError::InvalidDate(format!("invalid month: {}", model.month)))?;
        Ok(Self {
            id: parse_uuid(&model.id, "budget")?,
            user_id: model.user_id,
            category: Category::try_from(model.category.as_str())?,
            month,
            year: model.year,
            currency: Currency::try_from(model.currency.as_str())?,
            limit_minor: model.limit_minor,
            created_at: model.created_at,
        })
    }
}
