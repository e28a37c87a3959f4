//! Post-commit alert evaluation for expense writes.
//!
//! Alerts run after the ledger write has committed and are best-effort:
//! a failure here is logged and swallowed, never bubbled up to the caller
//! whose money movement already succeeded.

use chrono::Datelike;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::{
    Budget, NewNotification, NotificationKind, ResultEngine, Transaction, budgets,
    util::month_range,
};

use super::Engine;

fn to_minor(amount: Decimal) -> i64 {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(i64::MAX)
}

impl Engine {
    /// Evaluate duplicate-charge and budget-threshold alerts for a
    /// committed expense. Never fails; evaluation errors are logged.
    pub(super) async fn evaluate_expense_alerts(&self, tx: &Transaction) {
        if let Err(err) = self.expense_alerts(tx).await {
            tracing::warn!(
                transaction_id = %tx.id,
                error = %err,
                "alert evaluation failed"
            );
        }
    }

    async fn expense_alerts(&self, tx: &Transaction) -> ResultEngine<()> {
        let (from, to) = month_range(tx.occurred_at)?;
        let rates = self.latest_rates(&self.database).await?;

        // Duplicate charge first: it only depends on the log itself.
        let key = self.duplicates.dedupe_key(&tx.description, tx.category);
        let count = self
            .ledger
            .count_similar(
                &self.database,
                &tx.user_id,
                &key,
                tx.amount_minor,
                tx.currency,
                from,
                to,
            )
            .await?;
        if self.duplicates.fires_at(count) {
            let amount = tx.currency.format_minor(tx.amount_minor);
            self.notify(NewNotification {
                user_id: tx.user_id.clone(),
                kind: NotificationKind::DuplicateCharge,
                title: "Possible duplicate charge".to_string(),
                message: format!(
                    "Two identical charges of {amount} for \"{key}\" this month."
                ),
                meta: serde_json::json!({
                    "category": tx.category.as_str(),
                    "amount_minor": tx.amount_minor,
                    "currency": tx.currency.code(),
                    "transaction_id": tx.id,
                }),
                dedupe_key: Some(format!("duplicate:{key}:{}", tx.amount_minor)),
            })
            .await;
        }

        let Some(model) = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(tx.user_id.as_str()))
            .filter(budgets::Column::Category.eq(tx.category.as_str()))
            .filter(budgets::Column::Month.eq(tx.occurred_at.month() as i32))
            .filter(budgets::Column::Year.eq(tx.occurred_at.year()))
            .one(&self.database)
            .await?
        else {
            return Ok(());
        };
        let budget = Budget::try_from(model)?;

        let spent_after = self
            .ledger
            .sum_expenses(
                &self.database,
                &tx.user_id,
                Some(tx.category),
                from,
                to,
                budget.currency,
                &rates,
                &self.converter,
            )
            .await?;
        let (this_amount, _exact) =
            self.converter
                .convert_decimal(tx.amount_minor, tx.currency, budget.currency, &rates);
        let spent_before = spent_after - this_amount;

        let outcome = self
            .budgets
            .classify(budget.limit_minor, spent_before, spent_after);

        let spent_minor = to_minor(spent_after);
        let threshold_minor = to_minor(self.budgets.threshold_minor(budget.limit_minor));
        let meta = serde_json::json!({
            "category": budget.category.as_str(),
            "limit_minor": budget.limit_minor,
            "spent_minor": spent_minor,
            "threshold_minor": threshold_minor,
            "month": budget.month,
            "year": budget.year,
            "transaction_id": tx.id,
        });
        let period_key = format!(
            "budget:{}:{}-{:02}",
            budget.category.as_str(),
            budget.year,
            budget.month
        );

        if outcome.near_limit {
            let spent = budget.currency.format_minor(spent_minor);
            let limit = budget.currency.format_minor(budget.limit_minor);
            self.notify(NewNotification {
                user_id: tx.user_id.clone(),
                kind: NotificationKind::NearLimit,
                title: format!("Approaching your {} budget", budget.category),
                message: format!("You have spent {spent} of your {limit} limit."),
                meta: meta.clone(),
                dedupe_key: Some(format!("{period_key}:near_limit")),
            })
            .await;
        }
        if outcome.exceeded {
            let spent = budget.currency.format_minor(spent_minor);
            let limit = budget.currency.format_minor(budget.limit_minor);
            self.notify(NewNotification {
                user_id: tx.user_id.clone(),
                kind: NotificationKind::Exceeded,
                title: format!("{} budget exceeded", budget.category),
                message: format!("You have spent {spent}, over your {limit} limit."),
                meta,
                dedupe_key: Some(format!("{period_key}:exceeded")),
            })
            .await;
        }

        Ok(())
    }

    /// Hand a notification to the sink, logging instead of failing.
    async fn notify(&self, notification: NewNotification) {
        let kind = notification.kind;
        if let Err(err) = self.notifier.create(notification).await {
            tracing::warn!(kind = kind.as_str(), error = %err, "notification sink failed");
        }
    }
}
