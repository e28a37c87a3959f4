use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};

use crate::{
    Category, CreateTransactionCmd, EngineError, ResultEngine, Transaction, TransactionKind,
    TransactionPatch, transactions, util::normalize_text,
};

use super::{Engine, with_tx};

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub account_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub category: Option<Category>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Inclusive bounds on the unsigned amount.
    pub min_minor: Option<i64>,
    pub max_minor: Option<i64>,
}

/// One page of a user's transaction log, newest first.
#[derive(Clone, Debug)]
pub struct TransactionPage {
    pub items: Vec<Transaction>,
    /// Opaque cursor for the next (older) page; `None` on the last page.
    pub next_cursor: Option<String>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidDate(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if let (Some(min), Some(max)) = (filter.min_minor, filter.max_minor)
        && min > max
    {
        return Err(EngineError::InvalidAmount(
            "invalid range: min_minor must be <= max_minor".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TransactionsCursor {
    occurred_at: DateTime<Utc>,
    transaction_id: String,
}

impl TransactionsCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))
    }
}

const LIST_LIMIT_MAX: u64 = 100;

impl Engine {
    /// Append a transaction to the log and move its account's balance in
    /// the same database transaction.
    ///
    /// The balance write is the ledger's guarded increment, so an expense
    /// that would drive the balance negative aborts the whole operation
    /// and nothing is recorded. Alert evaluation runs after commit;
    /// notifications never keep a write from landing.
    pub async fn create_transaction(
        &self,
        cmd: CreateTransactionCmd,
    ) -> ResultEngine<Transaction> {
        if cmd.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        let account_id = cmd.account_id.ok_or(EngineError::AccountIdRequired)?;
        let category = match (cmd.kind, cmd.category) {
            (_, Some(category)) => category,
            (TransactionKind::Income, None) => Category::Other,
            (TransactionKind::Expense, None) => return Err(EngineError::CategoryRequired),
        };

        let tx: Transaction = with_tx!(self, |db_tx| {
            let account = self.require_account(&db_tx, &cmd.user_id, account_id).await?;
            let currency = match cmd.currency {
                Some(currency) => currency,
                None => Self::account_currency(&account)?,
            };

            let tx = Transaction::new(
                cmd.user_id,
                account_id,
                cmd.kind,
                cmd.amount_minor,
                currency,
                category,
                normalize_text(&cmd.description),
                cmd.occurred_at,
            )?;

            self.ledger
                .apply_delta(&db_tx, &tx.user_id, account_id, tx.delta_minor())
                .await?;

            let active_model: transactions::ActiveModel = (&tx).into();
            transactions::Entity::insert(active_model)
                .exec(&db_tx)
                .await?;

            Ok::<_, EngineError>(tx)
        })?;

        if tx.kind == TransactionKind::Expense {
            self.evaluate_expense_alerts(&tx).await;
        }

        Ok(tx)
    }

    /// Apply a partial update to a transaction.
    ///
    /// Unset patch fields keep their stored value; an empty patch is a
    /// plain read of the record. The old balance effect is reversed and
    /// the new one applied atomically, including moves across accounts;
    /// if any guarded increment fails, the update aborts and both record
    /// and balances keep their previous state.
    pub async fn update_transaction(
        &self,
        user_id: &str,
        transaction_id: Uuid,
        patch: TransactionPatch,
    ) -> ResultEngine<Transaction> {
        if let Some(amount_minor) = patch.amount_minor
            && amount_minor <= 0
        {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        if patch.is_empty() {
            return self.transaction(user_id, transaction_id).await;
        }

        let updated: Transaction = with_tx!(self, |db_tx| {
            let model = transactions::Entity::find_by_id(transaction_id.to_string())
                .filter(transactions::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or(EngineError::TransactionNotFound)?;
            let existing = Transaction::try_from(model)?;

            let account_id = patch.account_id.unwrap_or(existing.account_id);
            self.require_account(&db_tx, user_id, account_id).await?;

            let updated = Transaction {
                id: existing.id,
                user_id: existing.user_id.clone(),
                account_id,
                kind: patch.kind.unwrap_or(existing.kind),
                amount_minor: patch.amount_minor.unwrap_or(existing.amount_minor),
                currency: patch.currency.unwrap_or(existing.currency),
                category: patch.category.unwrap_or(existing.category),
                description: patch
                    .description
                    .as_deref()
                    .map(normalize_text)
                    .unwrap_or_else(|| existing.description.clone()),
                occurred_at: patch.occurred_at.unwrap_or(existing.occurred_at),
                created_at: existing.created_at,
            };

            if updated.account_id == existing.account_id {
                let net = updated.delta_minor() - existing.delta_minor();
                if net != 0 {
                    self.ledger
                        .apply_delta(&db_tx, user_id, updated.account_id, net)
                        .await?;
                }
            } else {
                self.ledger
                    .move_delta(
                        &db_tx,
                        user_id,
                        existing.account_id,
                        updated.account_id,
                        -existing.delta_minor(),
                        updated.delta_minor(),
                    )
                    .await?;
            }

            let active_model = transactions::ActiveModel {
                id: ActiveValue::Set(updated.id.to_string()),
                account_id: ActiveValue::Set(updated.account_id.to_string()),
                kind: ActiveValue::Set(updated.kind.as_str().to_string()),
                amount_minor: ActiveValue::Set(updated.amount_minor),
                currency: ActiveValue::Set(updated.currency.code().to_string()),
                category: ActiveValue::Set(updated.category.as_str().to_string()),
                description: ActiveValue::Set(updated.description.clone()),
                occurred_at: ActiveValue::Set(updated.occurred_at),
                ..Default::default()
            };
            active_model.update(&db_tx).await?;

            Ok::<_, EngineError>(updated)
        })?;

        if updated.kind == TransactionKind::Expense {
            self.evaluate_expense_alerts(&updated).await;
        }

        Ok(updated)
    }

    /// Remove a transaction, reverse its balance effect and return the
    /// removed record.
    ///
    /// Deleting an income is subject to the non-negative guard: if the
    /// account has since spent that money, the reversal would go negative
    /// and the delete fails with `INSUFFICIENT_BALANCE`.
    pub async fn delete_transaction(
        &self,
        user_id: &str,
        transaction_id: Uuid,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = transactions::Entity::find_by_id(transaction_id.to_string())
                .filter(transactions::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or(EngineError::TransactionNotFound)?;
            let tx = Transaction::try_from(model)?;

            self.ledger
                .apply_delta(&db_tx, user_id, tx.account_id, -tx.delta_minor())
                .await?;

            transactions::Entity::delete_by_id(tx.id.to_string())
                .exec(&db_tx)
                .await?;

            Ok(tx)
        })
    }

    /// Fetch one of the user's transactions.
    pub async fn transaction(
        &self,
        user_id: &str,
        transaction_id: Uuid,
    ) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find_by_id(transaction_id.to_string())
            .filter(transactions::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?
            .ok_or(EngineError::TransactionNotFound)?;
        Transaction::try_from(model)
    }

    /// Lists a user's transactions with cursor-based pagination.
    ///
    /// Pagination is newest → older by `(occurred_at DESC, id DESC)`.
    /// `limit` is clamped to `1..=100`.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        limit: u64,
        cursor: Option<&str>,
        filter: &TransactionListFilter,
    ) -> ResultEngine<TransactionPage> {
        validate_list_filter(filter)?;
        let limit = limit.clamp(1, LIST_LIMIT_MAX);

        let limit_plus_one = limit.saturating_add(1);
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::Id)
            .limit(limit_plus_one);

        if let Some(cursor) = cursor {
            let cursor = TransactionsCursor::decode(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(transactions::Column::OccurredAt.lt(cursor.occurred_at))
                    .add(
                        Condition::all()
                            .add(transactions::Column::OccurredAt.eq(cursor.occurred_at))
                            .add(transactions::Column::Id.lt(cursor.transaction_id)),
                    ),
            );
        }

        if let Some(account_id) = filter.account_id {
            query = query.filter(transactions::Column::AccountId.eq(account_id.to_string()));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(category) = filter.category {
            query = query.filter(transactions::Column::Category.eq(category.as_str()));
        }
        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::OccurredAt.lt(to));
        }
        if let Some(min_minor) = filter.min_minor {
            query = query.filter(transactions::Column::AmountMinor.gte(min_minor));
        }
        if let Some(max_minor) = filter.max_minor {
            query = query.filter(transactions::Column::AmountMinor.lte(max_minor));
        }

        let rows: Vec<transactions::Model> = query.all(&self.database).await?;
        let has_more = rows.len() > limit as usize;

        let mut items: Vec<Transaction> = Vec::with_capacity(rows.len().min(limit as usize));
        for model in rows.into_iter().take(limit as usize) {
            items.push(Transaction::try_from(model)?);
        }

        let next_cursor = if has_more {
            items
                .last()
                .map(|tx| {
                    TransactionsCursor {
                        occurred_at: tx.occurred_at,
                        transaction_id: tx.id.to_string(),
                    }
                    .encode()
                })
                .transpose()?
        } else {
            None
        };

        Ok(TransactionPage { items, next_cursor })
    }
}
