//! Low-level ledger primitives shared by the transaction operations.
//!
//! Balance maintenance goes through [`LedgerStore::apply_delta`], a single
//! conditional `UPDATE` that both moves the balance and enforces the
//! non-negative invariant. There is no read-then-write window: the guard
//! lives in the statement's `WHERE` clause, so two concurrent spends
//! against the same account cannot both pass a balance check that only
//! one of them should survive.

use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
};
use uuid::Uuid;

use crate::{
    Category, Currency, CurrencyConverter, EngineError, RateTable, ResultEngine, TransactionKind,
    accounts, duplicates::fold_description, transactions,
};

/// Stateless facade over the accounts/transactions tables.
///
/// Every method takes the connection explicitly so callers decide the
/// transactional scope; the engine runs multi-step writes inside one
/// database transaction and passes it down here.
#[derive(Clone, Copy, Debug, Default)]
pub struct LedgerStore;

impl LedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Atomically add `delta_minor` to an active account's balance.
    ///
    /// For negative deltas the update only matches when the resulting
    /// balance stays non-negative. A zero-row update is classified by a
    /// follow-up read: missing or inactive account vs. insufficient
    /// balance.
    pub async fn apply_delta<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        account_id: Uuid,
        delta_minor: i64,
    ) -> ResultEngine<()> {
        let mut update = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::BalanceMinor,
                Expr::col(accounts::Column::BalanceMinor).add(delta_minor),
            )
            .filter(accounts::Column::Id.eq(account_id.to_string()))
            .filter(accounts::Column::UserId.eq(user_id))
            .filter(accounts::Column::Active.eq(true));
        if delta_minor < 0 {
            update = update.filter(Expr::cust_with_values(
                "balance_minor + ? >= 0",
                [delta_minor],
            ));
        }

        let result = update.exec(conn).await?;
        if result.rows_affected > 0 {
            tracing::debug!(account_id = %account_id, delta_minor, "balance updated");
            return Ok(());
        }

        // The guarded update matched nothing; find out why.
        let exists = accounts::Entity::find_by_id(account_id.to_string())
            .filter(accounts::Column::UserId.eq(user_id))
            .filter(accounts::Column::Active.eq(true))
            .count(conn)
            .await?;
        if exists == 0 {
            Err(EngineError::AccountNotFound)
        } else {
            Err(EngineError::InsufficientBalance)
        }
    }

    /// Move a transaction's effect from one account to another: reverse
    /// the old effect on `from`, apply the new one on `to`. The two
    /// deltas are independent because the amount may change in the same
    /// edit. Both halves run on the caller's connection, so inside an
    /// open transaction the move is all or nothing.
    pub async fn move_delta<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        from: Uuid,
        to: Uuid,
        reverse_minor: i64,
        apply_minor: i64,
    ) -> ResultEngine<()> {
        self.apply_delta(conn, user_id, from, reverse_minor).await?;
        self.apply_delta(conn, user_id, to, apply_minor).await?;
        Ok(())
    }

    /// Sum a user's expenses over `[from, to)`, expressed in `target`.
    ///
    /// Rows are converted individually through the rate table; a row
    /// whose currency has no rate contributes its raw amount (the
    /// converter's fallback), keeping the sum total rather than silently
    /// dropping spend.
    pub async fn sum_expenses<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        category: Option<Category>,
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
        target: Currency,
        rates: &RateTable,
        converter: &CurrencyConverter,
    ) -> ResultEngine<Decimal> {
        let mut query = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::AmountMinor)
            .column(transactions::Column::Currency)
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::Kind.eq(TransactionKind::Expense.as_str()))
            .filter(transactions::Column::OccurredAt.gte(from))
            .filter(transactions::Column::OccurredAt.lt(to));
        if let Some(category) = category {
            query = query.filter(transactions::Column::Category.eq(category.as_str()));
        }

        let rows: Vec<(i64, String)> = query.into_tuple().all(conn).await?;

        let mut total = Decimal::ZERO;
        for (amount_minor, currency) in rows {
            let currency = Currency::try_from(currency.as_str())?;
            let (amount, _exact) = converter.convert_decimal(amount_minor, currency, target, rates);
            total += amount;
        }
        Ok(total)
    }

    /// Count a user's expenses in `[from, to)` matching the duplicate
    /// grouping key, amount and currency. The key matches either the
    /// normalized description or, for blank descriptions, the category.
    ///
    /// The database narrows the candidates by amount, currency and
    /// period; the key comparison itself happens here with the same
    /// Unicode folding that produced `dedupe_key`.
    pub async fn count_similar<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        dedupe_key: &str,
        amount_minor: i64,
        currency: Currency,
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
    ) -> ResultEngine<u64> {
        let rows: Vec<(String, String)> = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::Description)
            .column(transactions::Column::Category)
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::Kind.eq(TransactionKind::Expense.as_str()))
            .filter(transactions::Column::AmountMinor.eq(amount_minor))
            .filter(transactions::Column::Currency.eq(currency.code()))
            .filter(transactions::Column::OccurredAt.gte(from))
            .filter(transactions::Column::OccurredAt.lt(to))
            .into_tuple()
            .all(conn)
            .await?;

        let count = rows
            .iter()
            .filter(|(description, category)| {
                let key = fold_description(description);
                if key.is_empty() {
                    category == dedupe_key
                } else {
                    key == dedupe_key
                }
            })
            .count();
        Ok(count as u64)
    }
}
