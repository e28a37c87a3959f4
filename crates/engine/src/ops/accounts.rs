use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    Account, AccountBalance, BalanceReport, Currency, EngineError, NewAccountCmd, ResultEngine,
    accounts,
    util::{model_currency, normalize_text},
};

use super::{Engine, with_tx};

impl Engine {
    /// Register a new bank account and return it.
    ///
    /// The IBAN is unique per user; re-adding an existing one fails with
    /// [`EngineError::Conflict`].
    pub async fn new_account(&self, cmd: NewAccountCmd) -> ResultEngine<Account> {
        if cmd.opening_balance_minor < 0 {
            return Err(EngineError::InvalidAmount(
                "opening balance must be >= 0".to_string(),
            ));
        }
        let iban = normalize_text(&cmd.iban);
        if iban.is_empty() {
            return Err(EngineError::InvalidId("iban must not be empty".to_string()));
        }

        with_tx!(self, |db_tx| {
            let taken = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(cmd.user_id.as_str()))
                .filter(accounts::Column::Iban.eq(iban.as_str()))
                .count(&db_tx)
                .await?;
            if taken > 0 {
                return Err(EngineError::Conflict(format!(
                    "iban {iban} already registered"
                )));
            }

            let mut account =
                Account::new(cmd.user_id, cmd.bank_name, cmd.name, iban, cmd.currency);
            account.balance_minor = cmd.opening_balance_minor;

            let active_model: accounts::ActiveModel = (&account).into();
            accounts::Entity::insert(active_model).exec(&db_tx).await?;

            Ok(account)
        })
    }

    /// Fetch one of the user's accounts.
    pub async fn account(&self, user_id: &str, account_id: Uuid) -> ResultEngine<Account> {
        let model = self
            .require_account(&self.database, user_id, account_id)
            .await?;
        Account::try_from(model)
    }

    /// Deactivate an account. Its transactions stay in the log, but the
    /// account no longer accepts writes and drops out of balance reports.
    pub async fn close_account(&self, user_id: &str, account_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, user_id, account_id).await?;
            let active = accounts::ActiveModel {
                id: ActiveValue::Set(model.id),
                active: ActiveValue::Set(false),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Total balance of all active accounts, expressed in `target`.
    ///
    /// Accounts whose currency has no rate keep their raw balance visible
    /// but are excluded from the total and reported in `missing_rates`.
    pub async fn total_balance(
        &self,
        user_id: &str,
        target: Currency,
    ) -> ResultEngine<BalanceReport> {
        let rates = self.latest_rates(&self.database).await?;
        let models = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .filter(accounts::Column::Active.eq(true))
            .order_by_asc(accounts::Column::CreatedAt)
            .all(&self.database)
            .await?;

        let mut total = Decimal::ZERO;
        let mut balances = Vec::with_capacity(models.len());
        let mut missing_rates: Vec<Currency> = Vec::new();

        for model in models {
            let account = Account::try_from(model)?;
            let (converted, exact) = self.converter.convert_decimal(
                account.balance_minor,
                account.currency,
                target,
                &rates,
            );
            let converted_minor = if exact {
                total += converted;
                converted
                    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                    .to_i64()
            } else {
                if !missing_rates.contains(&account.currency) {
                    missing_rates.push(account.currency);
                }
                None
            };
            balances.push(AccountBalance {
                account_id: account.id,
                currency: account.currency,
                balance_minor: account.balance_minor,
                converted_minor,
            });
        }

        let total_minor = total
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(0);

        Ok(BalanceReport {
            currency: target,
            total_minor,
            accounts: balances,
            missing_rates,
        })
    }

    /// Load an active account owned by `user_id`, or fail with
    /// `ACCOUNT_NOT_FOUND`. Ownership and liveness are checked together so
    /// callers cannot distinguish someone else's account from a missing
    /// one.
    pub(super) async fn require_account<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        account_id: Uuid,
    ) -> ResultEngine<accounts::Model> {
        accounts::Entity::find_by_id(account_id.to_string())
            .filter(accounts::Column::UserId.eq(user_id))
            .filter(accounts::Column::Active.eq(true))
            .one(conn)
            .await?
            .ok_or(EngineError::AccountNotFound)
    }

    pub(super) fn account_currency(model: &accounts::Model) -> ResultEngine<Currency> {
        model_currency(&model.currency)
    }
}
