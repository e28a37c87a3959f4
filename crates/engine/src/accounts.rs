//! The module contains the `Account` struct and its persistence model.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use uuid::Uuid;

use crate::{Currency, EngineError, util::parse_uuid};

/// A bank account.
///
/// An account is owned by exactly one user and holds a balance in its own
/// currency. The balance is only ever mutated through the ledger's atomic
/// increment; application code never overwrites it directly.
#[derive(Clone, Debug, PartialEq)]
pub struct Account {
    /// Stable identifier, generated once and persisted so the account can
    /// be renamed without breaking references.
    pub id: Uuid,
    pub user_id: String,
    pub bank_name: String,
    pub name: String,
    /// Unique external identifier per user; the same IBAN cannot be added
    /// twice by the same owner.
    pub iban: String,
    pub currency: Currency,
    pub balance_minor: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        user_id: impl Into<String>,
        bank_name: impl Into<String>,
        name: impl Into<String>,
        iban: impl Into<String>,
        currency: Currency,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            bank_name: bank_name.into(),
            name: name.into(),
            iban: iban.into(),
            currency,
            balance_minor: 0,
            active: true,
            created_at: Utc::now(),
        }
    }
}

/// One account's contribution to a [`BalanceReport`].
#[derive(Clone, Debug, PartialEq)]
pub struct AccountBalance {
    pub account_id: Uuid,
    pub currency: Currency,
    pub balance_minor: i64,
    /// Balance expressed in the report currency; `None` when no rate was
    /// available for the account currency.
    pub converted_minor: Option<i64>,
}

/// All active accounts of a user converted into a single currency.
///
/// Accounts whose currency has no rate are excluded from `total_minor` and
/// listed in `missing_rates` so callers can surface the gap instead of
/// silently under-reporting.
#[derive(Clone, Debug, PartialEq)]
pub struct BalanceReport {
    pub currency: Currency,
    pub total_minor: i64,
    pub accounts: Vec<AccountBalance>,
    pub missing_rates: Vec<Currency>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub bank_name: String,
    pub name: String,
    pub iban: String,
    pub currency: String,
    pub balance_minor: i64,
    pub active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            user_id: ActiveValue::Set(value.user_id.clone()),
            bank_name: ActiveValue::Set(value.bank_name.clone()),
            name: ActiveValue::Set(value.name.clone()),
            iban: ActiveValue::Set(value.iban.clone()),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            balance_minor: ActiveValue::Set(value.balance_minor),
            active: ActiveValue::Set(value.active),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "account")?,
            user_id: model.user_id,
            bank_name: model.bank_name,
            name: model.name,
            iban: model.iban,
            currency: Currency::try_from(model.currency.as_str())?,
            balance_minor: model.balance_minor,
            active: model.active,
            created_at: model.created_at,
        })
    }
}
