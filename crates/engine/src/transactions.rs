//! Transaction primitives.
//!
//! A `Transaction` is a single signed monetary event (income or expense)
//! attached to exactly one account. Its balance effect (`delta_minor`) is
//! always interpreted in the account's own currency; a stored currency
//! that differs from the account's only affects reporting conversions.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Category, Currency, EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::InvalidKind(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    pub account_id: Uuid,
    pub kind: TransactionKind,
    /// Always positive; the sign comes from `kind`.
    pub amount_minor: i64,
    pub currency: Currency,
    pub category: Category,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: String,
        account_id: Uuid,
        kind: TransactionKind,
        amount_minor: i64,
        currency: Currency,
        category: Category,
        description: String,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            account_id,
            kind,
            amount_minor,
            currency,
            category,
            description,
            occurred_at,
            created_at: Utc::now(),
        })
    }

    /// Signed balance effect on the owning account: `+amount` for income,
    /// `-amount` for expense.
    #[must_use]
    pub const fn delta_minor(&self) -> i64 {
        match self.kind {
            TransactionKind::Income => self.amount_minor,
            TransactionKind::Expense => -self.amount_minor,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub account_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub currency: String,
    pub category: String,
    pub description: String,
    pub occurred_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            account_id: ActiveValue::Set(tx.account_id.to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            currency: ActiveValue::Set(tx.currency.code().to_string()),
            category: ActiveValue::Set(tx.category.as_str().to_string()),
            description: ActiveValue::Set(tx.description.clone()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            user_id: model.user_id,
            account_id: parse_uuid(&model.account_id, "account")?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            currency: Currency::try_from(model.currency.as_str())?,
            category: Category::try_from(model.category.as_str())?,
            description: model.description,
            occurred_at: model.occurred_at,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_signed_by_kind() {
        let income = Transaction::new(
            "alice".to_string(),
            Uuid::new_v4(),
            TransactionKind::Income,
            1_000,
            Currency::Try,
            Category::Other,
            "salary".to_string(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(income.delta_minor(), 1_000);

        let expense = Transaction {
            kind: TransactionKind::Expense,
            ..income
        };
        assert_eq!(expense.delta_minor(), -1_000);
    }

    #[test]
    fn rejects_non_positive_amount() {
        let err = Transaction::new(
            "alice".to_string(),
            Uuid::new_v4(),
            TransactionKind::Expense,
            0,
            Currency::Try,
            Category::Other,
            String::new(),
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "AMOUNT_INVALID");
    }
}
