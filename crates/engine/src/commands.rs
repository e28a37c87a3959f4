//! Command structs for engine operations.
//!
//! These types group parameters for write operations (create/update),
//! keeping call sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Category, Currency, TransactionKind};

/// Register a bank account.
#[derive(Clone, Debug)]
pub struct NewAccountCmd {
    pub user_id: String,
    pub bank_name: String,
    pub name: String,
    /// Unique per user; duplicates are rejected with `CONFLICT`.
    pub iban: String,
    pub currency: Currency,
    /// Non-negative opening balance in minor units of `currency`.
    pub opening_balance_minor: i64,
}

impl NewAccountCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        bank_name: impl Into<String>,
        name: impl Into<String>,
        iban: impl Into<String>,
        currency: Currency,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            bank_name: bank_name.into(),
            name: name.into(),
            iban: iban.into(),
            currency,
            opening_balance_minor: 0,
        }
    }

    #[must_use]
    pub fn opening_balance_minor(mut self, opening_balance_minor: i64) -> Self {
        self.opening_balance_minor = opening_balance_minor;
        self
    }
}

/// Create a transaction.
#[derive(Clone, Debug)]
pub struct CreateTransactionCmd {
    pub user_id: String,
    pub account_id: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    /// Defaults to the account's currency when not set.
    pub currency: Option<Currency>,
    /// Required for expenses; income defaults to [`Category::Other`].
    pub category: Option<Category>,
    pub description: String,
    pub occurred_at: DateTime<Utc>,
}

impl CreateTransactionCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        kind: TransactionKind,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            account_id: None,
            kind,
            amount_minor,
            currency: None,
            category: None,
            description: String::new(),
            occurred_at,
        }
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Partial update of an existing transaction.
///
/// Every field is optional; `None` means "leave unchanged". There is no
/// way to clear a field back to a default, only to replace its value,
/// except for `description` which can be set to the empty string.
#[derive(Clone, Debug, Default)]
pub struct TransactionPatch {
    pub account_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub amount_minor: Option<i64>,
    pub currency: Option<Currency>,
    pub category: Option<Category>,
    pub description: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

impl TransactionPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn account_id(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    /// True when the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.account_id.is_none()
            && self.kind.is_none()
            && self.amount_minor.is_none()
            && self.currency.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.occurred_at.is_none()
    }
}
