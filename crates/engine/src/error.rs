//! The module contains the errors the engine can raise.
//!
//! Every variant carries a stable string code (see [`EngineError::code`])
//! that outer layers map to transport-specific responses. Validation and
//! not-found errors are raised before any persistence side effect;
//! [`InsufficientBalance`] means a balance guard rejected the whole
//! operation atomically.
//!
//! [`InsufficientBalance`]: EngineError::InsufficientBalance
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("A category is required")]
    CategoryRequired,
    #[error("Invalid category: {0}")]
    InvalidCategory(String),
    #[error("Invalid transaction kind: {0}")]
    InvalidKind(String),
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("An account id is required")]
    AccountIdRequired,
    #[error("Account not found")]
    AccountNotFound,
    #[error("Insufficient balance")]
    InsufficientBalance,
    /// Never raised by the engine itself, whose APIs take the id as a
    /// required argument; outer layers resolving an optional id map it
    /// to this variant so the code taxonomy stays in one place.
    #[error("A transaction id is required")]
    TransactionIdRequired,
    #[error("Transaction not found")]
    TransactionNotFound,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Notification sink failed: {0}")]
    Notify(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Stable code surfaced to the HTTP/CLI layer.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "AMOUNT_INVALID",
            Self::CategoryRequired => "CATEGORY_REQUIRED",
            Self::InvalidCategory(_) => "CATEGORY_INVALID",
            Self::InvalidKind(_) => "TYPE_INVALID",
            Self::InvalidCurrency(_) => "CURRENCY_INVALID",
            Self::InvalidId(_) => "ID_INVALID",
            Self::InvalidDate(_) => "DATE_INVALID",
            Self::InvalidCursor(_) => "CURSOR_INVALID",
            Self::AccountIdRequired => "ACCOUNT_ID_REQUIRED",
            Self::AccountNotFound => "ACCOUNT_NOT_FOUND",
            Self::InsufficientBalance => "INSUFFICIENT_BALANCE",
            Self::TransactionIdRequired => "TRANSACTION_ID_REQUIRED",
            Self::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Notify(_) => "NOTIFY_FAILED",
            Self::Database(_) => "INTERNAL",
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidCategory(a), Self::InvalidCategory(b)) => a == b,
            (Self::InvalidKind(a), Self::InvalidKind(b)) => a == b,
            (Self::InvalidCurrency(a), Self::InvalidCurrency(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidDate(a), Self::InvalidDate(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Notify(a), Self::Notify(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}
