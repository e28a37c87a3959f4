pub use accounts::{Account, AccountBalance, BalanceReport};
pub use budgets::{Budget, BudgetThresholdMonitor, ThresholdOutcome};
pub use category::Category;
pub use commands::{CreateTransactionCmd, NewAccountCmd, TransactionPatch};
pub use converter::{Conversion, CurrencyConverter};
pub use currency::Currency;
pub use duplicates::DuplicateChargeDetector;
pub use error::EngineError;
pub use fx_rates::RateTable;
pub use ledger::LedgerStore;
pub use notifications::{
    DbNotificationSink, NewNotification, NotificationKind, NotificationSink, NullSink,
};
pub use ops::{Engine, EngineBuilder, TransactionListFilter, TransactionPage};
pub use transactions::{Transaction, TransactionKind};

mod accounts;
mod budgets;
mod category;
mod commands;
mod converter;
mod currency;
mod duplicates;
mod error;
mod fx_rates;
mod ledger;
mod notifications;
mod ops;
mod transactions;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
