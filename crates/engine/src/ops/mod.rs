use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, QueryOrder};

use crate::{
    BudgetThresholdMonitor, CurrencyConverter, DuplicateChargeDetector, LedgerStore,
    NotificationSink, NullSink, RateTable, ResultEngine, fx_rates,
};

mod accounts;
mod alerts;
mod transactions;

pub use transactions::{TransactionListFilter, TransactionPage};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

pub struct Engine {
    database: DatabaseConnection,
    ledger: LedgerStore,
    converter: CurrencyConverter,
    budgets: BudgetThresholdMonitor,
    duplicates: DuplicateChargeDetector,
    notifier: Arc<dyn NotificationSink>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Latest known rate per currency, most recent row winning.
    pub(crate) async fn latest_rates<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> ResultEngine<RateTable> {
        let rows = fx_rates::Entity::find()
            .order_by_desc(fx_rates::Column::Date)
            .all(conn)
            .await?;
        Ok(RateTable::from_latest(&rows))
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    notifier: Option<Arc<dyn NotificationSink>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the notification sink (defaults to [`NullSink`]).
    pub fn notifier(mut self, notifier: Arc<dyn NotificationSink>) -> EngineBuilder {
        self.notifier = Some(notifier);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            ledger: LedgerStore::new(),
            converter: CurrencyConverter::new(),
            budgets: BudgetThresholdMonitor::new(),
            duplicates: DuplicateChargeDetector::new(),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(NullSink)),
        })
    }
}
