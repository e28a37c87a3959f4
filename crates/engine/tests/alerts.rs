use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    Account, Category, CreateTransactionCmd, Currency, DbNotificationSink, Engine, EngineError,
    NewAccountCmd, NewNotification, NotificationKind, NotificationSink, TransactionKind,
};
use migration::MigratorTrait;

#[derive(Default)]
struct RecordingSink {
    notifications: Mutex<Vec<NewNotification>>,
}

impl RecordingSink {
    fn kinds(&self) -> Vec<NotificationKind> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.kind)
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn create(&self, notification: NewNotification) -> Result<(), EngineError> {
        self.notifications.lock().unwrap().push(notification);
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn create(&self, _notification: NewNotification) -> Result<(), EngineError> {
        Err(EngineError::Notify("sink unavailable".to_string()))
    }
}

async fn engine_with_sink(
    sink: Arc<dyn NotificationSink>,
) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .notifier(sink)
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn seed_budget(
    db: &DatabaseConnection,
    user_id: &str,
    category: Category,
    month: i32,
    year: i32,
    currency: Currency,
    limit_minor: i64,
) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO budgets (id, user_id, category, month, year, currency, limit_minor, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            Uuid::new_v4().to_string().into(),
            user_id.into(),
            category.as_str().into(),
            month.into(),
            year.into(),
            currency.code().into(),
            limit_minor.into(),
            Utc::now().into(),
        ],
    ))
    .await
    .unwrap();
}

async fn seed_rate(db: &DatabaseConnection, currency: Currency, rate: f64, date: DateTime<Utc>) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO fx_rates (id, currency, rate_to_reference, date) VALUES (?, ?, ?, ?)",
        vec![
            Uuid::new_v4().to_string().into(),
            currency.code().into(),
            rate.into(),
            date.into(),
        ],
    ))
    .await
    .unwrap();
}

async fn funded_account(engine: &Engine, currency: Currency, opening_minor: i64) -> Account {
    engine
        .new_account(
            NewAccountCmd::new(
                "alice",
                "Acme Bank",
                "Checking",
                format!("TR{}", Uuid::new_v4().simple()),
                currency,
            )
            .opening_balance_minor(opening_minor),
        )
        .await
        .unwrap()
}

fn march(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
}

async fn spend(
    engine: &Engine,
    account: &Account,
    amount_minor: i64,
    description: &str,
    occurred_at: DateTime<Utc>,
) {
    engine
        .create_transaction(
            CreateTransactionCmd::new("alice", TransactionKind::Expense, amount_minor, occurred_at)
                .account_id(account.id)
                .category(Category::Food)
                .description(description),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn budget_thresholds_fire_in_sequence() {
    let sink = Arc::new(RecordingSink::default());
    let (engine, db) = engine_with_sink(sink.clone()).await;
    seed_budget(&db, "alice", Category::Food, 3, 2026, Currency::Try, 100_000).await;
    let account = funded_account(&engine, Currency::Try, 500_000).await;

    // 700.00 of a 1000.00 limit: below the 80% threshold, silent.
    spend(&engine, &account, 70_000, "groceries week 1", march(2)).await;
    assert!(sink.kinds().is_empty());

    // 850.00: crossed 80%, still within the limit.
    spend(&engine, &account, 15_000, "groceries week 2", march(9)).await;
    assert_eq!(sink.kinds(), vec![NotificationKind::NearLimit]);

    // 1050.00: over the limit; near-limit must not refire.
    spend(&engine, &account, 20_000, "groceries week 3", march(16)).await;
    assert_eq!(
        sink.kinds(),
        vec![NotificationKind::NearLimit, NotificationKind::Exceeded]
    );

    let notifications = sink.notifications.lock().unwrap();
    let exceeded = &notifications[1];
    assert_eq!(exceeded.user_id, "alice");
    assert_eq!(exceeded.meta["category"], "food");
    assert_eq!(exceeded.meta["limit_minor"], 100_000);
    assert_eq!(exceeded.meta["spent_minor"], 105_000);
}

#[tokio::test]
async fn budget_in_another_month_stays_silent() {
    let sink = Arc::new(RecordingSink::default());
    let (engine, db) = engine_with_sink(sink.clone()).await;
    seed_budget(&db, "alice", Category::Food, 4, 2026, Currency::Try, 10_000).await;
    let account = funded_account(&engine, Currency::Try, 500_000).await;

    spend(&engine, &account, 50_000, "groceries", march(2)).await;
    assert!(sink.kinds().is_empty());
}

#[tokio::test]
async fn budget_evaluation_converts_foreign_spend() {
    let sink = Arc::new(RecordingSink::default());
    let (engine, db) = engine_with_sink(sink.clone()).await;
    seed_budget(&db, "alice", Category::Food, 3, 2026, Currency::Try, 100_000).await;
    seed_rate(&db, Currency::Usd, 40.0, march(1)).await;
    let account = funded_account(&engine, Currency::Usd, 500_000).await;

    // 10.00 USD at 40 TRY/USD = 400.00 TRY.
    spend(&engine, &account, 1_000, "market run", march(2)).await;
    assert!(sink.kinds().is_empty());

    // Cumulative 800.00 TRY lands exactly on the 80% threshold.
    spend(&engine, &account, 1_000, "market run again", march(9)).await;
    assert_eq!(sink.kinds(), vec![NotificationKind::NearLimit]);
}

#[tokio::test]
async fn duplicate_charge_fires_exactly_on_the_second() {
    let sink = Arc::new(RecordingSink::default());
    let (engine, _db) = engine_with_sink(sink.clone()).await;
    let account = funded_account(&engine, Currency::Try, 500_000).await;

    spend(&engine, &account, 5_000, "Coffee", march(3)).await;
    spend(&engine, &account, 5_000, "  coffee ", march(4)).await;
    spend(&engine, &account, 5_000, "coffee", march(5)).await;

    let duplicates: Vec<NotificationKind> = sink
        .kinds()
        .into_iter()
        .filter(|kind| *kind == NotificationKind::DuplicateCharge)
        .collect();
    assert_eq!(duplicates.len(), 1);

    let notifications = sink.notifications.lock().unwrap();
    let duplicate = notifications
        .iter()
        .find(|n| n.kind == NotificationKind::DuplicateCharge)
        .unwrap();
    assert_eq!(duplicate.meta["amount_minor"], 5_000);
}

#[tokio::test]
async fn duplicate_detection_pairs_non_ascii_descriptions() {
    let sink = Arc::new(RecordingSink::default());
    let (engine, _db) = engine_with_sink(sink.clone()).await;
    let account = funded_account(&engine, Currency::Try, 500_000).await;

    // Case folding of É is beyond SQLite's ASCII LOWER.
    spend(&engine, &account, 5_000, "CAFÉ", march(3)).await;
    spend(&engine, &account, 5_000, "CAFÉ", march(4)).await;

    assert_eq!(sink.kinds(), vec![NotificationKind::DuplicateCharge]);
}

#[tokio::test]
async fn duplicate_detection_ignores_near_matches() {
    let sink = Arc::new(RecordingSink::default());
    let (engine, _db) = engine_with_sink(sink.clone()).await;
    let account = funded_account(&engine, Currency::Try, 500_000).await;

    spend(&engine, &account, 5_000, "coffee", march(3)).await;
    // Different amount, different description: no pair.
    spend(&engine, &account, 5_500, "coffee", march(4)).await;
    spend(&engine, &account, 5_000, "tea", march(5)).await;
    // Same key and amount, but in another month.
    spend(
        &engine,
        &account,
        5_000,
        "coffee",
        Utc.with_ymd_and_hms(2026, 4, 2, 12, 0, 0).unwrap(),
    )
    .await;

    assert!(sink.kinds().is_empty());
}

#[tokio::test]
async fn blank_descriptions_group_by_category() {
    let sink = Arc::new(RecordingSink::default());
    let (engine, _db) = engine_with_sink(sink.clone()).await;
    let account = funded_account(&engine, Currency::Try, 500_000).await;

    spend(&engine, &account, 5_000, "", march(3)).await;
    spend(&engine, &account, 5_000, "   ", march(4)).await;

    assert_eq!(sink.kinds(), vec![NotificationKind::DuplicateCharge]);
}

#[tokio::test]
async fn sink_failure_does_not_fail_the_write() {
    let (engine, db) = engine_with_sink(Arc::new(FailingSink)).await;
    seed_budget(&db, "alice", Category::Food, 3, 2026, Currency::Try, 10_000).await;
    let account = funded_account(&engine, Currency::Try, 500_000).await;

    // Blows straight past the limit; the sink rejects the notification.
    spend(&engine, &account, 50_000, "splurge", march(2)).await;

    let account = engine.account("alice", account.id).await.unwrap();
    assert_eq!(account.balance_minor, 450_000);
}

#[tokio::test]
async fn db_sink_persists_unread_rows() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .notifier(Arc::new(DbNotificationSink::new(db.clone())))
        .build()
        .await
        .unwrap();

    seed_budget(&db, "alice", Category::Food, 3, 2026, Currency::Try, 10_000).await;
    let account = funded_account(&engine, Currency::Try, 500_000).await;
    spend(&engine, &account, 50_000, "splurge", march(2)).await;

    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(
            backend,
            "SELECT COUNT(*) AS cnt FROM notifications WHERE read = FALSE".to_string(),
        ))
        .await
        .unwrap()
        .unwrap();
    let count: i64 = row.try_get("", "cnt").unwrap();
    assert_eq!(count, 1);
}
