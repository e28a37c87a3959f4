use chrono::{TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    Account, Category, CreateTransactionCmd, Currency, Engine, NewAccountCmd, TransactionKind,
    TransactionListFilter, TransactionPatch,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn try_account(engine: &Engine, opening_minor: i64) -> Account {
    engine
        .new_account(
            NewAccountCmd::new(
                "alice",
                "Acme Bank",
                "Checking",
                format!("TR{}", Uuid::new_v4().simple()),
                Currency::Try,
            )
            .opening_balance_minor(opening_minor),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn income_and_expense_move_the_balance() {
    let (engine, _db) = engine_with_db().await;
    let account = try_account(&engine, 0).await;

    engine
        .create_transaction(
            CreateTransactionCmd::new("alice", TransactionKind::Income, 100_000, Utc::now())
                .account_id(account.id)
                .description("salary"),
        )
        .await
        .unwrap();
    let expense = engine
        .create_transaction(
            CreateTransactionCmd::new("alice", TransactionKind::Expense, 25_000, Utc::now())
                .account_id(account.id)
                .category(Category::Food)
                .description("groceries"),
        )
        .await
        .unwrap();

    // No explicit currency on the command: the account's is used.
    assert_eq!(expense.currency, Currency::Try);
    assert_eq!(expense.category, Category::Food);

    let account = engine.account("alice", account.id).await.unwrap();
    assert_eq!(account.balance_minor, 75_000);
}

#[tokio::test]
async fn overdraft_rejection_leaves_no_trace() {
    let (engine, _db) = engine_with_db().await;
    let account = try_account(&engine, 100_000).await;

    let err = engine
        .create_transaction(
            CreateTransactionCmd::new("alice", TransactionKind::Expense, 120_000, Utc::now())
                .account_id(account.id)
                .category(Category::Market),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INSUFFICIENT_BALANCE");

    let account = engine.account("alice", account.id).await.unwrap();
    assert_eq!(account.balance_minor, 100_000);

    let page = engine
        .list_transactions("alice", 10, None, &TransactionListFilter::default())
        .await
        .unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn expense_without_category_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let account = try_account(&engine, 100_000).await;

    let err = engine
        .create_transaction(
            CreateTransactionCmd::new("alice", TransactionKind::Expense, 1_000, Utc::now())
                .account_id(account.id),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CATEGORY_REQUIRED");

    // Income falls back to the catch-all category instead.
    let income = engine
        .create_transaction(
            CreateTransactionCmd::new("alice", TransactionKind::Income, 1_000, Utc::now())
                .account_id(account.id),
        )
        .await
        .unwrap();
    assert_eq!(income.category, Category::Other);
}

#[tokio::test]
async fn account_resolution_errors() {
    let (engine, _db) = engine_with_db().await;
    let account = try_account(&engine, 0).await;

    let err = engine
        .create_transaction(CreateTransactionCmd::new(
            "alice",
            TransactionKind::Income,
            1_000,
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ACCOUNT_ID_REQUIRED");

    let err = engine
        .create_transaction(
            CreateTransactionCmd::new("alice", TransactionKind::Income, 1_000, Utc::now())
                .account_id(Uuid::new_v4()),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ACCOUNT_NOT_FOUND");

    // Someone else's account is indistinguishable from a missing one.
    let err = engine
        .create_transaction(
            CreateTransactionCmd::new("mallory", TransactionKind::Income, 1_000, Utc::now())
                .account_id(account.id),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ACCOUNT_NOT_FOUND");
}

#[tokio::test]
async fn delete_reverses_the_balance_effect() {
    let (engine, _db) = engine_with_db().await;
    let account = try_account(&engine, 100_000).await;

    let expense = engine
        .create_transaction(
            CreateTransactionCmd::new("alice", TransactionKind::Expense, 30_000, Utc::now())
                .account_id(account.id)
                .category(Category::Bills),
        )
        .await
        .unwrap();

    engine
        .delete_transaction("alice", expense.id)
        .await
        .unwrap();

    let account = engine.account("alice", account.id).await.unwrap();
    assert_eq!(account.balance_minor, 100_000);

    let err = engine
        .transaction("alice", expense.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TRANSACTION_NOT_FOUND");
}

#[tokio::test]
async fn deleting_spent_income_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let account = try_account(&engine, 0).await;

    let income = engine
        .create_transaction(
            CreateTransactionCmd::new("alice", TransactionKind::Income, 50_000, Utc::now())
                .account_id(account.id),
        )
        .await
        .unwrap();
    engine
        .create_transaction(
            CreateTransactionCmd::new("alice", TransactionKind::Expense, 40_000, Utc::now())
                .account_id(account.id)
                .category(Category::Transport),
        )
        .await
        .unwrap();

    // Reversing the income would leave -400.00; the delete must abort.
    let err = engine
        .delete_transaction("alice", income.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INSUFFICIENT_BALANCE");

    let kept = engine.transaction("alice", income.id).await.unwrap();
    assert_eq!(kept.amount_minor, 50_000);
    let account = engine.account("alice", account.id).await.unwrap();
    assert_eq!(account.balance_minor, 10_000);
}

#[tokio::test]
async fn update_patches_only_the_given_fields() {
    let (engine, _db) = engine_with_db().await;
    let account = try_account(&engine, 100_000).await;

    let expense = engine
        .create_transaction(
            CreateTransactionCmd::new("alice", TransactionKind::Expense, 10_000, Utc::now())
                .account_id(account.id)
                .category(Category::Food)
                .description("lunch"),
        )
        .await
        .unwrap();

    let updated = engine
        .update_transaction(
            "alice",
            expense.id,
            TransactionPatch::new().amount_minor(15_000),
        )
        .await
        .unwrap();

    assert_eq!(updated.amount_minor, 15_000);
    assert_eq!(updated.category, Category::Food);
    assert_eq!(updated.description, "lunch");
    assert_eq!(updated.account_id, account.id);

    // Only the 50.00 difference moved.
    let account = engine.account("alice", account.id).await.unwrap();
    assert_eq!(account.balance_minor, 85_000);
}

#[tokio::test]
async fn empty_patch_is_a_read() {
    let (engine, _db) = engine_with_db().await;
    let account = try_account(&engine, 100_000).await;

    let expense = engine
        .create_transaction(
            CreateTransactionCmd::new("alice", TransactionKind::Expense, 10_000, Utc::now())
                .account_id(account.id)
                .category(Category::Food)
                .description("lunch"),
        )
        .await
        .unwrap();

    let unchanged = engine
        .update_transaction("alice", expense.id, TransactionPatch::new())
        .await
        .unwrap();
    assert_eq!(unchanged.id, expense.id);
    assert_eq!(unchanged.amount_minor, 10_000);
    assert_eq!(unchanged.category, Category::Food);
    assert_eq!(unchanged.description, "lunch");

    let account = engine.account("alice", account.id).await.unwrap();
    assert_eq!(account.balance_minor, 90_000);

    // A missing record still surfaces, patch or no patch.
    let err = engine
        .update_transaction("alice", Uuid::new_v4(), TransactionPatch::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "TRANSACTION_NOT_FOUND");
}

#[tokio::test]
async fn update_moves_the_effect_across_accounts() {
    let (engine, _db) = engine_with_db().await;
    let checking = try_account(&engine, 100_000).await;
    let savings = try_account(&engine, 100_000).await;

    let expense = engine
        .create_transaction(
            CreateTransactionCmd::new("alice", TransactionKind::Expense, 20_000, Utc::now())
                .account_id(checking.id)
                .category(Category::Health),
        )
        .await
        .unwrap();

    engine
        .update_transaction(
            "alice",
            expense.id,
            TransactionPatch::new().account_id(savings.id),
        )
        .await
        .unwrap();

    let checking = engine.account("alice", checking.id).await.unwrap();
    let savings = engine.account("alice", savings.id).await.unwrap();
    assert_eq!(checking.balance_minor, 100_000);
    assert_eq!(savings.balance_minor, 80_000);
}

#[tokio::test]
async fn failed_update_keeps_record_and_balances() {
    let (engine, _db) = engine_with_db().await;
    let account = try_account(&engine, 50_000).await;

    let expense = engine
        .create_transaction(
            CreateTransactionCmd::new("alice", TransactionKind::Expense, 10_000, Utc::now())
                .account_id(account.id)
                .category(Category::Food),
        )
        .await
        .unwrap();

    let err = engine
        .update_transaction(
            "alice",
            expense.id,
            TransactionPatch::new().amount_minor(60_000),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INSUFFICIENT_BALANCE");

    let kept = engine.transaction("alice", expense.id).await.unwrap();
    assert_eq!(kept.amount_minor, 10_000);
    let account = engine.account("alice", account.id).await.unwrap();
    assert_eq!(account.balance_minor, 40_000);
}

#[tokio::test]
async fn duplicate_iban_is_a_conflict() {
    let (engine, _db) = engine_with_db().await;

    let cmd = NewAccountCmd::new("alice", "Acme Bank", "Checking", "TR42", Currency::Try);
    engine.new_account(cmd.clone()).await.unwrap();
    let err = engine.new_account(cmd).await.unwrap_err();
    assert_eq!(err.code(), "CONFLICT");

    // Another user may register the same IBAN.
    engine
        .new_account(NewAccountCmd::new(
            "bob",
            "Acme Bank",
            "Checking",
            "TR42",
            Currency::Try,
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn listing_pages_newest_first_without_overlap() {
    let (engine, _db) = engine_with_db().await;
    let account = try_account(&engine, 0).await;

    for day in 1..=5 {
        engine
            .create_transaction(
                CreateTransactionCmd::new(
                    "alice",
                    TransactionKind::Income,
                    1_000 * day,
                    Utc.with_ymd_and_hms(2026, 3, day as u32, 12, 0, 0).unwrap(),
                )
                .account_id(account.id),
            )
            .await
            .unwrap();
    }

    let filter = TransactionListFilter::default();
    let first = engine
        .list_transactions("alice", 2, None, &filter)
        .await
        .unwrap();
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.items[0].amount_minor, 5_000);
    assert_eq!(first.items[1].amount_minor, 4_000);
    let cursor = first.next_cursor.expect("more pages expected");

    let second = engine
        .list_transactions("alice", 2, Some(&cursor), &filter)
        .await
        .unwrap();
    assert_eq!(second.items[0].amount_minor, 3_000);
    assert_eq!(second.items[1].amount_minor, 2_000);
    let cursor = second.next_cursor.expect("more pages expected");

    let last = engine
        .list_transactions("alice", 2, Some(&cursor), &filter)
        .await
        .unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.items[0].amount_minor, 1_000);
    assert!(last.next_cursor.is_none());

    let err = engine
        .list_transactions("alice", 2, Some("not-a-cursor"), &filter)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "CURSOR_INVALID");
}

#[tokio::test]
async fn listing_honors_filters() {
    let (engine, _db) = engine_with_db().await;
    let account = try_account(&engine, 100_000).await;

    engine
        .create_transaction(
            CreateTransactionCmd::new("alice", TransactionKind::Expense, 5_000, Utc::now())
                .account_id(account.id)
                .category(Category::Food),
        )
        .await
        .unwrap();
    engine
        .create_transaction(
            CreateTransactionCmd::new("alice", TransactionKind::Expense, 7_000, Utc::now())
                .account_id(account.id)
                .category(Category::Transport),
        )
        .await
        .unwrap();

    let page = engine
        .list_transactions(
            "alice",
            10,
            None,
            &TransactionListFilter {
                category: Some(Category::Food),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].amount_minor, 5_000);

    let page = engine
        .list_transactions(
            "alice",
            10,
            None,
            &TransactionListFilter {
                kind: Some(TransactionKind::Expense),
                min_minor: Some(6_000),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].amount_minor, 7_000);
}

#[tokio::test]
async fn total_balance_reports_missing_rates() {
    let (engine, db) = engine_with_db().await;
    try_account(&engine, 100_000).await;
    let usd = engine
        .new_account(
            NewAccountCmd::new("alice", "Acme Bank", "Travel", "US1", Currency::Usd)
                .opening_balance_minor(5_000),
        )
        .await
        .unwrap();

    let report = engine
        .total_balance("alice", Currency::Try)
        .await
        .unwrap();
    assert_eq!(report.total_minor, 100_000);
    assert_eq!(report.missing_rates, vec![Currency::Usd]);
    let usd_line = report
        .accounts
        .iter()
        .find(|line| line.account_id == usd.id)
        .unwrap();
    assert_eq!(usd_line.balance_minor, 5_000);
    assert!(usd_line.converted_minor.is_none());

    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO fx_rates (id, currency, rate_to_reference, date) VALUES (?, ?, ?, ?)",
        vec![
            Uuid::new_v4().to_string().into(),
            Currency::Usd.code().into(),
            40.0.into(),
            Utc::now().into(),
        ],
    ))
    .await
    .unwrap();

    let report = engine
        .total_balance("alice", Currency::Try)
        .await
        .unwrap();
    assert_eq!(report.total_minor, 300_000);
    assert!(report.missing_rates.is_empty());
}

#[tokio::test]
async fn closed_accounts_reject_writes() {
    let (engine, _db) = engine_with_db().await;
    let account = try_account(&engine, 10_000).await;

    engine.close_account("alice", account.id).await.unwrap();

    let err = engine
        .create_transaction(
            CreateTransactionCmd::new("alice", TransactionKind::Income, 1_000, Utc::now())
                .account_id(account.id),
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ACCOUNT_NOT_FOUND");
}
