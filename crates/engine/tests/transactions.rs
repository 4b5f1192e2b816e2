#![allow(clippy::unwrap_used)]

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement,
};
use uuid::Uuid;

use engine::{
    Currency, Engine, EngineError, ExchangeCmd, NewUser, Recipient, SYSTEM_BANK_USER_ID,
    TransactionFilter, TransactionKind, TransferCmd, users,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    // One pooled connection keeps concurrent units of work strictly
    // serialized on sqlite, which has no row locks of its own.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);

    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    let engine = Engine::builder()
        .database(db.clone())
        .usd_to_eur_rate("0.92")
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn registered_user(engine: &Engine, email: &str) -> users::Model {
    let user = engine
        .create_user(NewUser {
            email: email.to_string(),
            password_hash: "argon2-hash".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        })
        .await
        .unwrap();
    engine.provision_user_accounts(user.id).await.unwrap();
    user
}

async fn balance_cents(engine: &Engine, user_id: Uuid, currency: Currency) -> i64 {
    engine
        .account_by_user_and_currency(user_id, currency)
        .await
        .unwrap()
        .balance_cents
}

async fn ledger_row_count(db: &DatabaseConnection) -> i64 {
    let row = db
        .query_one(Statement::from_string(
            DbBackend::Sqlite,
            "SELECT COUNT(*) AS cnt FROM ledger".to_string(),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get::<i64>("", "cnt").unwrap()
}

#[tokio::test]
async fn registration_funds_accounts_through_the_ledger() {
    let (engine, _db) = engine_with_db().await;
    let alice = registered_user(&engine, "alice@example.com").await;

    assert_eq!(balance_cents(&engine, alice.id, Currency::Usd).await, 1000_00);
    assert_eq!(balance_cents(&engine, alice.id, Currency::Eur).await, 500_00);

    let listed = engine
        .list_transactions_for(alice.id, TransactionFilter::new())
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    for item in &listed {
        assert_eq!(item.transaction.kind, TransactionKind::Transfer);
        assert_eq!(item.from_user_email.as_deref(), Some("bank@system.internal"));
        assert_eq!(item.to_user_email.as_deref(), Some("alice@example.com"));

        let entries = engine.entries_of(item.transaction.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.iter().map(|e| e.amount_cents).sum::<i64>(), 0);
    }

    // The counterparty paid the seed money out of its own pools.
    assert_eq!(
        balance_cents(&engine, SYSTEM_BANK_USER_ID, Currency::Usd).await,
        100_000_000 - 1000_00
    );
    assert_eq!(
        balance_cents(&engine, SYSTEM_BANK_USER_ID, Currency::Eur).await,
        100_000_000 - 500_00
    );

    assert!(engine
        .find_unbalanced_transaction_ids(100)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn transfer_moves_funds_and_stays_balanced() {
    let (engine, _db) = engine_with_db().await;
    let alice = registered_user(&engine, "alice@example.com").await;
    let bob = registered_user(&engine, "bob@example.com").await;

    let created = engine
        .transfer(TransferCmd::new(
            alice.id,
            Recipient::UserId(bob.id),
            Currency::Usd,
            250_00,
        ))
        .await
        .unwrap();

    assert_eq!(balance_cents(&engine, alice.id, Currency::Usd).await, 750_00);
    assert_eq!(balance_cents(&engine, bob.id, Currency::Usd).await, 1250_00);

    let tx = &created.transaction;
    assert_eq!(tx.kind, TransactionKind::Transfer);
    assert_eq!(tx.amount_cents, 250_00);
    assert_eq!(tx.currency, Currency::Usd);
    assert!(tx.from_account_id.is_some());
    assert_eq!(created.from_user_email.as_deref(), Some("alice@example.com"));
    assert_eq!(created.to_user_email.as_deref(), Some("bob@example.com"));

    let entries = engine.entries_of(tx.id).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries.iter().map(|e| e.amount_cents).sum::<i64>(), 0);
    assert!(entries.iter().any(|e| e.amount_cents == -250_00));
    assert!(entries.iter().any(|e| e.amount_cents == 250_00));
}

#[tokio::test]
async fn transfer_with_insufficient_funds_changes_nothing() {
    let (engine, db) = engine_with_db().await;
    let alice = registered_user(&engine, "alice@example.com").await;
    let bob = registered_user(&engine, "bob@example.com").await;

    let rows_before = ledger_row_count(&db).await;

    let err = engine
        .transfer(TransferCmd::new(
            alice.id,
            Recipient::UserId(bob.id),
            Currency::Usd,
            2000_00,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds));

    assert_eq!(balance_cents(&engine, alice.id, Currency::Usd).await, 1000_00);
    assert_eq!(balance_cents(&engine, bob.id, Currency::Usd).await, 1000_00);
    assert_eq!(ledger_row_count(&db).await, rows_before);

    let listed = engine
        .list_transactions_for(alice.id, TransactionFilter::new())
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn transfer_to_self_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let alice = registered_user(&engine, "alice@example.com").await;

    let err = engine
        .transfer(TransferCmd::new(
            alice.id,
            Recipient::UserId(alice.id),
            Currency::Usd,
            100,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CannotTransferToSelf));
    assert_eq!(balance_cents(&engine, alice.id, Currency::Usd).await, 1000_00);
}

#[tokio::test]
async fn transfer_rejects_non_positive_amounts() {
    let (engine, _db) = engine_with_db().await;
    let alice = registered_user(&engine, "alice@example.com").await;
    let bob = registered_user(&engine, "bob@example.com").await;

    for amount in [0, -5] {
        let err = engine
            .transfer(TransferCmd::new(
                alice.id,
                Recipient::UserId(bob.id),
                Currency::Usd,
                amount,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }
}

#[tokio::test]
async fn transfer_resolves_recipient_by_email() {
    let (engine, _db) = engine_with_db().await;
    let alice = registered_user(&engine, "alice@example.com").await;
    let bob = registered_user(&engine, "bob@example.com").await;

    engine
        .transfer(TransferCmd::new(
            alice.id,
            Recipient::Email("  BOB@Example.com ".to_string()),
            Currency::Usd,
            100_00,
        ))
        .await
        .unwrap();
    assert_eq!(balance_cents(&engine, bob.id, Currency::Usd).await, 1100_00);

    let err = engine
        .transfer(TransferCmd::new(
            alice.id,
            Recipient::Email("nobody@example.com".to_string()),
            Currency::Usd,
            100_00,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UserNotFound));
}

#[tokio::test]
async fn exchange_usd_to_eur_rounds_half_up() {
    let (engine, _db) = engine_with_db().await;
    let alice = registered_user(&engine, "alice@example.com").await;

    let created = engine
        .exchange(ExchangeCmd::new(
            alice.id,
            Currency::Usd,
            Currency::Eur,
            100_00,
        ))
        .await
        .unwrap();

    let tx = &created.transaction;
    assert_eq!(tx.kind, TransactionKind::Exchange);
    assert_eq!(tx.amount_cents, 100_00);
    assert_eq!(tx.currency, Currency::Usd);
    assert_eq!(tx.converted_amount_cents, Some(92_00));
    assert!((tx.exchange_rate.unwrap() - 0.92).abs() < 1e-9);

    assert_eq!(balance_cents(&engine, alice.id, Currency::Usd).await, 900_00);
    assert_eq!(balance_cents(&engine, alice.id, Currency::Eur).await, 592_00);

    let entries = engine.entries_of(tx.id).await.unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries.iter().map(|e| e.amount_cents).sum::<i64>(), 0);

    // Half-up at the cent boundary: (2 * 92 + 50) / 100 = 2.
    let tiny = engine
        .exchange(ExchangeCmd::new(alice.id, Currency::Usd, Currency::Eur, 2))
        .await
        .unwrap();
    assert_eq!(tiny.transaction.converted_amount_cents, Some(2));
}

#[tokio::test]
async fn exchange_requires_distinct_currencies() {
    let (engine, _db) = engine_with_db().await;
    let alice = registered_user(&engine, "alice@example.com").await;

    let err = engine
        .exchange(ExchangeCmd::new(
            alice.id,
            Currency::Usd,
            Currency::Usd,
            100,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CurrenciesMustDiffer));
}

#[tokio::test]
async fn exchange_with_insufficient_funds_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let alice = registered_user(&engine, "alice@example.com").await;

    let err = engine
        .exchange(ExchangeCmd::new(
            alice.id,
            Currency::Usd,
            Currency::Eur,
            5000_00,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds));
}

#[tokio::test]
async fn exchange_fails_when_bank_liquidity_is_exhausted() {
    let (engine, db) = engine_with_db().await;
    let alice = registered_user(&engine, "alice@example.com").await;

    // Drain the counterparty's EUR pool from outside the engine.
    db.execute(Statement::from_sql_and_values(
        DbBackend::Sqlite,
        "UPDATE accounts SET balance = ? WHERE user_id = ? AND currency = ?",
        ["0.10".into(), SYSTEM_BANK_USER_ID.into(), "EUR".into()],
    ))
    .await
    .unwrap();

    let err = engine
        .exchange(ExchangeCmd::new(
            alice.id,
            Currency::Usd,
            Currency::Eur,
            100_00,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::LiquidityUnavailable));

    assert_eq!(balance_cents(&engine, alice.id, Currency::Usd).await, 1000_00);
    assert_eq!(balance_cents(&engine, alice.id, Currency::Eur).await, 500_00);
}

#[tokio::test]
async fn concurrent_opposing_transfers_conserve_money() {
    let (engine, _db) = engine_with_db().await;
    let alice = registered_user(&engine, "alice@example.com").await;
    let bob = registered_user(&engine, "bob@example.com").await;

    let to_bob = engine.transfer(TransferCmd::new(
        alice.id,
        Recipient::UserId(bob.id),
        Currency::Usd,
        100,
    ));
    let to_alice = engine.transfer(TransferCmd::new(
        bob.id,
        Recipient::UserId(alice.id),
        Currency::Usd,
        100,
    ));
    let (first, second) = tokio::join!(to_bob, to_alice);
    let first = first.unwrap();
    let second = second.unwrap();

    assert_eq!(balance_cents(&engine, alice.id, Currency::Usd).await, 1000_00);
    assert_eq!(balance_cents(&engine, bob.id, Currency::Usd).await, 1000_00);

    for tx_id in [first.transaction.id, second.transaction.id] {
        let entries = engine.entries_of(tx_id).await.unwrap();
        assert_eq!(entries.iter().map(|e| e.amount_cents).sum::<i64>(), 0);
    }

    assert!(engine
        .find_unbalanced_transaction_ids(100)
        .await
        .unwrap()
        .is_empty());
    let user_drift: Vec<_> = engine
        .find_account_mismatches(100)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.user_id != SYSTEM_BANK_USER_ID)
        .collect();
    assert!(user_drift.is_empty(), "unexpected drift: {user_drift:?}");
}

#[tokio::test]
async fn listing_is_filtered_and_paginated() {
    let (engine, _db) = engine_with_db().await;
    let alice = registered_user(&engine, "alice@example.com").await;
    let bob = registered_user(&engine, "bob@example.com").await;

    engine
        .transfer(TransferCmd::new(
            alice.id,
            Recipient::UserId(bob.id),
            Currency::Usd,
            10_00,
        ))
        .await
        .unwrap();
    engine
        .exchange(ExchangeCmd::new(
            alice.id,
            Currency::Usd,
            Currency::Eur,
            10_00,
        ))
        .await
        .unwrap();

    // 2 funding transfers + the payment + the exchange, newest first.
    let all = engine
        .list_transactions_for(alice.id, TransactionFilter::new())
        .await
        .unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all[0].transaction.kind, TransactionKind::Exchange);
    assert_eq!(all[1].transaction.kind, TransactionKind::Transfer);
    assert_eq!(all[1].from_user_email.as_deref(), Some("alice@example.com"));
    assert_eq!(all[1].to_user_email.as_deref(), Some("bob@example.com"));

    let exchanges = engine
        .list_transactions_for(
            alice.id,
            TransactionFilter::new().kind(TransactionKind::Exchange),
        )
        .await
        .unwrap();
    assert_eq!(exchanges.len(), 1);

    let transfers = engine
        .list_transactions_for(
            alice.id,
            TransactionFilter::new().kind(TransactionKind::Transfer),
        )
        .await
        .unwrap();
    assert_eq!(transfers.len(), 3);

    let page_one = engine
        .list_transactions_for(alice.id, TransactionFilter::new().page(1).limit(1))
        .await
        .unwrap();
    assert_eq!(page_one.len(), 1);
    assert_eq!(page_one[0].transaction.kind, TransactionKind::Exchange);

    let page_two = engine
        .list_transactions_for(alice.id, TransactionFilter::new().page(2).limit(1))
        .await
        .unwrap();
    assert_eq!(page_two.len(), 1);
    assert_eq!(page_two[0].transaction.kind, TransactionKind::Transfer);

    // Bob sees his funding plus the transfer he received.
    let bobs = engine
        .list_transactions_for(bob.id, TransactionFilter::new())
        .await
        .unwrap();
    assert_eq!(bobs.len(), 3);
}

#[tokio::test]
async fn transaction_lookup_by_id() {
    let (engine, _db) = engine_with_db().await;
    let alice = registered_user(&engine, "alice@example.com").await;
    let bob = registered_user(&engine, "bob@example.com").await;

    let created = engine
        .transfer(TransferCmd::new(
            alice.id,
            Recipient::UserId(bob.id),
            Currency::Usd,
            42_00,
        ))
        .await
        .unwrap();

    let loaded = engine
        .transaction_by_id(created.transaction.id)
        .await
        .unwrap();
    assert_eq!(loaded, created.transaction);

    let err = engine.transaction_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EngineError::TransactionNotFound));
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    registered_user(&engine, "alice@example.com").await;

    let err = engine
        .create_user(NewUser {
            email: " ALICE@example.com ".to_string(),
            password_hash: "other-hash".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Again".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UserExists));
}
