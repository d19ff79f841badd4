//! Wallet scenarios against a real PostgreSQL database.
//!
//! Runs only when `DATABASE_URL` is set; otherwise every test returns early.
//! Each test uses its own usernames and item names so they can share one
//! database and run in parallel.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use coinshop_core::{AccountId, Coins, ItemId, WalletError};
use coinshop_db::migrations::migration_status;
use coinshop_db::{AccountStore, Database, DbConfig, WalletConfig, WalletService};

static COUNTER: AtomicU32 = AtomicU32::new(0);

fn unique(prefix: &str) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{prefix}-{}-{n}", nanos % 1_000_000_000_000)
}

async fn connect() -> Option<(Database, WalletService)> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let db = Database::new(DbConfig::new(url).max_connections(20))
        .await
        .expect("connect and migrate");
    let wallet = WalletService::new(Arc::new(db.store()), &WalletConfig::default());
    Some((db, wallet))
}

async fn balance(wallet: &WalletService, id: AccountId) -> Coins {
    wallet.get_account(id).await.unwrap().balance
}

#[tokio::test]
async fn database_is_migrated_and_healthy() {
    let Some((db, _wallet)) = connect().await else {
        return;
    };
    assert!(db.health_check().await);

    let (total, applied) = migration_status(db.pool()).await.unwrap();
    assert!(total >= 1);
    assert!(applied >= total);
}

#[tokio::test]
async fn transfer_scenario() {
    let Some((_db, wallet)) = connect().await else {
        return;
    };
    let a = wallet.register(&unique("a"), "h").await.unwrap();
    let b = wallet.register(&unique("b"), "h").await.unwrap();

    let err = wallet
        .transfer(a.id, b.id, Coins::new(1500))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InsufficientFunds { .. }));
    assert_eq!(balance(&wallet, a.id).await, Coins::new(1000));
    assert_eq!(balance(&wallet, b.id).await, Coins::new(1000));

    let entry = wallet.transfer(a.id, b.id, Coins::new(500)).await.unwrap();
    assert_eq!(entry.amount, Coins::new(500));
    assert_eq!(balance(&wallet, a.id).await, Coins::new(500));
    assert_eq!(balance(&wallet, b.id).await, Coins::new(1500));

    let summary = wallet.account_summary(b.id).await.unwrap();
    assert_eq!(summary.coin_history.received.len(), 1);
    assert_eq!(summary.coin_history.received[0].from_user, a.username);
}

#[tokio::test]
async fn self_transfer_and_unknown_destination() {
    let Some((_db, wallet)) = connect().await else {
        return;
    };
    let a = wallet.register(&unique("self"), "h").await.unwrap();

    let err = wallet.transfer(a.id, a.id, Coins::new(1)).await.unwrap_err();
    assert!(matches!(err, WalletError::SelfTransfer { .. }));

    let err = wallet
        .transfer(a.id, AccountId(i64::MAX), Coins::new(1))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::NotFound { .. }));
    assert_eq!(balance(&wallet, a.id).await, Coins::new(1000));
}

#[tokio::test]
async fn purchase_upsert_increments_quantity() {
    let Some((db, wallet)) = connect().await else {
        return;
    };
    let store = db.store();
    let item = store
        .insert_item(&unique("cup"), Coins::new(20))
        .await
        .unwrap();
    let u = wallet.register(&unique("u"), "h").await.unwrap();

    assert_eq!(wallet.buy_item(u.id, &item.name).await.unwrap().quantity, 1);
    assert_eq!(wallet.buy_item(u.id, &item.name).await.unwrap().quantity, 2);
    assert_eq!(balance(&wallet, u.id).await, Coins::new(960));

    let inventory = store.inventory(u.id).await.unwrap();
    assert_eq!(inventory.len(), 1);
    assert_eq!(inventory[0].quantity, 2);
}

#[tokio::test]
async fn purchase_of_unknown_item_is_not_found() {
    let Some((_db, wallet)) = connect().await else {
        return;
    };
    let u = wallet.register(&unique("ghost"), "h").await.unwrap();

    let err = wallet
        .purchase(u.id, ItemId(i64::MAX), Coins::new(10))
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::NotFound { entity: "Item", .. }));
    assert_eq!(balance(&wallet, u.id).await, Coins::new(1000));
}

#[tokio::test]
async fn duplicate_registration() {
    let Some((_db, wallet)) = connect().await else {
        return;
    };
    let name = unique("dup");
    wallet.register(&name, "h").await.unwrap();

    let err = wallet.register(&name, "h").await.unwrap_err();
    assert!(matches!(err, WalletError::AlreadyExists { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transfers_from_one_source() {
    let Some((_db, wallet)) = connect().await else {
        return;
    };
    let source = wallet.register(&unique("src"), "h").await.unwrap();
    let mut sinks = Vec::new();
    for _ in 0..3 {
        sinks.push(wallet.register(&unique("sink"), "h").await.unwrap());
    }

    let mut handles = Vec::new();
    for i in 0..8 {
        let wallet = wallet.clone();
        let to = sinks[i % sinks.len()].id;
        let from = source.id;
        handles.push(tokio::spawn(async move {
            wallet.transfer(from, to, Coins::new(300)).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            // Retryable conflicts are acceptable outcomes under SERIALIZABLE.
            Err(WalletError::InsufficientFunds { .. }) | Err(WalletError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert!(succeeded <= 3);
    assert_eq!(
        balance(&wallet, source.id).await,
        Coins::new(1000 - 300 * succeeded)
    );

    let mut total = balance(&wallet, source.id).await;
    for sink in &sinks {
        total += balance(&wallet, sink.id).await;
    }
    assert_eq!(total, Coins::new(4000));
}
