//! # Transfer Engine
//!
//! Moves coins from one account to another and records the movement.
//!
//! ## Steps
//! ```text
//! transfer(from, to, amount)
//!   │
//!   ├── from == to ───────────────► SelfTransfer  (no transaction opened)
//!   ├── amount <= 0 ──────────────► Validation    (no transaction opened)
//!   │
//!   └── BEGIN SERIALIZABLE
//!         1. lock from, read balance        missing  → NotFound
//!         2. balance < amount               → InsufficientFunds
//!         3. from.balance -= amount         0 rows   → NotFound
//!         4. to.balance   += amount         0 rows   → NotFound
//!         5. INSERT transfers (from, to, amount, now)
//!         6. COMMIT
//! ```
//!
//! Only the source row is locked. The destination credit is a relative
//! update in the same transaction, so it commits or aborts with the debit.

use std::sync::Arc;

use tracing::{debug, info};

use coinshop_core::validation::validate_transfer_amount;
use coinshop_core::{AccountId, Coins, LedgerEntry, WalletError, WalletResult};

use super::settle;
use crate::store::{AccountStore, StoreTransaction};

/// Runs account-to-account transfers.
#[derive(Clone)]
pub struct TransferEngine {
    store: Arc<dyn AccountStore>,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        TransferEngine { store }
    }

    /// Transfers `amount` coins from `from` to `to`.
    ///
    /// On success the returned entry is already committed. On any error no
    /// balance has changed and no ledger entry exists.
    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Coins,
    ) -> WalletResult<LedgerEntry> {
        if from == to {
            return Err(WalletError::SelfTransfer { account: from });
        }
        validate_transfer_amount(amount)?;

        debug!(from = %from, to = %to, amount = %amount, "Starting transfer");

        let mut tx = self.store.begin().await?;
        let outcome = apply(tx.as_mut(), from, to, amount).await;
        let entry = settle(tx, outcome).await?;

        info!(
            transfer_id = %entry.id,
            from = %from,
            to = %to,
            amount = %amount,
            "Transfer committed"
        );
        Ok(entry)
    }
}

async fn apply(
    tx: &mut dyn StoreTransaction,
    from: AccountId,
    to: AccountId,
    amount: Coins,
) -> WalletResult<LedgerEntry> {
    let balance = tx
        .lock_balance(from)
        .await?
        .ok_or_else(|| WalletError::account_not_found(from))?;

    if !balance.covers(amount) {
        return Err(WalletError::InsufficientFunds {
            account: from,
            balance,
            requested: amount,
        });
    }

    if tx.adjust_balance(from, -amount).await? == 0 {
        return Err(WalletError::account_not_found(from));
    }
    if tx.adjust_balance(to, amount).await? == 0 {
        return Err(WalletError::account_not_found(to));
    }

    Ok(tx.append_transfer(from, to, amount).await?)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::seeded_store;
    use crate::error::DbError;
    use crate::store::{FailPoint, MemoryStore};
    use coinshop_core::ValidationError;

    fn engine(store: &MemoryStore) -> TransferEngine {
        TransferEngine::new(Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn test_insufficient_then_successful_transfer() {
        let (store, ids) = seeded_store(&[1000, 1000]).await;
        let (a, b) = (ids[0], ids[1]);
        let engine = engine(&store);

        let err = engine.transfer(a, b, Coins::new(1500)).await.unwrap_err();
        assert!(matches!(err, WalletError::InsufficientFunds { .. }));
        assert_eq!(store.balance(a).await, Some(Coins::new(1000)));
        assert_eq!(store.balance(b).await, Some(Coins::new(1000)));

        let entry = engine.transfer(a, b, Coins::new(500)).await.unwrap();
        assert_eq!(store.balance(a).await, Some(Coins::new(500)));
        assert_eq!(store.balance(b).await, Some(Coins::new(1500)));

        let ledger = store.ledger().await;
        assert_eq!(ledger, vec![entry.clone()]);
        assert_eq!(entry.from_account_id, a);
        assert_eq!(entry.to_account_id, b);
        assert_eq!(entry.amount, Coins::new(500));
    }

    #[tokio::test]
    async fn test_self_transfer_rejected() {
        let (store, ids) = seeded_store(&[100]).await;
        let engine = engine(&store);

        for amount in [1, 50, 100, 1000] {
            let err = engine
                .transfer(ids[0], ids[0], Coins::new(amount))
                .await
                .unwrap_err();
            assert!(matches!(err, WalletError::SelfTransfer { account } if account == ids[0]));
        }
        assert_eq!(store.balance(ids[0]).await, Some(Coins::new(100)));
        assert!(store.ledger().await.is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let (store, ids) = seeded_store(&[100, 100]).await;
        let engine = engine(&store);

        let err = engine
            .transfer(ids[0], ids[1], Coins::zero())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WalletError::Validation(ValidationError::MustBePositive { .. })
        ));
        assert!(store.ledger().await.is_empty());
    }

    #[tokio::test]
    async fn test_exact_balance_boundary() {
        let (store, ids) = seeded_store(&[300, 0]).await;
        let engine = engine(&store);

        let err = engine
            .transfer(ids[0], ids[1], Coins::new(301))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::InsufficientFunds { .. }));
        assert_eq!(store.balance(ids[0]).await, Some(Coins::new(300)));

        engine
            .transfer(ids[0], ids[1], Coins::new(300))
            .await
            .unwrap();
        assert_eq!(store.balance(ids[0]).await, Some(Coins::zero()));
        assert_eq!(store.balance(ids[1]).await, Some(Coins::new(300)));
    }

    #[tokio::test]
    async fn test_conservation_across_sequence() {
        let (store, ids) = seeded_store(&[1000, 500, 250, 0]).await;
        let engine = engine(&store);
        let before = store.total_balance().await;

        let moves = [
            (0, 1, 300),
            (1, 2, 700),
            (2, 3, 900),
            (3, 0, 10),
            (0, 3, 5000), // fails
            (3, 1, 890),
        ];
        for (from, to, amount) in moves {
            let _ = engine
                .transfer(ids[from], ids[to], Coins::new(amount))
                .await;
        }

        assert_eq!(store.total_balance().await, before);
        assert_eq!(store.ledger().await.len(), 5);
    }

    #[tokio::test]
    async fn test_missing_accounts() {
        let (store, ids) = seeded_store(&[100]).await;
        let engine = engine(&store);

        let err = engine
            .transfer(AccountId(404), ids[0], Coins::new(10))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::NotFound { ref key, .. } if key == "404"));

        let err = engine
            .transfer(ids[0], AccountId(404), Coins::new(10))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::NotFound { ref key, .. } if key == "404"));
        assert_eq!(store.balance(ids[0]).await, Some(Coins::new(100)));
    }

    #[tokio::test]
    async fn test_failure_after_lock_leaves_balances_untouched() {
        let (store, ids) = seeded_store(&[100, 100]).await;
        let engine = engine(&store);

        for point in [FailPoint::AdjustBalance, FailPoint::AppendTransfer] {
            store
                .fail_next(point, DbError::Internal("disk on fire".into()))
                .await;

            let err = engine
                .transfer(ids[0], ids[1], Coins::new(40))
                .await
                .unwrap_err();
            assert!(matches!(err, WalletError::Internal(_)), "{point:?}");
            assert_eq!(store.balance(ids[0]).await, Some(Coins::new(100)));
            assert_eq!(store.balance(ids[1]).await, Some(Coins::new(100)));
        }
        assert!(store.ledger().await.is_empty());

        // Row locks were released by the aborted transactions.
        engine
            .transfer(ids[0], ids[1], Coins::new(40))
            .await
            .unwrap();
        assert_eq!(store.balance(ids[0]).await, Some(Coins::new(60)));
    }

    #[tokio::test]
    async fn test_credit_overflow_fails_without_panicking() {
        let (store, ids) = seeded_store(&[i64::MAX, 1]).await;
        let engine = engine(&store);

        let err = engine
            .transfer(ids[1], ids[0], Coins::new(1))
            .await
            .unwrap_err();

        assert!(matches!(err, WalletError::Internal(_)));
        assert_eq!(store.balance(ids[0]).await, Some(Coins::new(i64::MAX)));
        assert_eq!(store.balance(ids[1]).await, Some(Coins::new(1)));
        assert!(store.ledger().await.is_empty());
    }

    #[tokio::test]
    async fn test_serialization_failure_is_conflict() {
        let (store, ids) = seeded_store(&[100, 100]).await;
        let engine = engine(&store);
        store
            .fail_next(
                FailPoint::Commit,
                DbError::SerializationFailure("could not serialize access".into()),
            )
            .await;

        let err = engine
            .transfer(ids[0], ids[1], Coins::new(10))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Conflict(_)));
        assert!(err.is_retryable());
        assert_eq!(store.balance(ids[0]).await, Some(Coins::new(100)));

        // The same logical operation succeeds on retry.
        engine
            .transfer(ids[0], ids[1], Coins::new(10))
            .await
            .unwrap();
        assert_eq!(store.balance(ids[0]).await, Some(Coins::new(90)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_debits_never_overdraw() {
        let (store, ids) = seeded_store(&[100, 0, 0, 0]).await;
        let engine = engine(&store);
        let source = ids[0];

        let mut handles = Vec::new();
        for i in 0..12 {
            let engine = engine.clone();
            let to = ids[1 + i % 3];
            handles.push(tokio::spawn(async move {
                engine.transfer(source, to, Coins::new(30)).await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(WalletError::InsufficientFunds { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(succeeded, 3);
        assert_eq!(store.balance(source).await, Some(Coins::new(10)));
        assert_eq!(store.total_balance().await, Coins::new(100));
        assert_eq!(store.ledger().await.len(), 3);
    }
}
