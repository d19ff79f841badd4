//! # Balance-Mutation Engines
//!
//! The two operations that change balances.
//!
//! ## Transaction Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 One Operation = One Transaction                         │
//! │                                                                         │
//! │  begin (SERIALIZABLE)                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock_balance(source) ──► None ──────────────────► rollback, NotFound  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  balance < cost ? ─────────── yes ──────► rollback, InsufficientFunds  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  mutate (debit, credit / upsert, append) ── error ──► rollback, error  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  commit ── 40001 / 40P01 ──► Conflict (caller may retry)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Neither engine retries. A dropped operation future drops its
//! transaction, which rolls back.

pub mod purchase;
pub mod transfer;

pub use purchase::PurchaseEngine;
pub use transfer::TransferEngine;

use tracing::warn;

use coinshop_core::WalletResult;

use crate::store::StoreTransaction;

/// Commits `tx` when `outcome` is `Ok`, otherwise rolls it back and returns
/// the original error.
///
/// A failed rollback is logged; the error that caused it is what the caller
/// sees. The database discards the transaction when the connection returns
/// to the pool either way.
pub(crate) async fn settle<T>(
    tx: Box<dyn StoreTransaction>,
    outcome: WalletResult<T>,
) -> WalletResult<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, cause = %err, "Rollback failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use coinshop_core::{AccountId, Coins, NewAccount};

    use crate::store::{AccountStore, MemoryStore};

    /// Memory store with one account per balance, named `user0`, `user1`, ...
    pub(crate) async fn seeded_store(balances: &[i64]) -> (MemoryStore, Vec<AccountId>) {
        let store = MemoryStore::new();
        let mut ids = Vec::with_capacity(balances.len());
        for (i, balance) in balances.iter().enumerate() {
            let id = store
                .create_account(&NewAccount {
                    username: format!("user{i}"),
                    password_hash: format!("hash{i}"),
                    starting_balance: Coins::new(*balance),
                })
                .await
                .unwrap();
            ids.push(id);
        }
        (store, ids)
    }
}
