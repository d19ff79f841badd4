//! # Purchase Engine
//!
//! Debits an account for a catalog item and bumps its purchase counter.
//!
//! ```text
//! purchase(account, item, price)
//!   │
//!   ├── price < 0 ─────────────────► Validation  (no transaction opened)
//!   │
//!   └── BEGIN SERIALIZABLE
//!         1. lock account, read balance     missing → NotFound
//!         2. balance < price                → InsufficientFunds
//!         3. balance -= price               0 rows  → NotFound
//!         4. INSERT purchases ... ON CONFLICT DO UPDATE quantity + 1
//!         5. COMMIT
//! ```
//!
//! The debit and the counter increment commit together or not at all.
//! The catalog lookup happens before this engine is called.

use std::sync::Arc;

use tracing::{debug, info};

use coinshop_core::validation::validate_price;
use coinshop_core::{AccountId, Coins, ItemId, PurchaseRecord, WalletError, WalletResult};

use super::settle;
use crate::error::DbError;
use crate::store::{AccountStore, StoreTransaction};

/// Runs catalog purchases.
#[derive(Clone)]
pub struct PurchaseEngine {
    store: Arc<dyn AccountStore>,
}

impl PurchaseEngine {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        PurchaseEngine { store }
    }

    /// Charges `price` to `account` and records one more unit of `item`.
    ///
    /// Returns the purchase record with its new quantity.
    pub async fn purchase(
        &self,
        account: AccountId,
        item: ItemId,
        price: Coins,
    ) -> WalletResult<PurchaseRecord> {
        validate_price(price)?;

        debug!(account = %account, item = %item, price = %price, "Starting purchase");

        let mut tx = self.store.begin().await?;
        let outcome = apply(tx.as_mut(), account, item, price).await;
        let record = settle(tx, outcome).await?;

        info!(
            account = %account,
            item = %item,
            price = %price,
            quantity = record.quantity,
            "Purchase committed"
        );
        Ok(record)
    }
}

async fn apply(
    tx: &mut dyn StoreTransaction,
    account: AccountId,
    item: ItemId,
    price: Coins,
) -> WalletResult<PurchaseRecord> {
    let balance = tx
        .lock_balance(account)
        .await?
        .ok_or_else(|| WalletError::account_not_found(account))?;

    if !balance.covers(price) {
        return Err(WalletError::InsufficientFunds {
            account,
            balance,
            requested: price,
        });
    }

    if tx.adjust_balance(account, -price).await? == 0 {
        return Err(WalletError::account_not_found(account));
    }

    // The account row is locked, so a dangling reference can only be the item.
    tx.upsert_purchase(account, item)
        .await
        .map_err(|err| match err {
            DbError::ForeignKeyViolation { .. } => WalletError::item_not_found(item.to_string()),
            other => other.into(),
        })
}
