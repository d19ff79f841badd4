//! # PostgreSQL Store
//!
//! [`AccountStore`] backed by PostgreSQL through sqlx.
//!
//! ## Locking Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │  SET TRANSACTION ISOLATION LEVEL SERIALIZABLE                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SELECT balance FROM accounts WHERE id = $1 FOR UPDATE                 │
//! │       │   ← concurrent mutators of this account wait here              │
//! │       ▼                                                                 │
//! │  UPDATE / INSERT ...                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT   (40001 / 40P01 here or earlier → SerializationFailure)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The row lock keeps contending writers queued instead of failing at
//! commit; SERIALIZABLE catches anything the lock does not cover.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use coinshop_core::{
    Account, AccountId, CatalogItem, Coins, InventoryItem, ItemId, LedgerEntry, NewAccount,
    PurchaseRecord, TransferView,
};

use super::{AccountStore, StoreTransaction};
use crate::error::DbResult;

/// PostgreSQL-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn begin(&self) -> DbResult<Box<dyn StoreTransaction>> {
        let mut tx = self.pool.begin().await?;

        // Must be the first statement of the transaction.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgStoreTransaction { tx }))
    }

    async fn find_account_id(&self, username: &str) -> DbResult<Option<AccountId>> {
        let id = sqlx::query_scalar::<_, AccountId>("SELECT id FROM accounts WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(id)
    }

    async fn get_account(&self, id: AccountId) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, balance
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_credentials(
        &self,
        username: &str,
        password_hash: &str,
    ) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, balance
            FROM accounts
            WHERE username = $1 AND password_hash = $2
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn create_account(&self, account: &NewAccount) -> DbResult<AccountId> {
        debug!(username = %account.username, "Inserting account");

        let id = sqlx::query_scalar::<_, AccountId>(
            r#"
            INSERT INTO accounts (username, password_hash, balance)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(account.starting_balance)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn find_item(&self, name: &str) -> DbResult<Option<CatalogItem>> {
        let item = sqlx::query_as::<_, CatalogItem>(
            "SELECT id, name, price FROM items WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    async fn insert_item(&self, name: &str, price: Coins) -> DbResult<CatalogItem> {
        let item = sqlx::query_as::<_, CatalogItem>(
            r#"
            INSERT INTO items (name, price)
            VALUES ($1, $2)
            RETURNING id, name, price
            "#,
        )
        .bind(name)
        .bind(price)
        .fetch_one(&self.pool)
        .await?;

        Ok(item)
    }

    async fn inventory(&self, account: AccountId) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT i.name, p.quantity
            FROM purchases p
            JOIN items i ON i.id = p.item_id
            WHERE p.account_id = $1
            ORDER BY i.name
            "#,
        )
        .bind(account)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn transfer_history(&self, account: AccountId) -> DbResult<Vec<TransferView>> {
        let lines = sqlx::query_as::<_, TransferView>(
            r#"
            SELECT
                t.from_account_id,
                fa.username AS from_username,
                t.to_account_id,
                ta.username AS to_username,
                t.amount,
                t.created_at
            FROM transfers t
            JOIN accounts fa ON fa.id = t.from_account_id
            JOIN accounts ta ON ta.id = t.to_account_id
            WHERE t.from_account_id = $1 OR t.to_account_id = $1
            ORDER BY t.created_at, t.id
            "#,
        )
        .bind(account)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// Open PostgreSQL transaction.
///
/// sqlx rolls the transaction back if this is dropped before `commit`.
pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn lock_balance(&mut self, account: AccountId) -> DbResult<Option<Coins>> {
        let balance = sqlx::query_scalar::<_, Coins>(
            "SELECT balance FROM accounts WHERE id = $1 FOR UPDATE",
        )
        .bind(account)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(balance)
    }

    async fn adjust_balance(&mut self, account: AccountId, delta: Coins) -> DbResult<u64> {
        let result = sqlx::query("UPDATE accounts SET balance = balance + $1 WHERE id = $2")
            .bind(delta)
            .bind(account)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn append_transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Coins,
    ) -> DbResult<LedgerEntry> {
        let entry = sqlx::query_as::<_, LedgerEntry>(
            r#"
            INSERT INTO transfers (from_account_id, to_account_id, amount)
            VALUES ($1, $2, $3)
            RETURNING id, from_account_id, to_account_id, amount, created_at
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(amount)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(entry)
    }

    async fn upsert_purchase(
        &mut self,
        account: AccountId,
        item: ItemId,
    ) -> DbResult<PurchaseRecord> {
        let quantity = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO purchases (account_id, item_id, quantity)
            VALUES ($1, $2, 1)
            ON CONFLICT (account_id, item_id) DO UPDATE SET
                quantity = purchases.quantity + 1
            RETURNING quantity
            "#,
        )
        .bind(account)
        .bind(item)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(PurchaseRecord {
            account_id: account,
            item_id: item,
            quantity,
        })
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let PgStoreTransaction { tx } = *self;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        let PgStoreTransaction { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}
