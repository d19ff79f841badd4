//! # Store Module
//!
//! The capability interface every engine depends on, plus its two
//! implementations.
//!
//! ## Store Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Store Capability                                     │
//! │                                                                         │
//! │  TransferEngine / PurchaseEngine / AccountDirectory                    │
//! │       │                                                                 │
//! │       │  Arc<dyn AccountStore>                                          │
//! │       ▼                                                                 │
//! │  AccountStore                                                          │
//! │  ├── begin() ──► Box<dyn StoreTransaction>  (SERIALIZABLE)             │
//! │  │                ├── lock_balance      SELECT ... FOR UPDATE          │
//! │  │                ├── adjust_balance    UPDATE ... balance + delta     │
//! │  │                ├── append_transfer   INSERT INTO transfers          │
//! │  │                ├── upsert_purchase   INSERT ... ON CONFLICT         │
//! │  │                └── commit / rollback                                │
//! │  └── reads: accounts, catalog, inventory, history                      │
//! │       │                                                                 │
//! │       ├──────────────────────┐                                          │
//! │       ▼                      ▼                                          │
//! │  PgStore (PostgreSQL)    MemoryStore (tests)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transaction Lifetime
//! Dropping a [`StoreTransaction`] without calling `commit` discards every
//! staged write and releases its row locks. This is what makes a cancelled
//! operation (its future dropped mid-flight) roll back.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use coinshop_core::{
    Account, AccountId, CatalogItem, Coins, InventoryItem, ItemId, LedgerEntry, NewAccount,
    PurchaseRecord, TransferView,
};

use crate::error::DbResult;

pub use memory::{FailPoint, MemoryStore};
pub use postgres::PgStore;

/// Durable account store.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Opens a transaction at SERIALIZABLE isolation.
    async fn begin(&self) -> DbResult<Box<dyn StoreTransaction>>;

    /// Looks up an account id by username.
    async fn find_account_id(&self, username: &str) -> DbResult<Option<AccountId>>;

    /// Reads an account without locking it.
    async fn get_account(&self, id: AccountId) -> DbResult<Option<Account>>;

    /// Reads the account whose username and credential hash both match.
    ///
    /// The hash is compared verbatim; producing it is the caller's job.
    async fn find_by_credentials(
        &self,
        username: &str,
        password_hash: &str,
    ) -> DbResult<Option<Account>>;

    /// Inserts a new account. Duplicate usernames fail with
    /// [`DbError::UniqueViolation`](crate::DbError::UniqueViolation).
    async fn create_account(&self, account: &NewAccount) -> DbResult<AccountId>;

    /// Looks up a catalog item by name.
    async fn find_item(&self, name: &str) -> DbResult<Option<CatalogItem>>;

    /// Adds an item to the catalog.
    async fn insert_item(&self, name: &str, price: Coins) -> DbResult<CatalogItem>;

    /// Items bought by an account, ordered by name.
    async fn inventory(&self, account: AccountId) -> DbResult<Vec<InventoryItem>>;

    /// Transfers in which the account is source or destination, oldest first.
    async fn transfer_history(&self, account: AccountId) -> DbResult<Vec<TransferView>>;
}

/// One open serializable transaction.
///
/// Writes become visible to other transactions only after `commit`.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Takes an exclusive row lock on the account and returns its balance,
    /// or `None` when the account does not exist.
    async fn lock_balance(&mut self, account: AccountId) -> DbResult<Option<Coins>>;

    /// Adds `delta` (negative to debit) to the balance.
    ///
    /// Returns the number of rows affected: 0 means the account is gone.
    async fn adjust_balance(&mut self, account: AccountId, delta: Coins) -> DbResult<u64>;

    /// Appends one immutable ledger entry stamped with the current time.
    async fn append_transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Coins,
    ) -> DbResult<LedgerEntry>;

    /// Creates the purchase record at quantity 1 or increments it, in one
    /// atomic statement.
    async fn upsert_purchase(&mut self, account: AccountId, item: ItemId)
        -> DbResult<PurchaseRecord>;

    async fn commit(self: Box<Self>) -> DbResult<()>;

    async fn rollback(self: Box<Self>) -> DbResult<()>;
}
