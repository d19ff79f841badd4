//! # In-Memory Store
//!
//! [`AccountStore`] kept entirely in process memory, for tests and local
//! experiments. It follows the same contract as the PostgreSQL store:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   MemoryStore Transaction                               │
//! │                                                                         │
//! │  lock_balance(a)  ──► waits on a's row mutex (held until tx ends)      │
//! │  adjust_balance   ──► staged delta                                     │
//! │  append_transfer  ──► staged ledger entry (id taken from sequence)     │
//! │  upsert_purchase  ──► staged +1                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  commit  ──► one write lock: check constraints, apply everything       │
//! │  rollback / drop ──► staged writes discarded, row mutexes released     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failures can be injected at any step with [`MemoryStore::fail_next`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use coinshop_core::{
    Account, AccountId, CatalogItem, Coins, InventoryItem, ItemId, LedgerEntry, NewAccount,
    PurchaseRecord, TransferId, TransferView,
};

use super::{AccountStore, StoreTransaction};
use crate::error::{DbError, DbResult};

/// Step at which an injected failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    LockBalance,
    AdjustBalance,
    AppendTransfer,
    UpsertPurchase,
    Commit,
}

struct AccountRow {
    username: String,
    password_hash: String,
    balance: Coins,
    row_lock: Arc<Mutex<()>>,
}

#[derive(Default)]
struct State {
    accounts: BTreeMap<AccountId, AccountRow>,
    items: BTreeMap<ItemId, CatalogItem>,
    transfers: Vec<LedgerEntry>,
    purchases: BTreeMap<(AccountId, ItemId), i32>,
    next_account_id: i64,
    next_item_id: i64,
    next_transfer_id: i64,
    armed_failure: Option<(FailPoint, DbError)>,
}

impl State {
    fn take_failure(&mut self, point: FailPoint) -> DbResult<()> {
        match self.armed_failure.take() {
            Some((armed, err)) if armed == point => Err(err),
            other => {
                self.armed_failure = other;
                Ok(())
            }
        }
    }
}

/// In-process store with per-account row locks.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next transaction step matching `point` fail with `error`.
    ///
    /// Fires once; later steps run normally.
    pub async fn fail_next(&self, point: FailPoint, error: DbError) {
        self.state.write().await.armed_failure = Some((point, error));
    }

    /// Committed balance of an account.
    pub async fn balance(&self, id: AccountId) -> Option<Coins> {
        self.state.read().await.accounts.get(&id).map(|row| row.balance)
    }

    /// Sum of every committed balance.
    pub async fn total_balance(&self) -> Coins {
        self.state
            .read()
            .await
            .accounts
            .values()
            .map(|row| row.balance)
            .sum()
    }

    /// Every committed ledger entry, in commit order.
    pub async fn ledger(&self) -> Vec<LedgerEntry> {
        self.state.read().await.transfers.clone()
    }

    /// Committed purchase quantity for an (account, item) pair.
    pub async fn purchase_quantity(&self, account: AccountId, item: ItemId) -> Option<i32> {
        self.state
            .read()
            .await
            .purchases
            .get(&(account, item))
            .copied()
    }

    async fn fail_if_armed(&self, point: FailPoint) -> DbResult<()> {
        self.state.write().await.take_failure(point)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn begin(&self) -> DbResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            row_locks: HashMap::new(),
            deltas: BTreeMap::new(),
            transfers: Vec::new(),
            purchases: Vec::new(),
        }))
    }

    async fn find_account_id(&self, username: &str) -> DbResult<Option<AccountId>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .iter()
            .find(|(_, row)| row.username == username)
            .map(|(id, _)| *id))
    }

    async fn get_account(&self, id: AccountId) -> DbResult<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.get(&id).map(|row| Account {
            id,
            username: row.username.clone(),
            balance: row.balance,
        }))
    }

    async fn find_by_credentials(
        &self,
        username: &str,
        password_hash: &str,
    ) -> DbResult<Option<Account>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .iter()
            .find(|(_, row)| row.username == username && row.password_hash == password_hash)
            .map(|(id, row)| Account {
                id: *id,
                username: row.username.clone(),
                balance: row.balance,
            }))
    }

    async fn create_account(&self, account: &NewAccount) -> DbResult<AccountId> {
        let mut state = self.state.write().await;

        if state
            .accounts
            .values()
            .any(|row| row.username == account.username)
        {
            return Err(DbError::UniqueViolation {
                constraint: "accounts_username_key".to_string(),
            });
        }
        if account.starting_balance.is_negative() {
            return Err(DbError::CheckViolation {
                message: "accounts_balance_check".to_string(),
            });
        }

        state.next_account_id += 1;
        let id = AccountId(state.next_account_id);
        state.accounts.insert(
            id,
            AccountRow {
                username: account.username.clone(),
                password_hash: account.password_hash.clone(),
                balance: account.starting_balance,
                row_lock: Arc::new(Mutex::new(())),
            },
        );

        Ok(id)
    }

    async fn find_item(&self, name: &str) -> DbResult<Option<CatalogItem>> {
        let state = self.state.read().await;
        Ok(state.items.values().find(|item| item.name == name).cloned())
    }

    async fn insert_item(&self, name: &str, price: Coins) -> DbResult<CatalogItem> {
        let mut state = self.state.write().await;

        if state.items.values().any(|item| item.name == name) {
            return Err(DbError::UniqueViolation {
                constraint: "items_name_key".to_string(),
            });
        }
        if price.is_negative() {
            return Err(DbError::CheckViolation {
                message: "items_price_check".to_string(),
            });
        }

        state.next_item_id += 1;
        let item = CatalogItem {
            id: ItemId(state.next_item_id),
            name: name.to_string(),
            price,
        };
        state.items.insert(item.id, item.clone());

        Ok(item)
    }

    async fn inventory(&self, account: AccountId) -> DbResult<Vec<InventoryItem>> {
        let state = self.state.read().await;

        let mut items: Vec<InventoryItem> = state
            .purchases
            .iter()
            .filter(|((owner, _), _)| *owner == account)
            .filter_map(|((_, item_id), quantity)| {
                state.items.get(item_id).map(|item| InventoryItem {
                    name: item.name.clone(),
                    quantity: *quantity,
                })
            })
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(items)
    }

    async fn transfer_history(&self, account: AccountId) -> DbResult<Vec<TransferView>> {
        let state = self.state.read().await;
        let username = |id: &AccountId| {
            state
                .accounts
                .get(id)
                .map(|row| row.username.clone())
                .unwrap_or_default()
        };

        Ok(state
            .transfers
            .iter()
            .filter(|entry| entry.from_account_id == account || entry.to_account_id == account)
            .map(|entry| TransferView {
                from_account_id: entry.from_account_id,
                from_username: username(&entry.from_account_id),
                to_account_id: entry.to_account_id,
                to_username: username(&entry.to_account_id),
                amount: entry.amount,
                created_at: entry.created_at,
            })
            .collect())
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// Open in-memory transaction.
///
/// Holds the row mutex of every account it locked until it is committed,
/// rolled back or dropped.
pub struct MemoryTransaction {
    store: MemoryStore,
    row_locks: HashMap<AccountId, OwnedMutexGuard<()>>,
    deltas: BTreeMap<AccountId, Coins>,
    transfers: Vec<LedgerEntry>,
    purchases: Vec<(AccountId, ItemId)>,
}

/// Same outcome as PostgreSQL's BIGINT overflow (SQLSTATE 22003).
fn balance_out_of_range() -> DbError {
    DbError::QueryFailed("balance out of range for type bigint".to_string())
}

impl MemoryTransaction {
    fn pending_delta(&self, account: AccountId) -> Coins {
        self.deltas.get(&account).copied().unwrap_or_default()
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn lock_balance(&mut self, account: AccountId) -> DbResult<Option<Coins>> {
        self.store.fail_if_armed(FailPoint::LockBalance).await?;

        if !self.row_locks.contains_key(&account) {
            let row_lock = {
                let state = self.store.state.read().await;
                match state.accounts.get(&account) {
                    Some(row) => Arc::clone(&row.row_lock),
                    None => return Ok(None),
                }
            };
            // State lock is released before waiting on the row.
            let guard = row_lock.lock_owned().await;
            self.row_locks.insert(account, guard);
        }

        let state = self.store.state.read().await;
        match state.accounts.get(&account) {
            Some(row) => row
                .balance
                .checked_add(self.pending_delta(account))
                .map(Some)
                .ok_or_else(balance_out_of_range),
            None => Ok(None),
        }
    }

    async fn adjust_balance(&mut self, account: AccountId, delta: Coins) -> DbResult<u64> {
        self.store.fail_if_armed(FailPoint::AdjustBalance).await?;

        let exists = self.store.state.read().await.accounts.contains_key(&account);
        if !exists {
            return Ok(0);
        }

        let staged = self
            .pending_delta(account)
            .checked_add(delta)
            .ok_or_else(balance_out_of_range)?;
        self.deltas.insert(account, staged);
        Ok(1)
    }

    async fn append_transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Coins,
    ) -> DbResult<LedgerEntry> {
        self.store.fail_if_armed(FailPoint::AppendTransfer).await?;

        let id = {
            let mut state = self.store.state.write().await;
            if !state.accounts.contains_key(&from) || !state.accounts.contains_key(&to) {
                return Err(DbError::ForeignKeyViolation {
                    message: "transfers references a missing account".to_string(),
                });
            }
            state.next_transfer_id += 1;
            TransferId(state.next_transfer_id)
        };

        let entry = LedgerEntry {
            id,
            from_account_id: from,
            to_account_id: to,
            amount,
            created_at: Utc::now(),
        };
        self.transfers.push(entry.clone());

        Ok(entry)
    }

    async fn upsert_purchase(
        &mut self,
        account: AccountId,
        item: ItemId,
    ) -> DbResult<PurchaseRecord> {
        self.store.fail_if_armed(FailPoint::UpsertPurchase).await?;

        let committed = {
            let state = self.store.state.read().await;
            if !state.accounts.contains_key(&account) || !state.items.contains_key(&item) {
                return Err(DbError::ForeignKeyViolation {
                    message: "purchases references a missing account or item".to_string(),
                });
            }
            state.purchases.get(&(account, item)).copied().unwrap_or(0)
        };
        let staged = self
            .purchases
            .iter()
            .filter(|pair| **pair == (account, item))
            .count() as i32;

        self.purchases.push((account, item));

        Ok(PurchaseRecord {
            account_id: account,
            item_id: item,
            quantity: committed + staged + 1,
        })
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let mut state = self.store.state.write().await;
        state.take_failure(FailPoint::Commit)?;

        // Constraints are checked before anything is applied.
        let mut balances = Vec::with_capacity(self.deltas.len());
        for (account, delta) in &self.deltas {
            let row = state
                .accounts
                .get(account)
                .ok_or_else(|| DbError::not_found("Account", account))?;
            let balance = row
                .balance
                .checked_add(*delta)
                .ok_or_else(balance_out_of_range)?;
            if balance.is_negative() {
                return Err(DbError::CheckViolation {
                    message: "accounts_balance_check".to_string(),
                });
            }
            balances.push((*account, balance));
        }

        for (account, balance) in balances {
            if let Some(row) = state.accounts.get_mut(&account) {
                row.balance = balance;
            }
        }
        state.transfers.extend(self.transfers.iter().cloned());
        for pair in &self.purchases {
            *state.purchases.entry(*pair).or_insert(0) += 1;
        }

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        // Staged writes and row guards are dropped with `self`.
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
