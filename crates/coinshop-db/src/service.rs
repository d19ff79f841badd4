//! # Wallet Service
//!
//! The entry point request handlers call. Wires the account directory and
//! both engines over one store, applies the operation deadline, and logs
//! every outcome.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  send_coins(from, "bob", 100)                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌───────────────── deadline (OPERATION_TIMEOUT_MS) ──────────────────┐ │
//! │  │  AccountDirectory::resolve_id("bob")                              │ │
//! │  │       │                                                           │ │
//! │  │       ▼                                                           │ │
//! │  │  TransferEngine::transfer(from, bob, 100)                         │ │
//! │  └────────────────────────────────────────────────────────────────────┘ │
//! │       │                                                                 │
//! │       ├── Ok(entry)                                                    │
//! │       ├── Err(rejection)          logged at info                       │
//! │       ├── Err(Conflict/Internal)  logged at warn                       │
//! │       └── deadline elapsed ──► future dropped, transaction rolled back │
//! │                                 Err(DeadlineExceeded)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use coinshop_core::validation::{validate_item_name, validate_username};
use coinshop_core::{
    Account, AccountId, AccountSummary, CoinHistory, Coins, ItemId, LedgerEntry, NewAccount,
    PurchaseRecord, WalletError, WalletResult,
};

use crate::config::WalletConfig;
use crate::directory::AccountDirectory;
use crate::engine::{PurchaseEngine, TransferEngine};
use crate::error::DbError;
use crate::store::AccountStore;

/// Balance-mutation core as seen by request handlers.
///
/// ## Example
/// ```rust,ignore
/// let db = Database::new(config.db_config()).await?;
/// let wallet = WalletService::new(Arc::new(db.store()), &config);
///
/// let alice = wallet.register("alice", &hash).await?;
/// wallet.send_coins(alice.id, "bob", Coins::new(100)).await?;
/// wallet.buy_item(alice.id, "cup").await?;
/// ```
#[derive(Clone)]
pub struct WalletService {
    store: Arc<dyn AccountStore>,
    directory: AccountDirectory,
    transfers: TransferEngine,
    purchases: PurchaseEngine,
    starting_balance: Coins,
    operation_timeout: Option<Duration>,
}

impl WalletService {
    pub fn new(store: Arc<dyn AccountStore>, config: &WalletConfig) -> Self {
        WalletService {
            directory: AccountDirectory::new(Arc::clone(&store)),
            transfers: TransferEngine::new(Arc::clone(&store)),
            purchases: PurchaseEngine::new(Arc::clone(&store)),
            store,
            starting_balance: config.starting_balance,
            operation_timeout: config.operation_timeout(),
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Moves coins between two known accounts.
    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Coins,
    ) -> WalletResult<LedgerEntry> {
        self.bounded("transfer", self.transfers.transfer(from, to, amount))
            .await
    }

    /// Moves coins to the account owned by `to_username`.
    pub async fn send_coins(
        &self,
        from: AccountId,
        to_username: &str,
        amount: Coins,
    ) -> WalletResult<LedgerEntry> {
        self.bounded("send_coins", async {
            let to = self.directory.resolve_id(to_username).await?;
            self.transfers.transfer(from, to, amount).await
        })
        .await
    }

    /// Charges `price` for one unit of an already resolved item.
    pub async fn purchase(
        &self,
        account: AccountId,
        item: ItemId,
        price: Coins,
    ) -> WalletResult<PurchaseRecord> {
        self.bounded("purchase", self.purchases.purchase(account, item, price))
            .await
    }

    /// Buys one unit of the named catalog item at its catalog price.
    pub async fn buy_item(&self, account: AccountId, item_name: &str) -> WalletResult<PurchaseRecord> {
        self.bounded("buy_item", async {
            validate_item_name(item_name)?;
            let item = self
                .store
                .find_item(item_name)
                .await?
                .ok_or_else(|| WalletError::item_not_found(item_name))?;
            self.purchases.purchase(account, item.id, item.price).await
        })
        .await
    }

    /// Creates an account holding the configured starting balance.
    pub async fn register(&self, username: &str, credential_hash: &str) -> WalletResult<Account> {
        self.bounded("register", async {
            validate_username(username)?;

            let id = self
                .store
                .create_account(&NewAccount {
                    username: username.to_string(),
                    password_hash: credential_hash.to_string(),
                    starting_balance: self.starting_balance,
                })
                .await
                .map_err(|err| match err {
                    DbError::UniqueViolation { .. } => WalletError::AlreadyExists {
                        entity: "User",
                        key: username.to_string(),
                    },
                    other => other.into(),
                })?;

            info!(account = %id, username = %username, "Account registered");

            Ok(Account {
                id,
                username: username.to_string(),
                balance: self.starting_balance,
            })
        })
        .await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn resolve_account_id(&self, username: &str) -> WalletResult<AccountId> {
        self.directory.resolve_id(username).await
    }

    pub async fn get_account(&self, id: AccountId) -> WalletResult<Account> {
        self.directory.get_account(id).await
    }

    /// Looks up the account for a login. See [`AccountDirectory::authenticate`].
    pub async fn authenticate(&self, username: &str, credential_hash: &str) -> WalletResult<Account> {
        self.directory.authenticate(username, credential_hash).await
    }

    /// Logs in, or registers the username when no account matches.
    ///
    /// A known username with a different credential hash is not a new
    /// user: registration then fails with `AlreadyExists`.
    pub async fn authenticate_or_register(
        &self,
        username: &str,
        credential_hash: &str,
    ) -> WalletResult<Account> {
        match self.authenticate(username, credential_hash).await {
            Err(WalletError::NotFound { .. }) => self.register(username, credential_hash).await,
            other => other,
        }
    }

    /// Balance, inventory and transfer history of one account.
    pub async fn account_summary(&self, id: AccountId) -> WalletResult<AccountSummary> {
        let account = self.directory.get_account(id).await?;
        let inventory = self.store.inventory(id).await?;
        let lines = self.store.transfer_history(id).await?;

        Ok(AccountSummary {
            coins: account.balance,
            inventory,
            coin_history: CoinHistory::for_account(id, lines),
        })
    }

    // =========================================================================
    // Deadline
    // =========================================================================

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> WalletResult<T>
    where
        F: Future<Output = WalletResult<T>>,
    {
        let result = match self.operation_timeout {
            None => fut.await,
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                // The operation future, and with it any open transaction,
                // has been dropped at this point.
                Err(_) => Err(WalletError::DeadlineExceeded {
                    millis: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                }),
            },
        };

        if let Err(err) = &result {
            if err.is_rejection() {
                info!(operation, error = %err, "Wallet operation rejected");
            } else {
                warn!(operation, error = %err, "Wallet operation failed");
            }
        }

        result
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreTransaction};

    fn service_with(store: &MemoryStore, timeout_ms: u64) -> WalletService {
        let config = WalletConfig {
            operation_timeout_ms: timeout_ms,
            ..WalletConfig::default()
        };
        WalletService::new(Arc::new(store.clone()), &config)
    }

    async fn with_catalog() -> (MemoryStore, WalletService) {
        let store = MemoryStore::new();
        store.insert_item("cup", Coins::new(20)).await.unwrap();
        store.insert_item("pink-hoody", Coins::new(500)).await.unwrap();
        let service = service_with(&store, 5000);
        (store, service)
    }

    #[tokio::test]
    async fn test_register_grants_starting_balance() {
        let (_, wallet) = with_catalog().await;

        let alice = wallet.register("alice", "hash").await.unwrap();
        assert_eq!(alice.balance, Coins::new(1000));
        assert_eq!(wallet.resolve_account_id("alice").await.unwrap(), alice.id);
        assert_eq!(wallet.get_account(alice.id).await.unwrap(), alice);
        assert_eq!(wallet.authenticate("alice", "hash").await.unwrap(), alice);

        let err = wallet.register("alice", "other").await.unwrap_err();
        assert!(matches!(err, WalletError::AlreadyExists { entity: "User", .. }));

        let err = wallet.register("has space", "hash").await.unwrap_err();
        assert!(matches!(err, WalletError::Validation(_)));
    }

    #[tokio::test]
    async fn test_authenticate_or_register() {
        let (_, wallet) = with_catalog().await;

        let created = wallet.authenticate_or_register("carol", "h").await.unwrap();
        assert_eq!(created.balance, Coins::new(1000));

        wallet.buy_item(created.id, "cup").await.unwrap();
        let again = wallet.authenticate_or_register("carol", "h").await.unwrap();
        assert_eq!(again.id, created.id);
        assert_eq!(again.balance, Coins::new(980));

        let err = wallet
            .authenticate_or_register("carol", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::AlreadyExists { entity: "User", .. }));
    }

    #[tokio::test]
    async fn test_send_coins_by_username() {
        let (store, wallet) = with_catalog().await;
        let alice = wallet.register("alice", "h").await.unwrap();
        let bob = wallet.register("bob", "h").await.unwrap();

        wallet
            .send_coins(alice.id, "bob", Coins::new(250))
            .await
            .unwrap();
        assert_eq!(store.balance(alice.id).await, Some(Coins::new(750)));
        assert_eq!(store.balance(bob.id).await, Some(Coins::new(1250)));

        let err = wallet
            .send_coins(alice.id, "alice", Coins::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::SelfTransfer { .. }));

        let err = wallet
            .send_coins(alice.id, "nobody", Coins::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::NotFound { entity: "User", .. }));
    }

    #[tokio::test]
    async fn test_buy_item_by_name() {
        let (store, wallet) = with_catalog().await;
        let alice = wallet.register("alice", "h").await.unwrap();

        wallet.buy_item(alice.id, "cup").await.unwrap();
        let record = wallet.buy_item(alice.id, "cup").await.unwrap();
        assert_eq!(record.quantity, 2);
        assert_eq!(store.balance(alice.id).await, Some(Coins::new(960)));

        let err = wallet.buy_item(alice.id, "yacht").await.unwrap_err();
        assert!(matches!(err, WalletError::NotFound { entity: "Item", .. }));

        wallet.buy_item(alice.id, "pink-hoody").await.unwrap();
        let err = wallet.buy_item(alice.id, "pink-hoody").await.unwrap_err();
        assert!(matches!(err, WalletError::InsufficientFunds { .. }));
        assert_eq!(store.balance(alice.id).await, Some(Coins::new(460)));
    }

    #[tokio::test]
    async fn test_account_summary() {
        let (_, wallet) = with_catalog().await;
        let alice = wallet.register("alice", "h").await.unwrap();
        let bob = wallet.register("bob", "h").await.unwrap();

        wallet.send_coins(alice.id, "bob", Coins::new(100)).await.unwrap();
        wallet.send_coins(bob.id, "alice", Coins::new(30)).await.unwrap();
        wallet.buy_item(alice.id, "cup").await.unwrap();

        let summary = wallet.account_summary(alice.id).await.unwrap();
        assert_eq!(summary.coins, Coins::new(910));
        assert_eq!(summary.inventory.len(), 1);
        assert_eq!(summary.inventory[0].name, "cup");
        assert_eq!(summary.inventory[0].quantity, 1);
        assert_eq!(summary.coin_history.sent.len(), 1);
        assert_eq!(summary.coin_history.sent[0].to_user, "bob");
        assert_eq!(summary.coin_history.received.len(), 1);
        assert_eq!(summary.coin_history.received[0].from_user, "bob");
        assert_eq!(summary.coin_history.received[0].amount, Coins::new(30));

        let err = wallet.account_summary(AccountId(999)).await.unwrap_err();
        assert!(matches!(err, WalletError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_deadline_rolls_back_blocked_transfer() {
        let store = MemoryStore::new();
        let wallet = service_with(&store, 50);
        let alice = wallet.register("alice", "h").await.unwrap();
        let bob = wallet.register("bob", "h").await.unwrap();

        // Another transaction holds alice's row lock.
        let mut holder = store.begin().await.unwrap();
        holder.lock_balance(alice.id).await.unwrap();

        let err = wallet
            .transfer(alice.id, bob.id, Coins::new(10))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::DeadlineExceeded { millis: 50 }));
        assert!(!err.is_retryable());

        holder.rollback().await.unwrap();
        assert_eq!(store.balance(alice.id).await, Some(Coins::new(1000)));
        assert!(store.ledger().await.is_empty());

        // Nothing was left locked by the abandoned attempt.
        wallet
            .transfer(alice.id, bob.id, Coins::new(10))
            .await
            .unwrap();
        assert_eq!(store.balance(alice.id).await, Some(Coins::new(990)));
    }

    #[tokio::test]
    async fn test_zero_timeout_disables_deadline() {
        let store = MemoryStore::new();
        let wallet = service_with(&store, 0);
        let alice = wallet.register("alice", "h").await.unwrap();
        let bob = wallet.register("bob", "h").await.unwrap();

        wallet
            .transfer(alice.id, bob.id, Coins::new(1000))
            .await
            .unwrap();
        assert_eq!(store.balance(bob.id).await, Some(Coins::new(2000)));
    }
}
