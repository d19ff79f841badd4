//! # Account Directory
//!
//! Name → id and id → account lookups. No side effects; a missing account
//! is always a typed [`WalletError::NotFound`], never an empty value.

use std::sync::Arc;

use coinshop_core::{Account, AccountId, WalletError, WalletResult};

use crate::store::AccountStore;

/// Read-only view of the account table.
#[derive(Clone)]
pub struct AccountDirectory {
    store: Arc<dyn AccountStore>,
}

impl AccountDirectory {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        AccountDirectory { store }
    }

    /// Resolves a username to its account id.
    pub async fn resolve_id(&self, username: &str) -> WalletResult<AccountId> {
        self.store
            .find_account_id(username)
            .await?
            .ok_or_else(|| WalletError::username_not_found(username))
    }

    /// Reads an account by id.
    pub async fn get_account(&self, id: AccountId) -> WalletResult<Account> {
        self.store
            .get_account(id)
            .await?
            .ok_or_else(|| WalletError::account_not_found(id))
    }

    /// Reads the account matching both username and credential hash.
    ///
    /// Unknown usernames and wrong credentials are indistinguishable to the
    /// caller: both are `NotFound` keyed by the username.
    pub async fn authenticate(&self, username: &str, password_hash: &str) -> WalletResult<Account> {
        self.store
            .find_by_credentials(username, password_hash)
            .await?
            .ok_or_else(|| WalletError::username_not_found(username))
    }
}
