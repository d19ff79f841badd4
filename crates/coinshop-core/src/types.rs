//! # Domain Types
//!
//! Core domain types used throughout the wallet.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Account      │   │  LedgerEntry    │   │  CatalogItem    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id             │       │
//! │  │  username (uniq)│   │  from / to      │   │  name (uniq)    │       │
//! │  │  balance ≥ 0    │   │  amount > 0     │   │  price ≥ 0      │       │
//! │  └─────────────────┘   │  created_at     │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! │  ┌─────────────────┐                                                    │
//! │  │ PurchaseRecord  │   One row per (account, item).                    │
//! │  │  ─────────────  │   Created at quantity 1, then +1 per purchase.   │
//! │  │  quantity ≥ 1   │                                                    │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::coins::Coins;

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
        #[cfg_attr(feature = "sqlx", sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            #[inline]
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                $name(id)
            }
        }
    };
}

id_type!(
    /// Opaque account identifier (database `BIGSERIAL`).
    AccountId
);

id_type!(
    /// Catalog item identifier.
    ItemId
);

id_type!(
    /// Ledger entry identifier.
    TransferId
);

// =============================================================================
// Account
// =============================================================================

/// The owner of a coin balance.
///
/// The credential hash is stored alongside the account but never leaves the
/// store through this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub balance: Coins,
}

/// Data needed to register an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    /// Opaque to the wallet; produced by the authentication layer.
    pub password_hash: String,
    pub starting_balance: Coins,
}

// =============================================================================
// Ledger
// =============================================================================

/// Immutable record of one completed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LedgerEntry {
    pub id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Coins,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Catalog & Purchases
// =============================================================================

/// An item that can be bought with coins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub price: Coins,
}

/// Per-account, per-item purchase counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseRecord {
    pub account_id: AccountId,
    pub item_id: ItemId,
    pub quantity: i32,
}

// =============================================================================
// Read Models
// =============================================================================

/// One line of an account's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryItem {
    #[serde(rename = "type")]
    pub name: String,
    pub quantity: i32,
}

/// Coins received from another account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedCoins {
    pub from_user: String,
    pub amount: Coins,
    pub created_at: DateTime<Utc>,
}

/// Coins sent to another account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentCoins {
    pub to_user: String,
    pub amount: Coins,
    pub created_at: DateTime<Utc>,
}

/// Transfer history of one account, split by direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinHistory {
    pub received: Vec<ReceivedCoins>,
    pub sent: Vec<SentCoins>,
}

/// A resolved history line before it is split by direction.
///
/// Stores return these; [`CoinHistory::for_account`] does the split.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransferView {
    pub from_account_id: AccountId,
    pub from_username: String,
    pub to_account_id: AccountId,
    pub to_username: String,
    pub amount: Coins,
    pub created_at: DateTime<Utc>,
}

impl CoinHistory {
    /// Splits transfer lines into received and sent relative to `account`.
    ///
    /// Lines that do not involve the account are ignored.
    pub fn for_account(account: AccountId, lines: Vec<TransferView>) -> Self {
        let mut history = CoinHistory::default();

        for line in lines {
            if line.to_account_id == account {
                history.received.push(ReceivedCoins {
                    from_user: line.from_username,
                    amount: line.amount,
                    created_at: line.created_at,
                });
            } else if line.from_account_id == account {
                history.sent.push(SentCoins {
                    to_user: line.to_username,
                    amount: line.amount,
                    created_at: line.created_at,
                });
            }
        }

        history
    }
}

/// Balance, inventory and history of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub coins: Coins,
    pub inventory: Vec<InventoryItem>,
    pub coin_history: CoinHistory,
}

// =============================================================================
// Unit Tests
// =============================================================================
