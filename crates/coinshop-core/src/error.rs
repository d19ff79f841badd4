//! # Error Types
//!
//! Domain error types for coinshop-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  coinshop-core errors (this file)                                      │
//! │  ├── WalletError      - What every wallet operation returns            │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  coinshop-db errors (separate crate)                                   │
//! │  └── DbError          - Store failures, classified by SQLSTATE         │
//! │                                                                         │
//! │  Flow: sqlx::Error → DbError → WalletError → caller                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Caller Contract
//! Callers branch on the variant, never on the message text.
//!
//! | Variant             | Caller response                   |
//! |---------------------|-----------------------------------|
//! | `NotFound`          | reject                            |
//! | `SelfTransfer`      | reject                            |
//! | `InsufficientFunds` | reject                            |
//! | `Validation`        | reject                            |
//! | `AlreadyExists`     | reject                            |
//! | `Conflict`          | retry the whole operation         |
//! | `DeadlineExceeded`  | retry or give up                  |
//! | `Internal`          | generic failure                   |

use thiserror::Error;

use crate::coins::Coins;
use crate::types::AccountId;

// =============================================================================
// Wallet Error
// =============================================================================

/// Errors returned by every wallet operation.
///
/// Whenever one of these is returned from a mutating operation, the store
/// transaction has already been rolled back.
#[derive(Debug, Error)]
pub enum WalletError {
    /// An account or catalog item does not exist.
    ///
    /// ## When This Occurs
    /// - Username not registered
    /// - Account id does not exist (or vanished mid-transaction)
    /// - Item name not in the catalog
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Source and destination of a transfer are the same account.
    #[error("Account {account} cannot transfer coins to itself")]
    SelfTransfer { account: AccountId },

    /// Balance is lower than the requested amount or price.
    #[error("Insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        balance: Coins,
        requested: Coins,
    },

    /// Transient serialization failure or deadlock in the store.
    ///
    /// The operation had no effect and may be retried from scratch.
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    /// Registration with a username that is already taken.
    #[error("{entity} already exists: {key}")]
    AlreadyExists { entity: &'static str, key: String },

    /// The operation did not commit before its deadline and was rolled back.
    #[error("Operation exceeded its deadline of {millis}ms")]
    DeadlineExceeded { millis: u64 },

    /// Input rejected before touching the store.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Unexpected store failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WalletError {
    /// Creates a NotFound error for an account id.
    pub fn account_not_found(id: AccountId) -> Self {
        WalletError::NotFound {
            entity: "Account",
            key: id.to_string(),
        }
    }

    /// Creates a NotFound error for a username.
    pub fn username_not_found(username: impl Into<String>) -> Self {
        WalletError::NotFound {
            entity: "User",
            key: username.into(),
        }
    }

    /// Creates a NotFound error for a catalog item.
    pub fn item_not_found(key: impl Into<String>) -> Self {
        WalletError::NotFound {
            entity: "Item",
            key: key.into(),
        }
    }

    /// True only for transient store conflicts.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalletError::Conflict(_))
    }

    /// True for errors caused by the request rather than the system.
    ///
    /// These map to rejection responses at the HTTP layer.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            WalletError::NotFound { .. }
                | WalletError::SelfTransfer { .. }
                | WalletError::InsufficientFunds { .. }
                | WalletError::AlreadyExists { .. }
                | WalletError::Validation(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be greater than zero.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with WalletError.
pub type WalletResult<T> = Result<T, WalletError>;

// =============================================================================
// Unit Tests
// =============================================================================
