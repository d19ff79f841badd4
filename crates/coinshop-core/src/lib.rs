//! # coinshop-core: Pure Domain Logic for the Coin Wallet
//!
//! Types, amounts, errors and validation rules shared by every layer.
//! Nothing in this crate performs I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Coinshop Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │             Request handlers (HTTP, auth) - external            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    coinshop-db                                  │   │
//! │  │   WalletService ──► TransferEngine / PurchaseEngine             │   │
//! │  │                 ──► AccountDirectory                            │   │
//! │  │   AccountStore: PgStore | MemoryStore                           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ coinshop-core (THIS CRATE) ★                    │   │
//! │  │   types  •  coins  •  error  •  validation                      │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Accounts, ledger entries, catalog items, purchase records
//! - [`coins`] - Integer coin amount type
//! - [`error`] - `WalletError` taxonomy
//! - [`validation`] - Input checks run before the store is touched
//!
//! ## Example Usage
//!
//! ```rust
//! use coinshop_core::{Coins, WalletError, AccountId};
//!
//! let balance = Coins::new(1000);
//! let requested = Coins::new(1500);
//!
//! if !balance.covers(requested) {
//!     let err = WalletError::InsufficientFunds {
//!         account: AccountId(1),
//!         balance,
//!         requested,
//!     };
//!     assert!(err.is_rejection());
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coins;
pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use coins::Coins;
pub use error::{ValidationError, WalletError, WalletResult};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Balance granted to every newly registered account.
///
/// Only a default: the running value comes from configuration.
pub const DEFAULT_STARTING_BALANCE: Coins = Coins::new(1000);

/// Maximum username length (matches the `VARCHAR(64)` column).
pub const MAX_USERNAME_LENGTH: usize = 64;
