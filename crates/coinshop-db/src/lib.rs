//! # coinshop-db: Store and Balance-Mutation Layer
//!
//! Everything that touches account balances: the store capability and its
//! PostgreSQL / in-memory implementations, the transfer and purchase engines,
//! and the [`WalletService`] facade request handlers call.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Coinshop Data Flow                               │
//! │                                                                         │
//! │  Request handler (POST /api/sendCoin, GET /api/buy/{item})             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   coinshop-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   WalletService  (deadline, logging)                            │   │
//! │  │     ├── AccountDirectory   name → id, id → account              │   │
//! │  │     ├── TransferEngine     lock, check, debit, credit, ledger   │   │
//! │  │     └── PurchaseEngine     lock, check, debit, upsert           │   │
//! │  │              │                                                  │   │
//! │  │              ▼                                                  │   │
//! │  │   dyn AccountStore ── PgStore | MemoryStore                     │   │
//! │  │                                                                 │   │
//! │  │   Database (pool.rs)       Migrations (embedded)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PostgreSQL                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Environment-driven settings
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types and their mapping to `WalletError`
//! - [`store`] - Store capability, PostgreSQL and in-memory implementations
//! - [`directory`] - Account lookups
//! - [`engine`] - Transfer and purchase engines
//! - [`service`] - The facade tying them together
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use coinshop_db::{Database, WalletConfig, WalletService};
//!
//! let config = WalletConfig::load()?;
//! let db = Database::new(config.db_config()).await?;
//! let wallet = WalletService::new(Arc::new(db.store()), &config);
//!
//! let bob = wallet.resolve_account_id("bob").await?;
//! wallet.transfer(alice, bob, Coins::new(100)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod service;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, WalletConfig};
pub use directory::AccountDirectory;
pub use engine::{PurchaseEngine, TransferEngine};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use service::WalletService;
pub use store::{AccountStore, MemoryStore, PgStore, StoreTransaction};
