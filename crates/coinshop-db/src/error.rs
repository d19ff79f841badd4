//! # Database Error Types
//!
//! Error types for store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  PostgreSQL Error (sqlx::Error, SQLSTATE code)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Classified by SQLSTATE                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  WalletError (coinshop-core) ← What engines and the service return     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Request handler maps the variant to a response                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use coinshop_core::WalletError;
use thiserror::Error;

// SQLSTATE codes we classify.
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Store operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Registering a username that already exists
    /// - Inserting a catalog item with a duplicate name
    #[error("Duplicate value violates {constraint}")]
    UniqueViolation { constraint: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative balance, self transfer).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// Serialization failure or deadlock; the transaction was aborted
    /// by the database and can be retried from scratch.
    #[error("Serialization failure: {0}")]
    SerializationFailure(String),

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True for failures the database reports as transient.
    pub fn is_serialization_failure(&self) -> bool {
        matches!(self, DbError::SerializationFailure(_))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → SQLSTATE 23505 / 23503 / 23514 / 40001 / 40P01
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record",
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                let code = db_err.code().map(|c| c.into_owned());

                match code.as_deref() {
                    Some(UNIQUE_VIOLATION) => DbError::UniqueViolation {
                        constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                    },
                    Some(FOREIGN_KEY_VIOLATION) => DbError::ForeignKeyViolation { message },
                    Some(CHECK_VIOLATION) => DbError::CheckViolation { message },
                    Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => {
                        DbError::SerializationFailure(message)
                    }
                    _ => DbError::QueryFailed(message),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Store failures as seen by wallet callers.
///
/// ```text
/// NotFound               → WalletError::NotFound
/// SerializationFailure   → WalletError::Conflict (retryable)
/// UniqueViolation        → WalletError::AlreadyExists
/// everything else        → WalletError::Internal
/// ```
impl From<DbError> for WalletError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => WalletError::NotFound { entity, key: id },
            DbError::SerializationFailure(msg) => WalletError::Conflict(msg),
            DbError::UniqueViolation { constraint } => WalletError::AlreadyExists {
                entity: "Record",
                key: constraint,
            },
            other => WalletError::Internal(other.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
